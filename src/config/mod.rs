pub mod app;

pub use app::{
    current_environment, env_flag_enabled, validate_production_config, AppConfig, OtpStoreKind,
};

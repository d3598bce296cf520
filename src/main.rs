use blogpress::{
    config::{validate_production_config, AppConfig, OtpStoreKind},
    db, routes,
    services::{create_email_sender, InMemoryOtpStore, OtpStore, SqliteOtpStore},
    AppState,
};

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogpress=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuse to start with development shortcuts in production
    validate_production_config();

    let config = AppConfig::from_env();
    tracing::info!(
        "Starting blogpress ({} environment, {:?} OTP store)",
        config.environment,
        config.otp_store
    );

    // Database connection
    let pool = db::create_pool(&config.database_url).await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    let otp_store: Arc<dyn OtpStore> = match config.otp_store {
        OtpStoreKind::Memory => Arc::new(InMemoryOtpStore::new()),
        OtpStoreKind::Sqlite => Arc::new(SqliteOtpStore::new(pool.clone())),
    };

    let email_sender = create_email_sender(&config);

    let addr: SocketAddr = config.bind_address().parse()?;

    let app_state = AppState::build(pool, config, email_sender, otp_store);
    let app = routes::app_router(app_state);

    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

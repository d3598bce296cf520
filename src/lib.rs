pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use config::AppConfig;
use repositories::{
    RegistrationRepository, SqliteRegistrationRepository, SqliteSubscriberRepository,
    SqliteUserRepository, SubscriberRepository, UserRepository,
};
use services::{
    AccountService, Argon2PasswordHasher, AuthService, EmailSender, JwtTokenIssuer,
    NotificationService, OtpService, OtpSettings, OtpStore, PasswordHasher, PasswordResetService,
    RegistrationService, SubscriberService, TokenIssuer,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registration_service: Arc<RegistrationService>,
    pub auth_service: Arc<AuthService>,
    pub password_reset_service: Arc<PasswordResetService>,
    pub subscriber_service: Arc<SubscriberService>,
    pub notification_service: Arc<NotificationService>,
    pub token_issuer: Arc<dyn TokenIssuer>,
    pub pool: sqlx::SqlitePool,
}

impl AppState {
    /// Wires repositories and services over `pool`. The email sender and OTP
    /// store are passed in so callers choose real or test implementations.
    pub fn build(
        pool: sqlx::SqlitePool,
        config: AppConfig,
        email_sender: Arc<dyn EmailSender>,
        otp_store: Arc<dyn OtpStore>,
    ) -> Self {
        let token_issuer: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::from_config(&config));
        Self::build_with_issuer(pool, config, email_sender, otp_store, token_issuer)
    }

    pub fn build_with_issuer(
        pool: sqlx::SqlitePool,
        config: AppConfig,
        email_sender: Arc<dyn EmailSender>,
        otp_store: Arc<dyn OtpStore>,
        token_issuer: Arc<dyn TokenIssuer>,
    ) -> Self {
        let user_repository: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(pool.clone()));
        let registration_repository: Arc<dyn RegistrationRepository> =
            Arc::new(SqliteRegistrationRepository::new(pool.clone()));
        let subscriber_repository: Arc<dyn SubscriberRepository> =
            Arc::new(SqliteSubscriberRepository::new(pool.clone()));

        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher);

        let otp_service = Arc::new(OtpService::new(
            otp_store,
            email_sender.clone(),
            OtpSettings {
                brand_name: config.email_from_name.clone(),
                ..OtpSettings::default()
            },
        ));

        let account_service = Arc::new(AccountService::new(
            user_repository.clone(),
            hasher.clone(),
        ));

        let registration_service = Arc::new(RegistrationService::new(
            registration_repository,
            user_repository.clone(),
            otp_service.clone(),
            account_service,
            config.skip_email_verification,
        ));

        let auth_service = Arc::new(AuthService::new(
            user_repository.clone(),
            hasher.clone(),
            token_issuer.clone(),
        ));

        let password_reset_service = Arc::new(PasswordResetService::new(
            user_repository,
            otp_service,
            hasher,
        ));

        let subscriber_service = Arc::new(SubscriberService::new(subscriber_repository.clone()));

        let notification_service = Arc::new(NotificationService::new(
            subscriber_repository,
            email_sender,
            config.base_url.clone(),
            config.email_from_name.clone(),
            config.notification_batch_size,
        ));

        Self {
            config: Arc::new(config),
            registration_service,
            auth_service,
            password_reset_service,
            subscriber_service,
            notification_service,
            token_issuer,
            pool,
        }
    }
}

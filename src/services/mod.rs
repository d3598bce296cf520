pub mod account_service;
pub mod auth_service;
pub mod email_service;
pub mod notification_service;
pub mod otp_service;
pub mod otp_store;
pub mod password;
pub mod password_reset_service;
pub mod registration_service;
pub mod subscriber_service;
pub mod token_service;
pub mod validation;

pub use account_service::{AccountError, AccountService};
pub use auth_service::{AuthService, AuthServiceError, JwtResponse};
pub use email_service::{create_email_sender, EmailError, EmailSender};
pub use notification_service::{NotificationService, NotificationSummary};
pub use otp_service::{OtpError, OtpService, OtpSettings};
pub use otp_store::{InMemoryOtpStore, OtpStore, SqliteOtpStore};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use password_reset_service::{PasswordResetError, PasswordResetService};
pub use registration_service::{
    RegistrationError, RegistrationService, RegistrationStarted, SignUpCompleted,
};
pub use subscriber_service::{SubscriberError, SubscriberService};
pub use token_service::{JwtTokenIssuer, Principal, TokenIssuer};

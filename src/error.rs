use crate::repositories::RepositoryError;
use crate::response::ApiResponse;
use crate::services::{
    account_service::AccountError, auth_service::AuthServiceError, otp_service::OtpError,
    password_reset_service::PasswordResetError, registration_service::RegistrationError,
    subscriber_service::SubscriberError, token_service::TokenError,
};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable `errorCode` values of the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ExistingEmail,
    AlreadySubscribed,
    NotFound,
    Forbidden,
    IncorrectOtp,
    InvalidOtp,
    VerificationPending,
    DeliveryFailure,
    InternalError,
    ValidationError,
    Unauthorized,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ExistingEmail => "EXISTING_EMAIL",
            ErrorCode::AlreadySubscribed => "ALREADY_SUBSCRIBED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::IncorrectOtp => "INCORRECT_OTP",
            ErrorCode::InvalidOtp => "INVALID_OTP",
            ErrorCode::VerificationPending => "VERIFICATION_PENDING",
            ErrorCode::DeliveryFailure => "DELIVERY_FAILURE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{1}")]
    Forbidden(ErrorCode, String),

    #[error("{0}")]
    NotFound(String),

    #[error("{1}")]
    Conflict(ErrorCode, String),

    #[error("Email delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(..) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::DeliveryFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::Forbidden(code, _) | AppError::Conflict(code, _) => *code,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::DeliveryFailure(_) => ErrorCode::DeliveryFailure,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::DeliveryFailure(_) => {
                "We could not send the email. Please try again shortly.".to_string()
            }
            AppError::Internal(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Internal(detail) => tracing::error!("Internal error: {}", detail),
            AppError::DeliveryFailure(detail) => tracing::error!("Delivery failure: {}", detail),
            _ => tracing::debug!("Request failed with {}: {}", status, self),
        }

        let body = ApiResponse::error(self.public_message(), self.code().as_str());
        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => AppError::NotFound("Record not found".to_string()),
            RepositoryError::EmailTaken => AppError::Conflict(
                ErrorCode::ExistingEmail,
                "A user already exists with the supplied email".to_string(),
            ),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<OtpError> for AppError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::DeliveryFailure(e) => AppError::DeliveryFailure(e.to_string()),
            OtpError::Store(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => {
                AppError::Conflict(ErrorCode::ExistingEmail, err.to_string())
            }
            AccountError::RegistrationNotFound => AppError::NotFound(err.to_string()),
            // Missing role seed data is a deployment fault, not a client one.
            AccountError::RoleNotFound(_)
            | AccountError::UsernameExhausted(_)
            | AccountError::Hashing(_)
            | AccountError::RepositoryError(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(msg) => AppError::Validation(msg),
            RegistrationError::EmailExists => {
                AppError::Conflict(ErrorCode::ExistingEmail, err.to_string())
            }
            RegistrationError::NotFound => AppError::NotFound(err.to_string()),
            RegistrationError::IncorrectOtp => {
                AppError::Forbidden(ErrorCode::IncorrectOtp, err.to_string())
            }
            RegistrationError::VerificationPending => {
                AppError::Forbidden(ErrorCode::VerificationPending, err.to_string())
            }
            RegistrationError::Otp(e) => e.into(),
            RegistrationError::Account(e) => e.into(),
            RegistrationError::RepositoryError(e) => e.into(),
        }
    }
}

impl From<AuthServiceError> for AppError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            AuthServiceError::TokenError(e) => AppError::Internal(e.to_string()),
            AuthServiceError::RepositoryError(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AppError::Unauthorized(err.to_string()),
            TokenError::Signing(msg) => AppError::Internal(msg),
        }
    }
}

impl From<PasswordResetError> for AppError {
    fn from(err: PasswordResetError) -> Self {
        match err {
            PasswordResetError::UserNotFound => AppError::NotFound(err.to_string()),
            PasswordResetError::InvalidOtp => {
                AppError::Forbidden(ErrorCode::InvalidOtp, err.to_string())
            }
            PasswordResetError::WeakPassword => AppError::Validation(err.to_string()),
            PasswordResetError::Otp(e) => e.into(),
            PasswordResetError::Hashing(e) => AppError::Internal(e.to_string()),
            PasswordResetError::RepositoryError(e) => e.into(),
        }
    }
}

impl From<SubscriberError> for AppError {
    fn from(err: SubscriberError) -> Self {
        match err {
            SubscriberError::InvalidEmail => AppError::Validation(err.to_string()),
            SubscriberError::AlreadySubscribed => {
                AppError::Conflict(ErrorCode::AlreadySubscribed, err.to_string())
            }
            SubscriberError::NotFound => AppError::NotFound(err.to_string()),
            SubscriberError::RepositoryError(e) => e.into(),
        }
    }
}

use crate::models::{OtpIssue, OtpPurpose, User};
use crate::repositories::{RepositoryError, UserRepository};
use crate::services::otp_service::{OtpError, OtpService};
use crate::services::password::{HashingError, PasswordHasher};
use crate::services::validation::{is_strong_enough, normalize_email};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PasswordResetError {
    #[error("No user found with this email")]
    UserNotFound,
    #[error("Invalid or expired OTP")]
    InvalidOtp,
    #[error("Password too weak (minimum 8 characters)")]
    WeakPassword,
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error(transparent)]
    Hashing(#[from] HashingError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

/// Password reset over the same OTP engine as signup, keyed by user id.
pub struct PasswordResetService {
    users: Arc<dyn UserRepository>,
    otp: Arc<OtpService>,
    hasher: Arc<dyn PasswordHasher>,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        otp: Arc<OtpService>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self { users, otp, hasher }
    }

    pub async fn initiate(&self, email: &str) -> Result<OtpIssue, PasswordResetError> {
        let user = self.find_user(email).await?;
        let issue = self
            .otp
            .generate_and_send(&user.email, &user.audit.id, OtpPurpose::PasswordReset)
            .await?;
        tracing::info!("Password reset initiated for user {}", user.audit.id);
        Ok(issue)
    }

    /// Confirms the code without consuming it; `reset` consumes it.
    pub async fn validate_otp(&self, email: &str, otp: &str) -> Result<(), PasswordResetError> {
        let user = self.find_user(email).await?;
        if !self.otp.check(otp, &user.audit.id).await? {
            return Err(PasswordResetError::InvalidOtp);
        }
        Ok(())
    }

    pub async fn reset(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        let user = self.find_user(email).await?;

        // Reject weak passwords before the code is spent.
        if !is_strong_enough(new_password) {
            return Err(PasswordResetError::WeakPassword);
        }

        if !self.otp.validate(otp, &user.audit.id).await? {
            return Err(PasswordResetError::InvalidOtp);
        }

        let password_hash = self.hasher.hash(new_password)?;
        match self.users.update_password(&user.audit.id, &password_hash).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(PasswordResetError::UserNotFound),
            Err(e) => return Err(e.into()),
        }

        tracing::info!("Password reset completed for user {}", user.audit.id);
        Ok(())
    }

    pub async fn resend_otp(&self, email: &str) -> Result<OtpIssue, PasswordResetError> {
        let user = self.find_user(email).await?;
        let issue = self
            .otp
            .generate_and_send(&user.email, &user.audit.id, OtpPurpose::PasswordReset)
            .await?;
        tracing::info!("Password reset OTP resent for user {}", user.audit.id);
        Ok(issue)
    }

    async fn find_user(&self, email: &str) -> Result<User, PasswordResetError> {
        let email = normalize_email(email).ok_or(PasswordResetError::UserNotFound)?;
        self.users
            .find_by_email(&email)
            .await?
            .ok_or(PasswordResetError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_repository::MockUserRepository;
    use crate::services::email_service::MockEmailSender;
    use crate::services::otp_service::OtpSettings;
    use crate::services::otp_store::InMemoryOtpStore;
    use crate::services::password::Argon2PasswordHasher;

    fn service(users: MockUserRepository) -> PasswordResetService {
        let otp = Arc::new(OtpService::new(
            Arc::new(InMemoryOtpStore::new()),
            Arc::new(MockEmailSender::new()),
            OtpSettings::default(),
        ));
        PasswordResetService::new(Arc::new(users), otp, Arc::new(Argon2PasswordHasher))
    }

    #[tokio::test]
    async fn test_unknown_email_is_not_found() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Box::pin(async move { Ok(None) }));

        let result = service(users).initiate("ghost@x.com").await;
        assert!(matches!(result, Err(PasswordResetError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_weak_password_rejected_before_otp() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| {
            Box::pin(async move {
                Ok(Some(User {
                    audit: crate::models::Audit::new(),
                    username: "a".to_string(),
                    email: "a@x.com".to_string(),
                    password_hash: "h".to_string(),
                    first_name: "a".to_string(),
                    last_name: "b".to_string(),
                    role_id: "r".to_string(),
                }))
            })
        });
        users.expect_update_password().never();

        let result = service(users).reset("a@x.com", "123456", "short").await;
        assert!(matches!(result, Err(PasswordResetError::WeakPassword)));
    }
}

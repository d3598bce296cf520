use crate::models::{OtpIssue, OtpPurpose, Registration, RoleName};
use crate::repositories::{RegistrationRepository, RepositoryError, UserRepository};
use crate::services::account_service::{AccountError, AccountService};
use crate::services::otp_service::{OtpError, OtpService};
use crate::services::validation::{is_strong_enough, normalize_email, normalize_name};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("{0}")]
    Validation(String),
    #[error("A user already exists with the supplied email")]
    EmailExists,
    #[error("Unknown registration id")]
    NotFound,
    #[error("Incorrect OTP")]
    IncorrectOtp,
    #[error("Email verification pending. Please verify your email to complete registration.")]
    VerificationPending,
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error(transparent)]
    Account(AccountError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

impl From<AccountError> for RegistrationError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::EmailTaken => RegistrationError::EmailExists,
            AccountError::RegistrationNotFound => RegistrationError::NotFound,
            other => RegistrationError::Account(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStarted {
    pub registration_id: String,
    #[serde(flatten)]
    pub otp: OtpIssue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpCompleted {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub message: String,
}

/// Drives a registration from submitted email to verified email to account.
///
/// Step progression lives in the registration's step set; codes live in the
/// OTP engine keyed by the registration id. With `skip_email_verification`
/// set, initiate and resend mark the email verified without sending
/// anything.
pub struct RegistrationService {
    registrations: Arc<dyn RegistrationRepository>,
    users: Arc<dyn UserRepository>,
    otp: Arc<OtpService>,
    accounts: Arc<AccountService>,
    skip_email_verification: bool,
}

impl RegistrationService {
    pub fn new(
        registrations: Arc<dyn RegistrationRepository>,
        users: Arc<dyn UserRepository>,
        otp: Arc<OtpService>,
        accounts: Arc<AccountService>,
        skip_email_verification: bool,
    ) -> Self {
        if skip_email_verification {
            tracing::warn!("⚠️  Email verification is DISABLED for registrations");
        }
        Self {
            registrations,
            users,
            otp,
            accounts,
            skip_email_verification,
        }
    }

    pub async fn initiate(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<RegistrationStarted, RegistrationError> {
        let email = normalize_email(email)
            .ok_or_else(|| RegistrationError::Validation("Invalid email address".to_string()))?;
        let first_name = normalize_name(first_name)
            .ok_or_else(|| RegistrationError::Validation("firstName is required".to_string()))?;
        let last_name = normalize_name(last_name)
            .ok_or_else(|| RegistrationError::Validation("lastName is required".to_string()))?;

        if self.users.exists_by_email(&email).await? {
            tracing::info!("Registration refused, {} already has an account", email);
            return Err(RegistrationError::EmailExists);
        }

        let registration = match self.registrations.find_by_email(&email).await? {
            Some(existing) => {
                tracing::info!("Reusing pending registration {}", existing.audit.id);
                existing
            }
            None => {
                let registration = Registration::new(email, first_name, last_name);
                match self.registrations.create(&registration).await {
                    Ok(()) => {}
                    Err(RepositoryError::EmailTaken) => {
                        tracing::warn!(
                            "Concurrent registration for {} won the race",
                            registration.email
                        );
                        return Err(RegistrationError::EmailExists);
                    }
                    Err(e) => return Err(e.into()),
                }
                tracing::info!("Registration {} created", registration.audit.id);
                registration
            }
        };

        let (registration_id, otp) = self.issue_code(registration).await?;

        Ok(RegistrationStarted {
            registration_id,
            otp,
        })
    }

    /// Re-sends the code for a pending registration, replacing the old one.
    pub async fn send_email_otp(&self, registration_id: &str) -> Result<OtpIssue, RegistrationError> {
        let registration = self.load(registration_id).await?;
        let (_, issue) = self.issue_code(registration).await?;
        Ok(issue)
    }

    pub async fn validate_otp(
        &self,
        registration_id: &str,
        code: &str,
    ) -> Result<(), RegistrationError> {
        let mut registration = self.load(registration_id).await?;

        if registration.is_email_verified() {
            return Ok(());
        }

        if !self.otp.validate(code, &registration.audit.id).await? {
            tracing::info!("Incorrect OTP for registration {}", registration.audit.id);
            return Err(RegistrationError::IncorrectOtp);
        }

        registration.mark_email_verified();
        self.registrations.update_steps(&registration).await?;
        tracing::info!("Email verified for registration {}", registration.audit.id);
        Ok(())
    }

    pub async fn complete_sign_up(
        &self,
        registration_id: &str,
        password: &str,
    ) -> Result<SignUpCompleted, RegistrationError> {
        self.complete(registration_id, password, RoleName::Reader).await
    }

    pub async fn complete_admin_sign_up(
        &self,
        registration_id: &str,
        password: &str,
    ) -> Result<SignUpCompleted, RegistrationError> {
        self.complete(registration_id, password, RoleName::Admin).await
    }

    async fn complete(
        &self,
        registration_id: &str,
        password: &str,
        role: RoleName,
    ) -> Result<SignUpCompleted, RegistrationError> {
        let registration = self.load(registration_id).await?;

        if !registration.is_email_verified() {
            return Err(RegistrationError::VerificationPending);
        }

        let password = password.trim();
        if !is_strong_enough(password) {
            return Err(RegistrationError::Validation(
                "Password too weak (minimum 8 characters)".to_string(),
            ));
        }

        let user = self
            .accounts
            .create_user(&registration, password, role)
            .await?;

        Ok(SignUpCompleted {
            user_id: user.audit.id,
            email: user.email,
            username: user.username,
            message: "Registration completed successfully".to_string(),
        })
    }

    async fn load(&self, registration_id: &str) -> Result<Registration, RegistrationError> {
        self.registrations
            .find_by_id(registration_id)
            .await?
            .ok_or(RegistrationError::NotFound)
    }

    async fn issue_code(
        &self,
        mut registration: Registration,
    ) -> Result<(String, OtpIssue), RegistrationError> {
        if self.skip_email_verification {
            if registration.mark_email_verified() {
                self.registrations.update_steps(&registration).await?;
            }
            tracing::warn!(
                "Skipping email verification for registration {}",
                registration.audit.id
            );
            let issue = OtpIssue::new(Utc::now(), self.otp.settings().ttl);
            return Ok((registration.audit.id, issue));
        }

        let issue = self
            .otp
            .generate_and_send(&registration.email, &registration.audit.id, OtpPurpose::Signup)
            .await?;
        Ok((registration.audit.id, issue))
    }
}

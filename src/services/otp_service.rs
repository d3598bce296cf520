use crate::models::{OtpIssue, OtpPurpose, OtpRecord};
use crate::repositories::RepositoryError;
use crate::services::email_service::{EmailError, EmailSender};
use crate::services::otp_store::OtpStore;
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, Rng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use subtle::ConstantTimeEq;
use tokio::sync::OwnedMutexGuard;

pub const OTP_LENGTH: usize = 6;
pub const OTP_TTL_MINUTES: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Failed to deliver verification code: {0}")]
    DeliveryFailure(#[from] EmailError),
    #[error("OTP store error: {0}")]
    Store(#[from] RepositoryError),
}

#[derive(Debug, Clone)]
pub struct OtpSettings {
    pub ttl: Duration,
    pub brand_name: String,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(OTP_TTL_MINUTES),
            brand_name: "Blogpress".to_string(),
        }
    }
}

/// Issues, delivers and checks six-digit one-time codes.
///
/// Work on one token identifier is serialized through a per-identifier
/// lock so a validate can never interleave with an overwrite of the same
/// record. Distinct identifiers never contend.
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    email_sender: Arc<dyn EmailSender>,
    settings: OtpSettings,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        email_sender: Arc<dyn EmailSender>,
        settings: OtpSettings,
    ) -> Self {
        Self {
            store,
            email_sender,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &OtpSettings {
        &self.settings
    }

    /// Stores a fresh code under `token_identifier` (replacing any earlier
    /// one) and emails it. The record is removed again if delivery fails.
    pub async fn generate_and_send(
        &self,
        destination_email: &str,
        token_identifier: &str,
        purpose: OtpPurpose,
    ) -> Result<OtpIssue, OtpError> {
        let _guard = self.lock_identifier(token_identifier).await;

        let issued_at = Utc::now();
        let issue = OtpIssue::new(issued_at, self.settings.ttl);
        let code = generate_code();

        self.store
            .put(
                token_identifier,
                OtpRecord {
                    code: code.clone(),
                    expires_at: issue.expire_at,
                },
            )
            .await?;

        let subject = subject_for(purpose);
        let body = self.render_message(&code, purpose);

        match self
            .email_sender
            .send(&[destination_email.to_string()], subject, &body)
            .await
        {
            Ok(delivery_id) => {
                tracing::info!(
                    "OTP issued for {} ({:?}), delivery id {}",
                    token_identifier,
                    purpose,
                    delivery_id
                );
                Ok(issue)
            }
            Err(e) => {
                tracing::error!("OTP delivery failed for {}: {}", token_identifier, e);
                if let Err(store_err) = self.store.delete(token_identifier).await {
                    tracing::warn!(
                        "Could not discard undelivered OTP for {}: {}",
                        token_identifier,
                        store_err
                    );
                }
                Err(OtpError::DeliveryFailure(e))
            }
        }
    }

    /// Single-use check: `true` consumes the record. Missing, expired or
    /// mismatched codes give `false`; a mismatch leaves the record alone.
    pub async fn validate(&self, code: &str, token_identifier: &str) -> Result<bool, OtpError> {
        let _guard = self.lock_identifier(token_identifier).await;

        if !self.matches_live_record(code, token_identifier).await? {
            return Ok(false);
        }

        self.store.delete(token_identifier).await?;
        tracing::info!("OTP validated and consumed for {}", token_identifier);
        Ok(true)
    }

    /// Same outcome as `validate` but a matching record is kept.
    pub async fn check(&self, code: &str, token_identifier: &str) -> Result<bool, OtpError> {
        let _guard = self.lock_identifier(token_identifier).await;
        self.matches_live_record(code, token_identifier).await
    }

    async fn matches_live_record(
        &self,
        code: &str,
        token_identifier: &str,
    ) -> Result<bool, OtpError> {
        let Some(record) = self.store.get(token_identifier).await? else {
            tracing::debug!("No OTP on record for {}", token_identifier);
            return Ok(false);
        };

        if record.is_expired_at(Utc::now()) {
            tracing::info!("Expired OTP presented for {}; purging", token_identifier);
            self.store.delete(token_identifier).await?;
            return Ok(false);
        }

        Ok(codes_match(&record.code, code))
    }

    async fn lock_identifier(&self, token_identifier: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries only referenced by the map are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(token_identifier.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    fn render_message(&self, code: &str, purpose: OtpPurpose) -> String {
        let intro = match purpose {
            OtpPurpose::Signup => {
                "Use the confirmation code below to verify your email and proceed to complete your account setup."
            }
            OtpPurpose::PasswordReset => {
                "Use the code below to reset your password. If you did not request a reset, you can ignore this email."
            }
        };

        format!(
            r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h2>{brand}</h2>
  <p>{intro}</p>
  <p style="font-size: 28px; font-weight: bold; letter-spacing: 6px;">{code}</p>
  <p>This code expires in {minutes} minutes.</p>
</body>
</html>"#,
            brand = self.settings.brand_name,
            intro = intro,
            code = code,
            minutes = self.settings.ttl.num_minutes(),
        )
    }
}

fn subject_for(purpose: OtpPurpose) -> &'static str {
    match purpose {
        OtpPurpose::Signup => "Verify your email address",
        OtpPurpose::PasswordReset => "Password reset code",
    }
}

/// Uniform over 000000..=999999, leading zeros kept.
pub fn generate_code() -> String {
    let value: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", value, width = OTP_LENGTH)
}

/// Exact string comparison in constant time. Different lengths never match.
fn codes_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email_service::MockEmailSender;
    use crate::services::otp_store::InMemoryOtpStore;

    fn ok_sender() -> MockEmailSender {
        let mut sender = MockEmailSender::new();
        sender
            .expect_send()
            .returning(|_, _, _| Box::pin(async move { Ok("id-1".to_string()) }));
        sender
    }

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_codes_match_is_exact() {
        assert!(codes_match("012345", "012345"));
        assert!(!codes_match("012345", "12345"));
        assert!(!codes_match("012345", "0123450"));
        assert!(!codes_match("012345", "012346"));
        assert!(!codes_match("012345", ""));
    }

    #[tokio::test]
    async fn test_delivery_failure_discards_record() {
        let store = Arc::new(InMemoryOtpStore::new());
        let mut sender = MockEmailSender::new();
        sender.expect_send().times(1).returning(|_, _, _| {
            Box::pin(async move { Err(EmailError::SendFailed("smtp down".to_string())) })
        });

        let service = OtpService::new(store.clone(), Arc::new(sender), OtpSettings::default());
        let result = service
            .generate_and_send("a@x.com", "r1", OtpPurpose::Signup)
            .await;

        assert!(matches!(result, Err(OtpError::DeliveryFailure(_))));
        assert!(store.get("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mismatch_keeps_record() {
        let store = Arc::new(InMemoryOtpStore::new());
        let service = OtpService::new(store.clone(), Arc::new(ok_sender()), OtpSettings::default());

        service
            .generate_and_send("a@x.com", "r1", OtpPurpose::Signup)
            .await
            .unwrap();
        let stored = store.get("r1").await.unwrap().unwrap();
        let wrong = if stored.code == "000000" { "000001" } else { "000000" };

        assert!(!service.validate(wrong, "r1").await.unwrap());
        assert_eq!(store.get("r1").await.unwrap(), Some(stored.clone()));
        assert!(service.validate(&stored.code, "r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_does_not_consume() {
        let store = Arc::new(InMemoryOtpStore::new());
        let service = OtpService::new(store.clone(), Arc::new(ok_sender()), OtpSettings::default());

        service
            .generate_and_send("a@x.com", "u1", OtpPurpose::PasswordReset)
            .await
            .unwrap();
        let code = store.get("u1").await.unwrap().unwrap().code;

        assert!(service.check(&code, "u1").await.unwrap());
        assert!(service.check(&code, "u1").await.unwrap());
        assert!(service.validate(&code, "u1").await.unwrap());
        assert!(!service.check(&code, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let store = Arc::new(InMemoryOtpStore::new());
        let service = OtpService::new(store, Arc::new(ok_sender()), OtpSettings::default());

        for id in ["a", "b", "c"] {
            service.validate("123456", id).await.unwrap();
        }
        service.validate("123456", "d").await.unwrap();

        let locks = service.locks.lock().unwrap();
        assert!(locks.len() <= 1);
    }

    #[test]
    fn test_message_mentions_code_and_expiry() {
        let service = OtpService::new(
            Arc::new(InMemoryOtpStore::new()),
            Arc::new(MockEmailSender::new()),
            OtpSettings::default(),
        );
        let body = service.render_message("004217", OtpPurpose::Signup);
        assert!(body.contains("004217"));
        assert!(body.contains("10 minutes"));
    }
}

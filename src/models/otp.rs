use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stored one-time code, keyed externally by its token identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Expiry metadata returned to clients after an OTP is issued.
/// Never carries the code itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpIssue {
    pub issued_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub duration_to_expire_minutes: i64,
    pub duration_to_expire_seconds: i64,
}

impl OtpIssue {
    pub fn new(issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            issued_at,
            expire_at: issued_at + ttl,
            duration_to_expire_minutes: ttl.num_minutes(),
            duration_to_expire_seconds: ttl.num_seconds(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Signup,
    PasswordReset,
}

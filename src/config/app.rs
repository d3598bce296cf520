use std::env;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};

const SIGNING_KEY_LEN: usize = 64;
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStoreKind {
    Memory,
    Sqlite,
}

impl FromStr for OtpStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(OtpStoreKind::Memory),
            "sqlite" => Ok(OtpStoreKind::Sqlite),
            other => Err(format!("Unknown OTP_STORE value: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub base_url: String,
    pub default_from_email: String,
    pub email_from_name: String,
    pub skip_email_verification: bool,
    pub jwt_secret: Option<String>,
    pub jwt_expiry_minutes: i64,
    pub otp_store: OtpStoreKind,
    pub notification_batch_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite:blogpress.db".to_string(),
            base_url: "http://localhost:8080".to_string(),
            default_from_email: "no-reply@blogpress.local".to_string(),
            email_from_name: "Blogpress".to_string(),
            skip_email_verification: false,
            jwt_secret: None,
            jwt_expiry_minutes: 1440,
            otp_store: OtpStoreKind::Memory,
            notification_batch_size: 50,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let otp_store = match env::var("OTP_STORE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!("{}; using in-memory OTP store", e);
                OtpStoreKind::Memory
            }),
            Err(_) => defaults.otp_store,
        };

        Self {
            environment: current_environment(),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            base_url: env::var("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            default_from_email: env::var("DEFAULT_FROM_EMAIL")
                .unwrap_or(defaults.default_from_email),
            email_from_name: env::var("EMAIL_FROM_NAME").unwrap_or(defaults.email_from_name),
            skip_email_verification: env_flag_enabled("SKIP_EMAIL_VERIFICATION"),
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            jwt_expiry_minutes: parse_var("JWT_EXPIRY_MINUTES", defaults.jwt_expiry_minutes),
            otp_store,
            notification_batch_size: parse_var(
                "NOTIFICATION_BATCH_SIZE",
                defaults.notification_batch_size,
            )
            .max(1),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Aborts start-up when a production deployment is misconfigured.
pub fn validate_production_config() {
    if current_environment() != "production" {
        return;
    }

    if env_flag_enabled("SKIP_EMAIL_VERIFICATION") {
        panic!("FATAL: SKIP_EMAIL_VERIFICATION must never be enabled in production");
    }

    let secret = match env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret,
        _ => panic!("FATAL: JWT_SECRET must be set in production"),
    };

    if decode_secret_bytes(&secret).len() < MIN_PRODUCTION_SECRET_LEN {
        panic!("FATAL: JWT_SECRET must be at least 32 bytes in production");
    }

    let lowered = secret.to_ascii_lowercase();
    if lowered.contains("example") || lowered.contains("changeme") || lowered.contains("default") {
        panic!("FATAL: JWT_SECRET appears to be a default value. Generate a secure secret!");
    }
}

pub fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

pub fn env_flag_enabled(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false)
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {} value {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Base64 when it decodes, raw bytes otherwise.
pub fn decode_secret_bytes(secret: &str) -> Vec<u8> {
    STANDARD
        .decode(secret.as_bytes())
        .unwrap_or_else(|_| secret.as_bytes().to_vec())
}

/// 64-byte HMAC key. Short secrets are stretched through SHA-512.
pub fn signing_key_from_secret_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() >= SIGNING_KEY_LEN {
        bytes[..SIGNING_KEY_LEN].to_vec()
    } else {
        Sha512::digest(bytes).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_secret_prefers_base64() {
        let encoded = STANDARD.encode(b"hello world");
        assert_eq!(decode_secret_bytes(&encoded), b"hello world".to_vec());
        assert_eq!(decode_secret_bytes("not base64!"), b"not base64!".to_vec());
    }

    #[test]
    fn test_signing_key_is_always_64_bytes() {
        assert_eq!(signing_key_from_secret_bytes(b"short").len(), 64);
        assert_eq!(signing_key_from_secret_bytes(&[7u8; 100]).len(), 64);
        assert_eq!(signing_key_from_secret_bytes(&[7u8; 100]), vec![7u8; 64]);
    }

    #[test]
    fn test_otp_store_kind_parse() {
        assert_eq!("SQLite".parse::<OtpStoreKind>(), Ok(OtpStoreKind::Sqlite));
        assert_eq!("memory".parse::<OtpStoreKind>(), Ok(OtpStoreKind::Memory));
        assert!("redis".parse::<OtpStoreKind>().is_err());
    }
}

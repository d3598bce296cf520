use crate::config::app::{decode_secret_bytes, signing_key_from_secret_bytes};
use crate::config::AppConfig;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid or expired token")]
    Invalid,
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Who a token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenIssuer: Send + Sync {
    fn issue_token(&self, principal: &Principal) -> Result<IssuedToken, TokenError>;
    fn validate_token(&self, token: &str) -> Result<Principal, TokenError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    roles: Vec<String>,
    iat: i64,
    exp: i64,
}

/// HS256 bearer tokens.
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtTokenIssuer {
    pub fn new(key: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let key = match &config.jwt_secret {
            Some(secret) => signing_key_from_secret_bytes(&decode_secret_bytes(secret)),
            None => {
                tracing::warn!("JWT_SECRET not set; generating ephemeral key (development only)");
                let mut key = vec![0u8; 64];
                rand::rngs::OsRng.fill_bytes(&mut key);
                key
            }
        };
        Self::new(&key, Duration::minutes(config.jwt_expiry_minutes))
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue_token(&self, principal: &Principal) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;

        let claims = Claims {
            sub: principal.user_id.clone(),
            email: principal.email.clone(),
            roles: principal.roles.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn validate_token(&self, token: &str) -> Result<Principal, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            TokenError::Invalid
        })?;

        Ok(Principal {
            user_id: data.claims.sub,
            email: data.claims.email,
            roles: data.claims.roles,
        })
    }
}

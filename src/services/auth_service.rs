use crate::models::User;
use crate::repositories::{RepositoryError, UserRepository};
use crate::services::password::PasswordHasher;
use crate::services::token_service::{Principal, TokenError, TokenIssuer};
use crate::services::validation::normalize_email;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtResponse {
    pub token: String,
    #[serde(rename = "type")]
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AuthService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            user_repository,
            hasher,
            tokens,
        }
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthServiceError> {
        let email = normalize_email(email).ok_or(AuthServiceError::InvalidCredentials)?;

        let user = self
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash) {
            return Err(AuthServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<JwtResponse, AuthServiceError> {
        let user = self.authenticate(email, password).await?;

        let roles = match self.user_repository.find_role_by_id(&user.role_id).await? {
            Some(role) => vec![role.name.to_string()],
            None => {
                tracing::warn!("User {} references unknown role {}", user.audit.id, user.role_id);
                Vec::new()
            }
        };

        let principal = Principal {
            user_id: user.audit.id.clone(),
            email: user.email.clone(),
            roles,
        };
        let issued = self.tokens.issue_token(&principal)?;

        tracing::info!("User {} signed in", user.audit.id);

        Ok(JwtResponse {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
            id: user.audit.id,
            username: user.username,
            email: user.email,
            roles: principal.roles,
        })
    }
}

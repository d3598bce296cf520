use crate::models::Subscriber;
use crate::repositories::{RepositoryError, SubscriberRepository};
use crate::services::validation::normalize_email;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Email already subscribed")]
    AlreadySubscribed,
    #[error("Subscriber not found")]
    NotFound,
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct SubscriberService {
    repository: Arc<dyn SubscriberRepository>,
}

impl SubscriberService {
    pub fn new(repository: Arc<dyn SubscriberRepository>) -> Self {
        Self { repository }
    }

    /// New addresses start active; unsubscribed ones are reactivated.
    pub async fn subscribe(&self, email: &str) -> Result<Subscriber, SubscriberError> {
        let email = normalize_email(email).ok_or(SubscriberError::InvalidEmail)?;

        if let Some(mut existing) = self.repository.find_by_email(&email).await? {
            if existing.active {
                return Err(SubscriberError::AlreadySubscribed);
            }
            self.repository.set_active(&existing.audit.id, true).await?;
            existing.active = true;
            existing.audit.touch();
            tracing::info!("Subscriber {} reactivated", existing.audit.id);
            return Ok(existing);
        }

        let subscriber = Subscriber::new(email);
        match self.repository.create(&subscriber).await {
            Ok(()) => {}
            Err(RepositoryError::EmailTaken) => return Err(SubscriberError::AlreadySubscribed),
            Err(e) => return Err(e.into()),
        }
        tracing::info!("New subscriber {}", subscriber.audit.id);
        Ok(subscriber)
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<(), SubscriberError> {
        let email = normalize_email(email).ok_or(SubscriberError::InvalidEmail)?;
        let subscriber = self
            .repository
            .find_by_email(&email)
            .await?
            .ok_or(SubscriberError::NotFound)?;

        self.repository.set_active(&subscriber.audit.id, false).await?;
        tracing::info!("Subscriber {} unsubscribed", subscriber.audit.id);
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Subscriber>, SubscriberError> {
        Ok(self.repository.list_all().await?)
    }

    pub async fn list_active(&self) -> Result<Vec<Subscriber>, SubscriberError> {
        Ok(self.repository.list_active().await?)
    }

    pub async fn active_count(&self) -> Result<i64, SubscriberError> {
        Ok(self.repository.count_active().await?)
    }

    /// Whether the address is on the list at all, active or not.
    pub async fn is_subscribed(&self, email: &str) -> Result<bool, SubscriberError> {
        let Some(email) = normalize_email(email) else {
            return Ok(false);
        };
        Ok(self.repository.find_by_email(&email).await?.is_some())
    }
}

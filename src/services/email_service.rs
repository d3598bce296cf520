use crate::config::AppConfig;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rand::Rng;
use std::env;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Failed to build email message: {0}")]
    MessageBuild(String),
    #[error("Failed to send email: {0}")]
    SendFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Outbound email capability. Returns a provider delivery id.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &[String], subject: &str, html_body: &str)
        -> Result<String, EmailError>;
}

/// Development sender: logs instead of delivering.
pub struct LogEmailSender {
    from_email: String,
}

impl LogEmailSender {
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(
        &self,
        to: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<String, EmailError> {
        if to.is_empty() {
            return Err(EmailError::MessageBuild("No recipients".to_string()));
        }

        let delivery_id = format!("log-{}", hex::encode(rand::thread_rng().gen::<[u8; 8]>()));
        tracing::info!("📧 [LOG EMAIL] {} -> {} recipient(s)", self.from_email, to.len());
        tracing::info!("   To: {}", to.join(", "));
        tracing::info!("   Subject: {}", subject);
        tracing::debug!("   Body: {}", html_body);
        tracing::info!("   Delivery id: {}", delivery_id);
        Ok(delivery_id)
    }
}

pub struct SmtpEmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(from_email: &str, from_name: &str) -> Result<Self, EmailError> {
        let smtp_host = env::var("SMTP_HOST")
            .map_err(|_| EmailError::ConfigError("SMTP_HOST not set".to_string()))?;
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .map_err(|_| EmailError::ConfigError("Invalid SMTP_PORT".to_string()))?;
        let smtp_username = env::var("SMTP_USERNAME")
            .map_err(|_| EmailError::ConfigError("SMTP_USERNAME not set".to_string()))?;
        let smtp_password = env::var("SMTP_PASSWORD")
            .map_err(|_| EmailError::ConfigError("SMTP_PASSWORD not set".to_string()))?;

        let encryption = env::var("SMTP_ENCRYPTION").unwrap_or_else(|_| "starttls".to_string());

        let credentials = Credentials::new(smtp_username, smtp_password);

        let mailer = match encryption.to_lowercase().as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)
                .map_err(|e| EmailError::ConfigError(format!("SMTP relay error: {}", e)))?
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            "starttls" => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp_host)
                .map_err(|e| EmailError::ConfigError(format!("SMTP starttls error: {}", e)))?
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            "none" => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .credentials(credentials)
                .build(),
            _ => {
                return Err(EmailError::ConfigError(format!(
                    "Invalid SMTP_ENCRYPTION value: {}. Use 'tls', 'starttls', or 'none'",
                    encryption
                )))
            }
        };

        let from = format!("{} <{}>", from_name, from_email)
            .parse::<Mailbox>()
            .map_err(|e| EmailError::ConfigError(format!("Invalid from address: {}", e)))?;

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(
        &self,
        to: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<String, EmailError> {
        if to.is_empty() {
            return Err(EmailError::MessageBuild("No recipients".to_string()));
        }

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);

        // Batches go out as Bcc so recipients never see each other.
        if let [single] = to {
            builder = builder.to(single
                .parse()
                .map_err(|e| EmailError::MessageBuild(format!("Invalid to address: {}", e)))?);
        } else {
            builder = builder.to(self.from.clone());
            for recipient in to {
                builder = builder.bcc(recipient.parse().map_err(|e| {
                    EmailError::MessageBuild(format!("Invalid bcc address: {}", e))
                })?);
            }
        }

        let email = builder
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| EmailError::MessageBuild(e.to_string()))?;

        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        let delivery_id = response
            .first_line()
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(delivery_id)
    }
}

pub fn create_email_sender(config: &AppConfig) -> Arc<dyn EmailSender> {
    if env::var("SMTP_HOST").is_ok() {
        match SmtpEmailSender::new(&config.default_from_email, &config.email_from_name) {
            Ok(sender) => {
                tracing::info!("Using SMTP email sender");
                Arc::new(sender)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize SMTP email sender: {}. Falling back to log sender",
                    e
                );
                Arc::new(LogEmailSender::new(config.default_from_email.clone()))
            }
        }
    } else {
        tracing::info!(
            "SMTP not configured. Using log email sender (emails will be logged to console)"
        );
        Arc::new(LogEmailSender::new(config.default_from_email.clone()))
    }
}

use crate::models::PublishedPost;
use crate::repositories::SubscriberRepository;
use crate::services::email_service::EmailSender;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    pub recipients: usize,
    pub batches_sent: usize,
    pub batches_failed: usize,
}

/// Emails active subscribers when a post goes live. Failures are logged and
/// never surface to the caller.
pub struct NotificationService {
    subscribers: Arc<dyn SubscriberRepository>,
    email_sender: Arc<dyn EmailSender>,
    base_url: String,
    brand_name: String,
    batch_size: usize,
}

impl NotificationService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        email_sender: Arc<dyn EmailSender>,
        base_url: impl Into<String>,
        brand_name: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            subscribers,
            email_sender,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            brand_name: brand_name.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub async fn notify_subscribers_of_new_post(&self, post: &PublishedPost) -> NotificationSummary {
        let mut summary = NotificationSummary::default();

        let active = match self.subscribers.list_active().await {
            Ok(active) => active,
            Err(e) => {
                tracing::error!("Could not load subscribers for post {}: {}", post.id, e);
                return summary;
            }
        };

        if active.is_empty() {
            tracing::info!("No active subscribers to notify for post: {}", post.title);
            return summary;
        }

        let recipients: Vec<String> = active.into_iter().map(|s| s.email).collect();
        summary.recipients = recipients.len();

        let subject = format!("New Post: {} - {}", post.title, self.brand_name);
        let body = self.render_new_post_email(post);

        for batch in recipients.chunks(self.batch_size) {
            match self.email_sender.send(batch, &subject, &body).await {
                Ok(delivery_id) => {
                    summary.batches_sent += 1;
                    tracing::info!(
                        "Sent new post notification to {} subscribers ({})",
                        batch.len(),
                        delivery_id
                    );
                }
                Err(e) => {
                    summary.batches_failed += 1;
                    tracing::error!(
                        "Failed to notify a batch of {} subscribers about {}: {}",
                        batch.len(),
                        post.id,
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Notified {} subscribers about new post {} ({} batches ok, {} failed)",
            summary.recipients,
            post.title,
            summary.batches_sent,
            summary.batches_failed
        );
        summary
    }

    /// Runs the fan-out on its own task so the publishing request never
    /// waits on it.
    pub fn spawn_new_post_notification(
        self: &Arc<Self>,
        post: PublishedPost,
    ) -> JoinHandle<NotificationSummary> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.notify_subscribers_of_new_post(&post).await })
    }

    fn render_new_post_email(&self, post: &PublishedPost) -> String {
        let excerpt = post
            .excerpt
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or("Click to read the full article...");

        format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h1>New Article Published!</h1>
  <h2>{title}</h2>
  <p>{excerpt}</p>
  <p><a href="{base}/posts/{segment}">Read Full Article</a></p>
  <hr>
  <p style="font-size: 12px; color: #666;">You're receiving this because you subscribed to {brand}.
  <a href="{base}/unsubscribe">Unsubscribe</a></p>
</body>
</html>"#,
            title = escape_html(&post.title),
            excerpt = escape_html(excerpt),
            base = self.base_url,
            segment = post.link_segment(),
            brand = escape_html(&self.brand_name),
        )
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

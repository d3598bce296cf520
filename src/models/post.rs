use serde::{Deserialize, Serialize};

/// The slice of a post the publish path hands to subscriber notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPost {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
}

impl PublishedPost {
    /// Path segment used in links: the slug when present, else the id.
    pub fn link_segment(&self) -> &str {
        self.slug
            .as_deref()
            .filter(|slug| !slug.is_empty())
            .unwrap_or(&self.id)
    }
}

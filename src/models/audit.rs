use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity and timestamps shared by every persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    /// Fresh audit block with a random v4 id, stamped now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Audit {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Audited {
    fn audit(&self) -> &Audit;

    fn id(&self) -> &str {
        &self.audit().id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.audit().created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.audit().updated_at
    }
}

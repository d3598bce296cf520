use super::audit::{Audit, Audited};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(flatten)]
    pub audit: Audit,
    pub email: String,
    pub active: bool,
}

impl Subscriber {
    pub fn new(email: String) -> Self {
        Self {
            audit: Audit::new(),
            email,
            active: true,
        }
    }
}

impl Audited for Subscriber {
    fn audit(&self) -> &Audit {
        &self.audit
    }
}

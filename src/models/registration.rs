use super::audit::{Audit, Audited};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStep {
    SubmitEmail,
    VerifyEmail,
}

impl RegistrationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStep::SubmitEmail => "SUBMIT_EMAIL",
            RegistrationStep::VerifyEmail => "VERIFY_EMAIL",
        }
    }
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SUBMIT_EMAIL" => Ok(RegistrationStep::SubmitEmail),
            "VERIFY_EMAIL" => Ok(RegistrationStep::VerifyEmail),
            other => Err(format!("Unknown registration step: {}", other)),
        }
    }
}

/// Set of completed steps. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepSet(BTreeSet<RegistrationStep>);

impl StepSet {
    pub fn submitted() -> Self {
        let mut steps = BTreeSet::new();
        steps.insert(RegistrationStep::SubmitEmail);
        Self(steps)
    }

    pub fn contains(&self, step: RegistrationStep) -> bool {
        self.0.contains(&step)
    }

    /// Returns `true` if the step was not already present.
    pub fn insert(&mut self, step: RegistrationStep) -> bool {
        self.0.insert(step)
    }

    pub fn iter(&self) -> impl Iterator<Item = RegistrationStep> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column encoding: comma separated step names.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(RegistrationStep::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn decode(raw: &str) -> Result<Self, String> {
        raw.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(RegistrationStep::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }
}

impl FromIterator<RegistrationStep> for StepSet {
    fn from_iter<I: IntoIterator<Item = RegistrationStep>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A pending, not-yet-materialized account request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(flatten)]
    pub audit: Audit,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub completed_steps: StepSet,
}

impl Registration {
    pub fn new(email: String, first_name: String, last_name: String) -> Self {
        Self {
            audit: Audit::new(),
            email,
            first_name,
            last_name,
            completed_steps: StepSet::submitted(),
        }
    }

    pub fn is_email_verified(&self) -> bool {
        self.completed_steps.contains(RegistrationStep::VerifyEmail)
    }

    /// Marks the email verified. Returns `false` when it already was.
    pub fn mark_email_verified(&mut self) -> bool {
        let added = self.completed_steps.insert(RegistrationStep::VerifyEmail);
        if added {
            self.audit.touch();
        }
        added
    }
}

impl Audited for Registration {
    fn audit(&self) -> &Audit {
        &self.audit
    }
}

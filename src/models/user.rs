use super::audit::{Audit, Audited};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_USERNAME_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub audit: Audit,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: String,
}

impl Audited for User {
    fn audit(&self) -> &Audit {
        &self.audit
    }
}

/// Fields for a user insert; the audit block is generated by the caller.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub audit: Audit,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role_id: String,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            audit: self.audit,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role_id: self.role_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleName {
    #[serde(rename = "ROLE_READER")]
    Reader,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Reader => "ROLE_READER",
            RoleName::Admin => "ROLE_ADMIN",
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_READER" | "READER" => Ok(RoleName::Reader),
            "ROLE_ADMIN" | "ADMIN" => Ok(RoleName::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(flatten)]
    pub audit: Audit,
    pub name: RoleName,
}

impl Audited for Role {
    fn audit(&self) -> &Audit {
        &self.audit
    }
}

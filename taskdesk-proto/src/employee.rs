//! Employee identity records.
//!
//! Employees are owned by an external identity store; the board only reads
//! them. The role decides the view scope: owners and admins see every
//! project, basic users see their own assignment list.

use serde::{Deserialize, Serialize};

/// Role of an employee, controlling view scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Account owner; sees all projects.
    Owner,
    /// Administrator; sees all projects.
    Admin,
    /// Basic user; sees only their own task list.
    User,
}

impl Role {
    /// Returns `true` for roles that see every project.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

/// An employee record from the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Stable external chat identity.
    pub user_id: String,
    /// Display name; also the value stored in task `responsible` lists.
    pub name: String,
    /// Role deciding view scope.
    pub role: Role,
    /// Phone number (informational only).
    pub phone: Option<String>,
}

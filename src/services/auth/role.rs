//! Roles carried in access tokens and the predicate trait the role gate is built on.
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Educator,
    Learner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Educator => "educator",
            Role::Learner => "learner",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "educator" => Some(Self::Educator),
            "learner" => Some(Self::Learner),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate over roles, evaluated before a handler touches the store.
///
/// Implemented by uninhabited tag types so a route's requirement is part of its
/// handler signature (`Authorized<EducatorOnly>`).
pub trait RolePolicy: Send + Sync + 'static {
    /// Human readable requirement, used in the 403 message.
    const REQUIREMENT: &'static str;

    fn permits(role: Role) -> bool;
}

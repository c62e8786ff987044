//! Tenancy concepts the core consumes from the excluded user/unit modules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Guard,
    Resident,
}

impl Role {
    /// Returns the string representation used in storage and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Guard => "GUARD",
            Role::Resident => "RESIDENT",
        }
    }

    /// Parses a stored role value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "GUARD" => Some(Role::Guard),
            "RESIDENT" => Some(Role::Resident),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Immutable audit records of access decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{AccessAttemptId, DeviceId, TenantId, Timestamp, UnitId, UserId};

/// How the open request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessMethod {
    App,
    Qr,
    GuardOverride,
    Remote,
}

impl AccessMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMethod::App => "APP",
            AccessMethod::Qr => "QR",
            AccessMethod::GuardOverride => "GUARD_OVERRIDE",
            AccessMethod::Remote => "REMOTE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "APP" => Some(AccessMethod::App),
            "QR" => Some(AccessMethod::Qr),
            "GUARD_OVERRIDE" => Some(AccessMethod::GuardOverride),
            "REMOTE" => Some(AccessMethod::Remote),
            _ => None,
        }
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of passage through the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Entry => "ENTRY",
            Direction::Exit => "EXIT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ENTRY" => Some(Direction::Entry),
            "EXIT" => Some(Direction::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Free-form visitor metadata attached to an attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorInfo {
    pub name: Option<String>,
    pub plate: Option<String>,
    pub notes: Option<String>,
}

/// One access decision outcome, append-only.
///
/// Created exactly once per decision that reaches a terminal policy branch.
/// Rows are never mutated; a scheduled retention sweep owned by the reporting
/// collaborators is the only deletion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessAttempt {
    pub id: AccessAttemptId,
    pub tenant_id: TenantId,
    pub unit_id: Option<UnitId>,
    /// None for anonymous QR entries.
    pub actor_id: Option<UserId>,
    pub device_id: DeviceId,
    pub method: AccessMethod,
    pub direction: Direction,
    pub granted: bool,
    pub reason: String,
    pub visitor: VisitorInfo,
    pub created_at: Timestamp,
}

/// Fields of an attempt before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAccessAttempt {
    pub tenant_id: TenantId,
    pub unit_id: Option<UnitId>,
    pub actor_id: Option<UserId>,
    pub device_id: DeviceId,
    pub method: AccessMethod,
    pub direction: Direction,
    pub granted: bool,
    pub reason: String,
    pub visitor: VisitorInfo,
}

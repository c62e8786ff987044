//! Persisted notifications and their delivery metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{NotificationId, TenantId, Timestamp, UserId};

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Sent by an administrator through the excluded notifications module.
    Manual,
    /// A visitor redeemed a QR code issued by the recipient's unit.
    QrUsed,
    /// A device stopped responding on its status topic.
    DeviceOffline,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Manual => "MANUAL",
            NotificationKind::QrUsed => "QR_USED",
            NotificationKind::DeviceOffline => "DEVICE_OFFLINE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MANUAL" => Some(NotificationKind::Manual),
            "QR_USED" => Some(NotificationKind::QrUsed),
            "DEVICE_OFFLINE" => Some(NotificationKind::DeviceOffline),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted notification row.
///
/// The push delivery is a best-effort side effect; this row exists whether or
/// not the push succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub read_at: Option<Timestamp>,
}

/// Fields of a notification before the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_roundtrips() {
        for kind in [
            NotificationKind::Manual,
            NotificationKind::QrUsed,
            NotificationKind::DeviceOffline,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse("PAYMENT_DUE"), None);
    }
}

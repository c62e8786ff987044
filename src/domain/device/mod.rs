//! Physical access devices: gates, doors, and vehicle barriers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DeviceId, TenantId, Timestamp};

/// Kind of actuator the device controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceKind {
    Gate,
    Door,
    Barrier,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Gate => "GATE",
            DeviceKind::Door => "DOOR",
            DeviceKind::Barrier => "BARRIER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GATE" => Some(DeviceKind::Gate),
            "DOOR" => Some(DeviceKind::Door),
            "BARRIER" => Some(DeviceKind::Barrier),
            _ => None,
        }
    }
}

/// Broker-reported connectivity status of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Online,
    Offline,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "ONLINE",
            DeviceStatus::Offline => "OFFLINE",
            DeviceStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ONLINE" => Some(DeviceStatus::Online),
            "OFFLINE" => Some(DeviceStatus::Offline),
            "ERROR" => Some(DeviceStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A physical access device owned by a tenant.
///
/// The optional `topic` is the broker topic the OPEN command is published to;
/// it also serves as the prefix for the device's status topics. Devices are
/// never deleted while access or QR records reference them; administrative
/// collaborators deactivate them instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub tenant_id: TenantId,
    pub name: String,
    pub kind: DeviceKind,
    pub topic: Option<String>,
    pub status: DeviceStatus,
    pub is_active: bool,
    pub last_seen: Option<Timestamp>,
}

impl Device {
    /// Topic carrying the device's reachability boolean, if a topic is configured.
    pub fn online_topic(&self) -> Option<String> {
        self.topic.as_ref().map(|t| format!("{}/online", t))
    }

    /// Telemetry topic; any message on it is treated as a liveness signal.
    pub fn rpc_topic(&self) -> Option<String> {
        self.topic.as_ref().map(|t| format!("{}/events/rpc", t))
    }
}

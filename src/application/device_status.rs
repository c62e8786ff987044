//! Device connectivity tracking driven by broker status topics.
//!
//! For every device with a configured topic the tracker subscribes to
//! `<topic>/online` (explicit reachability flag) and `<topic>/events/rpc`
//! (any telemetry counts as liveness). Status writes are idempotent; the
//! offline notification is edge-triggered off an in-memory last-known map so
//! a flapping broker session cannot flood tenant administrators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::application::notification_fanout::NotificationFanout;
use crate::domain::device::{Device, DeviceStatus};
use crate::domain::foundation::{DeviceId, DomainError, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::tenancy::Role;
use crate::ports::{CommandBus, DeviceRepository, MessageHandler};

pub struct DeviceStatusTracker {
    devices: Arc<dyn DeviceRepository>,
    fanout: NotificationFanout,
    last_known: Mutex<HashMap<DeviceId, DeviceStatus>>,
}

impl DeviceStatusTracker {
    pub fn new(devices: Arc<dyn DeviceRepository>, fanout: NotificationFanout) -> Self {
        Self {
            devices,
            fanout,
            last_known: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribes the status topics of every device that has a broker topic.
    ///
    /// The last-known map is seeded from the stored status, so a device that
    /// was online before a restart still produces the offline notification
    /// when its first report after the restart says so.
    pub async fn subscribe_all(
        self: &Arc<Self>,
        bus: &dyn CommandBus,
    ) -> Result<usize, DomainError> {
        let devices = self.devices.list_with_topic().await?;
        let mut subscribed = 0;

        for device in devices {
            let (Some(online_topic), Some(rpc_topic)) =
                (device.online_topic(), device.rpc_topic())
            else {
                continue;
            };
            self.seed(&device);

            bus.subscribe(
                &online_topic,
                Arc::new(OnlineHandler {
                    tracker: Arc::clone(self),
                    device: device.clone(),
                }),
            )
            .await?;
            bus.subscribe(
                &rpc_topic,
                Arc::new(RpcHandler {
                    tracker: Arc::clone(self),
                    device: device.clone(),
                }),
            )
            .await?;
            subscribed += 1;
        }

        info!(devices = subscribed, "device status subscriptions established");
        Ok(subscribed)
    }

    fn seed(&self, device: &Device) {
        self.lock().insert(device.id, device.status);
    }

    /// Records a status report and notifies admins on the offline transition.
    pub async fn apply(&self, device: &Device, status: DeviceStatus) -> Result<(), DomainError> {
        let now = Timestamp::now();
        self.devices.update_status(device.id, status, now).await?;

        let previous = self.lock().insert(device.id, status);
        debug!(device = %device.id, status = %status, ?previous, "device status report");

        if status == DeviceStatus::Offline && previous == Some(DeviceStatus::Online) {
            info!(device = %device.id, name = %device.name, "device went offline");
            self.fanout.send_to_role(
                device.tenant_id,
                Role::Admin,
                NotificationKind::DeviceOffline,
                "Dispositivo sin conexión",
                format!("{} perdió conexión con la plataforma", device.name),
                json!({ "device_id": device.id, "device_name": device.name }),
            );
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DeviceId, DeviceStatus>> {
        self.last_known
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handler for `<topic>/online`: a truthy payload marks the device online.
struct OnlineHandler {
    tracker: Arc<DeviceStatusTracker>,
    device: Device,
}

#[async_trait]
impl MessageHandler for OnlineHandler {
    async fn handle(&self, topic: &str, payload: &[u8]) -> Result<(), DomainError> {
        let status = match parse_online_flag(payload) {
            Some(true) => DeviceStatus::Online,
            Some(false) => DeviceStatus::Offline,
            None => {
                warn!(topic, "unparseable online payload");
                return Ok(());
            }
        };
        self.tracker.apply(&self.device, status).await
    }

    fn name(&self) -> &'static str {
        "device-online"
    }
}

/// Handler for `<topic>/events/rpc`: any message is a liveness signal.
struct RpcHandler {
    tracker: Arc<DeviceStatusTracker>,
    device: Device,
}

#[async_trait]
impl MessageHandler for RpcHandler {
    async fn handle(&self, _topic: &str, _payload: &[u8]) -> Result<(), DomainError> {
        self.tracker.apply(&self.device, DeviceStatus::Online).await
    }

    fn name(&self) -> &'static str {
        "device-rpc"
    }
}

/// Firmware publishes the flag as a bare boolean/number or a JSON bool.
fn parse_online_flag(payload: &[u8]) -> Option<bool> {
    let text = std::str::from_utf8(payload).ok()?.trim().to_ascii_lowercase();
    match text.as_str() {
        "true" | "1" | "online" => Some(true),
        "false" | "0" | "offline" => Some(false),
        _ => None,
    }
}

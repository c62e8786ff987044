//! In-memory device store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::device::{Device, DeviceStatus};
use crate::domain::foundation::{DeviceId, DomainError, TenantId, Timestamp};
use crate::ports::DeviceRepository;

#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<HashMap<DeviceId, Device>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a device.
    pub async fn add(&self, device: Device) {
        self.devices.write().await.insert(device.id, device);
    }

    /// Direct lookup without tenant scoping (test assertions).
    pub async fn get(&self, device_id: DeviceId) -> Option<Device> {
        self.devices.read().await.get(&device_id).cloned()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn find_active(
        &self,
        tenant_id: TenantId,
        device_id: DeviceId,
    ) -> Result<Option<Device>, DomainError> {
        Ok(self
            .devices
            .read()
            .await
            .get(&device_id)
            .filter(|d| d.tenant_id == tenant_id && d.is_active)
            .cloned())
    }

    async fn list_with_topic(&self) -> Result<Vec<Device>, DomainError> {
        Ok(self
            .devices
            .read()
            .await
            .values()
            .filter(|d| d.is_active && d.topic.is_some())
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        device_id: DeviceId,
        status: DeviceStatus,
        seen_at: Timestamp,
    ) -> Result<(), DomainError> {
        if let Some(device) = self.devices.write().await.get_mut(&device_id) {
            device.status = status;
            device.last_seen = Some(seen_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::DeviceKind;

    fn device(tenant: TenantId, active: bool) -> Device {
        Device {
            id: DeviceId::new(),
            tenant_id: tenant,
            name: "Puerta peatonal".to_string(),
            kind: DeviceKind::Door,
            topic: Some("iados/t/door".to_string()),
            status: DeviceStatus::Offline,
            is_active: active,
            last_seen: None,
        }
    }

    #[tokio::test]
    async fn find_active_scopes_by_tenant_and_activity() {
        let repo = InMemoryDeviceRepository::new();
        let tenant = TenantId::new();
        let active = device(tenant, true);
        let inactive = device(tenant, false);
        repo.add(active.clone()).await;
        repo.add(inactive.clone()).await;

        assert!(repo.find_active(tenant, active.id).await.unwrap().is_some());
        assert!(repo.find_active(tenant, inactive.id).await.unwrap().is_none());
        assert!(repo
            .find_active(TenantId::new(), active.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_status_records_last_seen() {
        let repo = InMemoryDeviceRepository::new();
        let d = device(TenantId::new(), true);
        repo.add(d.clone()).await;

        let seen = Timestamp::from_unix_secs(5000);
        repo.update_status(d.id, DeviceStatus::Online, seen).await.unwrap();

        let stored = repo.get(d.id).await.unwrap();
        assert_eq!(stored.status, DeviceStatus::Online);
        assert_eq!(stored.last_seen, Some(seen));
    }
}

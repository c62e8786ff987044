//! Device storage port.

use async_trait::async_trait;

use crate::domain::device::{Device, DeviceStatus};
use crate::domain::foundation::{DeviceId, DomainError, TenantId, Timestamp};

/// Port for reading devices and recording their connectivity status.
///
/// Device CRUD belongs to the excluded administrative modules; the core only
/// needs tenant-scoped lookup and the status/last-seen writes performed by the
/// status tracker.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Finds an active device belonging to the tenant.
    async fn find_active(
        &self,
        tenant_id: TenantId,
        device_id: DeviceId,
    ) -> Result<Option<Device>, DomainError>;

    /// All active devices with a configured broker topic, across tenants.
    ///
    /// Used at startup to set up status subscriptions.
    async fn list_with_topic(&self) -> Result<Vec<Device>, DomainError>;

    /// Records a connectivity status and last-seen time.
    ///
    /// Idempotent: repeated identical writes are harmless.
    async fn update_status(
        &self,
        device_id: DeviceId,
        status: DeviceStatus,
        seen_at: Timestamp,
    ) -> Result<(), DomainError>;
}

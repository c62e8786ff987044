//! PostgreSQL implementation of DeviceRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::device::{Device, DeviceKind, DeviceStatus};
use crate::domain::foundation::{DeviceId, DomainError, TenantId, Timestamp};
use crate::ports::DeviceRepository;

pub struct PostgresDeviceRepository {
    pool: PgPool,
}

impl PostgresDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    kind: String,
    topic: Option<String>,
    status: String,
    is_active: bool,
    last_seen: Option<DateTime<Utc>>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let kind = DeviceKind::parse(&row.kind)
            .ok_or_else(|| DomainError::database(format!("invalid device kind: {}", row.kind)))?;
        let status = DeviceStatus::parse(&row.status)
            .ok_or_else(|| DomainError::database(format!("invalid device status: {}", row.status)))?;

        Ok(Device {
            id: DeviceId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            name: row.name,
            kind,
            topic: row.topic,
            status,
            is_active: row.is_active,
            last_seen: row.last_seen.map(Timestamp::from_datetime),
        })
    }
}

const DEVICE_COLUMNS: &str = "id, tenant_id, name, kind, topic, status, is_active, last_seen";

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn find_active(
        &self,
        tenant_id: TenantId,
        device_id: DeviceId,
    ) -> Result<Option<Device>, DomainError> {
        let row: Option<DeviceRow> = sqlx::query_as(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1 AND tenant_id = $2 AND is_active"
        ))
        .bind(device_id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to load device: {e}")))?;

        row.map(Device::try_from).transpose()
    }

    async fn list_with_topic(&self) -> Result<Vec<Device>, DomainError> {
        let rows: Vec<DeviceRow> = sqlx::query_as(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE is_active AND topic IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to list devices: {e}")))?;

        rows.into_iter().map(Device::try_from).collect()
    }

    async fn update_status(
        &self,
        device_id: DeviceId,
        status: DeviceStatus,
        seen_at: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE devices SET status = $2, last_seen = $3 WHERE id = $1")
            .bind(device_id.as_uuid())
            .bind(status.as_str())
            .bind(seen_at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("failed to update device status: {e}")))?;
        Ok(())
    }
}

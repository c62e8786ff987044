//! PostgreSQL implementation of AccessLogStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::access::{AccessAttempt, AccessMethod, Direction, NewAccessAttempt, VisitorInfo};
use crate::domain::foundation::{
    AccessAttemptId, DeviceId, DomainError, TenantId, Timestamp, UnitId, UserId,
};
use crate::ports::{AccessLogFilter, AccessLogStore, Page, Paginated};

pub struct PostgresAccessLogStore {
    pool: PgPool,
}

impl PostgresAccessLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttemptRow {
    id: Uuid,
    tenant_id: Uuid,
    unit_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    device_id: Uuid,
    method: String,
    direction: String,
    granted: bool,
    reason: String,
    visitor_name: Option<String>,
    visitor_plate: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AttemptRow> for AccessAttempt {
    type Error = DomainError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        let method = AccessMethod::parse(&row.method)
            .ok_or_else(|| DomainError::database(format!("invalid access method: {}", row.method)))?;
        let direction = Direction::parse(&row.direction).ok_or_else(|| {
            DomainError::database(format!("invalid direction: {}", row.direction))
        })?;

        Ok(AccessAttempt {
            id: AccessAttemptId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            unit_id: row.unit_id.map(UnitId::from_uuid),
            actor_id: row.actor_id.map(UserId::from_uuid),
            device_id: DeviceId::from_uuid(row.device_id),
            method,
            direction,
            granted: row.granted,
            reason: row.reason,
            visitor: VisitorInfo {
                name: row.visitor_name,
                plate: row.visitor_plate,
                notes: row.notes,
            },
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const ATTEMPT_COLUMNS: &str = "id, tenant_id, unit_id, actor_id, device_id, method, direction, \
     granted, reason, visitor_name, visitor_plate, notes, created_at";

// NULL filter parameters are unconstrained; keeps the query planner on one
// prepared statement for every filter combination.
const FILTER_CLAUSE: &str = "tenant_id = $1 \
     AND ($2::uuid IS NULL OR unit_id = $2) \
     AND ($3::text IS NULL OR method = $3) \
     AND ($4::timestamptz IS NULL OR created_at >= $4) \
     AND ($5::timestamptz IS NULL OR created_at < $5)";

#[async_trait]
impl AccessLogStore for PostgresAccessLogStore {
    async fn append(&self, attempt: NewAccessAttempt) -> Result<AccessAttempt, DomainError> {
        let row: AttemptRow = sqlx::query_as(&format!(
            "INSERT INTO access_attempts (
                 id, tenant_id, unit_id, actor_id, device_id, method, direction,
                 granted, reason, visitor_name, visitor_plate, notes, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(AccessAttemptId::new().as_uuid())
        .bind(attempt.tenant_id.as_uuid())
        .bind(attempt.unit_id.map(|u| *u.as_uuid()))
        .bind(attempt.actor_id.map(|u| *u.as_uuid()))
        .bind(attempt.device_id.as_uuid())
        .bind(attempt.method.as_str())
        .bind(attempt.direction.as_str())
        .bind(attempt.granted)
        .bind(&attempt.reason)
        .bind(&attempt.visitor.name)
        .bind(&attempt.visitor.plate)
        .bind(&attempt.visitor.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to append access attempt: {e}")))?;

        row.try_into()
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &AccessLogFilter,
        page: Page,
    ) -> Result<Paginated<AccessAttempt>, DomainError> {
        let unit = filter.unit_id.map(|u| *u.as_uuid());
        let method = filter.method.map(|m| m.as_str());
        let from = filter.from.map(|t| *t.as_datetime());
        let to = filter.to.map(|t| *t.as_datetime());

        let rows: Vec<AttemptRow> = sqlx::query_as(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM access_attempts
             WHERE {FILTER_CLAUSE}
             ORDER BY created_at DESC
             LIMIT $6 OFFSET $7"
        ))
        .bind(tenant_id.as_uuid())
        .bind(unit)
        .bind(method)
        .bind(from)
        .bind(to)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to list access attempts: {e}")))?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM access_attempts WHERE {FILTER_CLAUSE}"
        ))
        .bind(tenant_id.as_uuid())
        .bind(unit)
        .bind(method)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to count access attempts: {e}")))?;

        let items = rows
            .into_iter()
            .map(AccessAttempt::try_from)
            .collect::<Result<_, _>>()?;
        Ok(Paginated {
            items,
            total: total as u64,
        })
    }
}

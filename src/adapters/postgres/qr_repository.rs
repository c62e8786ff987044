//! PostgreSQL implementation of QrRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::access::QrCode;
use crate::domain::foundation::{DomainError, QrCodeId, TenantId, Timestamp, UnitId, UserId};
use crate::ports::{Page, Paginated, QrRepository};

pub struct PostgresQrRepository {
    pool: PgPool,
}

impl PostgresQrRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QrRow {
    id: Uuid,
    tenant_id: Uuid,
    unit_id: Uuid,
    issued_by: Uuid,
    code: String,
    visitor_name: String,
    max_uses: i32,
    used_count: i32,
    expires_at: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<QrRow> for QrCode {
    fn from(row: QrRow) -> Self {
        QrCode {
            id: QrCodeId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            unit_id: UnitId::from_uuid(row.unit_id),
            issued_by: UserId::from_uuid(row.issued_by),
            code: row.code,
            visitor_name: row.visitor_name,
            max_uses: row.max_uses.max(0) as u32,
            used_count: row.used_count.max(0) as u32,
            expires_at: Timestamp::from_datetime(row.expires_at),
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

const QR_COLUMNS: &str = "id, tenant_id, unit_id, issued_by, code, visitor_name, max_uses, \
     used_count, expires_at, is_active, created_at";

#[async_trait]
impl QrRepository for PostgresQrRepository {
    async fn insert(&self, qr: &QrCode) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO qr_codes (
                 id, tenant_id, unit_id, issued_by, code, visitor_name, max_uses,
                 used_count, expires_at, is_active, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(qr.id.as_uuid())
        .bind(qr.tenant_id.as_uuid())
        .bind(qr.unit_id.as_uuid())
        .bind(qr.issued_by.as_uuid())
        .bind(&qr.code)
        .bind(&qr.visitor_name)
        .bind(qr.max_uses as i32)
        .bind(qr.used_count as i32)
        .bind(qr.expires_at.as_datetime())
        .bind(qr.is_active)
        .bind(qr.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to insert QR code: {e}")))?;
        Ok(())
    }

    async fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<QrCode>, DomainError> {
        let row: Option<QrRow> = sqlx::query_as(&format!(
            "SELECT {QR_COLUMNS} FROM qr_codes WHERE tenant_id = $1 AND code = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to load QR code: {e}")))?;

        Ok(row.map(QrCode::from))
    }

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: QrCodeId,
    ) -> Result<Option<QrCode>, DomainError> {
        let row: Option<QrRow> = sqlx::query_as(&format!(
            "SELECT {QR_COLUMNS} FROM qr_codes WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to load QR code: {e}")))?;

        Ok(row.map(QrCode::from))
    }

    async fn consume_use(
        &self,
        id: QrCodeId,
        now: Timestamp,
    ) -> Result<Option<QrCode>, DomainError> {
        // Guard and increment in one statement; concurrent redeemers of the
        // last use serialize on the row lock and the loser matches nothing.
        let row: Option<QrRow> = sqlx::query_as(&format!(
            "UPDATE qr_codes
             SET used_count = used_count + 1
             WHERE id = $1 AND is_active AND expires_at > $2 AND used_count < max_uses
             RETURNING {QR_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to consume QR use: {e}")))?;

        Ok(row.map(QrCode::from))
    }

    async fn deactivate(&self, id: QrCodeId) -> Result<QrCode, DomainError> {
        let row: Option<QrRow> = sqlx::query_as(&format!(
            "UPDATE qr_codes SET is_active = false WHERE id = $1 RETURNING {QR_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to deactivate QR code: {e}")))?;

        row.map(QrCode::from)
            .ok_or_else(|| DomainError::not_found("Código QR no encontrado"))
    }

    async fn delete_expired_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM qr_codes WHERE expires_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("failed to sweep QR codes: {e}")))?;
        Ok(result.rows_affected())
    }

    async fn list_by_issuer(
        &self,
        tenant_id: TenantId,
        issued_by: UserId,
        page: Page,
    ) -> Result<Paginated<QrCode>, DomainError> {
        let rows: Vec<QrRow> = sqlx::query_as(&format!(
            "SELECT {QR_COLUMNS} FROM qr_codes
             WHERE tenant_id = $1 AND issued_by = $2
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(tenant_id.as_uuid())
        .bind(issued_by.as_uuid())
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to list QR codes: {e}")))?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM qr_codes WHERE tenant_id = $1 AND issued_by = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(issued_by.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to count QR codes: {e}")))?;

        Ok(Paginated {
            items: rows.into_iter().map(QrCode::from).collect(),
            total: total as u64,
        })
    }
}

//! PostgreSQL implementation of NotificationStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, NotificationId, TenantId, Timestamp, UserId};
use crate::domain::notification::{NewNotification, Notification, NotificationKind};
use crate::ports::NotificationStore;

pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    body: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::parse(&row.kind).ok_or_else(|| {
            DomainError::database(format!("invalid notification kind: {}", row.kind))
        })?;

        Ok(Notification {
            id: NotificationId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            user_id: UserId::from_uuid(row.user_id),
            kind,
            title: row.title,
            body: row.body,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
            read_at: row.read_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn insert(&self, notification: NewNotification) -> Result<Notification, DomainError> {
        let row: NotificationRow = sqlx::query_as(
            "INSERT INTO notifications (id, tenant_id, user_id, kind, title, body, payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, now())
             RETURNING id, tenant_id, user_id, kind, title, body, payload, created_at, read_at",
        )
        .bind(NotificationId::new().as_uuid())
        .bind(notification.tenant_id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to insert notification: {e}")))?;

        row.try_into()
    }
}

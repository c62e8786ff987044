//! PostgreSQL implementation of TenantDirectory.
//!
//! Reads the membership tables owned by the administrative collaborators;
//! this adapter never writes them.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, TenantId, UnitId, UserId};
use crate::domain::tenancy::Role;
use crate::ports::TenantDirectory;

pub struct PostgresTenantDirectory {
    pool: PgPool,
}

impl PostgresTenantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for PostgresTenantDirectory {
    async fn unit_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<UnitId>, DomainError> {
        let unit: Option<Option<Uuid>> = sqlx::query_scalar(
            "SELECT unit_id FROM user_tenants
             WHERE tenant_id = $1 AND user_id = $2 AND is_active
             LIMIT 1",
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to load membership: {e}")))?;

        Ok(unit.flatten().map(UnitId::from_uuid))
    }

    async fn is_unit_delinquent(&self, unit_id: UnitId) -> Result<bool, DomainError> {
        let delinquent: Option<bool> =
            sqlx::query_scalar("SELECT is_delinquent FROM units WHERE id = $1")
                .bind(unit_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("failed to load unit: {e}")))?;

        Ok(delinquent.unwrap_or(false))
    }

    async fn unit_members(
        &self,
        tenant_id: TenantId,
        unit_id: UnitId,
    ) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM user_tenants
             WHERE tenant_id = $1 AND unit_id = $2 AND is_active",
        )
        .bind(tenant_id.as_uuid())
        .bind(unit_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to list unit members: {e}")))?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }

    async fn users_with_role(
        &self,
        tenant_id: TenantId,
        role: Role,
    ) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM user_tenants
             WHERE tenant_id = $1 AND role = $2 AND is_active",
        )
        .bind(tenant_id.as_uuid())
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to list users by role: {e}")))?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }

    async fn all_users(&self, tenant_id: TenantId) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM user_tenants WHERE tenant_id = $1 AND is_active",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("failed to list tenant users: {e}")))?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }

    async fn push_token(&self, user_id: UserId) -> Result<Option<String>, DomainError> {
        let token: Option<Option<String>> =
            sqlx::query_scalar("SELECT push_token FROM users WHERE id = $1")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("failed to load push token: {e}")))?;

        Ok(token.flatten())
    }
}

//! Tenant directory port - membership and delinquency lookups.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, UnitId, UserId};
use crate::domain::tenancy::Role;

/// Port over the tenant/unit/user data owned by the excluded CRUD modules.
///
/// The core consumes three things from them: which unit an actor belongs to,
/// whether a unit is delinquent (the boolean result of the excluded billing
/// logic), and recipient sets for notification fan-out.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Unit of the actor's active membership in the tenant, if any.
    async fn unit_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<UnitId>, DomainError>;

    /// Delinquency flag computed by the billing collaborators.
    async fn is_unit_delinquent(&self, unit_id: UnitId) -> Result<bool, DomainError>;

    /// Active members of a unit.
    async fn unit_members(
        &self,
        tenant_id: TenantId,
        unit_id: UnitId,
    ) -> Result<Vec<UserId>, DomainError>;

    /// Active users holding a role in the tenant.
    async fn users_with_role(
        &self,
        tenant_id: TenantId,
        role: Role,
    ) -> Result<Vec<UserId>, DomainError>;

    /// All active users of the tenant, deduplicated.
    async fn all_users(&self, tenant_id: TenantId) -> Result<Vec<UserId>, DomainError>;

    /// Push token registered for a user, if any.
    async fn push_token(&self, user_id: UserId) -> Result<Option<String>, DomainError>;
}

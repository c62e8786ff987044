//! In-memory tenant directory.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, TenantId, UnitId, UserId};
use crate::domain::tenancy::Role;
use crate::ports::TenantDirectory;

#[derive(Clone)]
struct Membership {
    tenant_id: TenantId,
    unit_id: Option<UnitId>,
    user_id: UserId,
    role: Role,
}

#[derive(Default)]
struct State {
    memberships: Vec<Membership>,
    delinquent_units: HashSet<UnitId>,
    push_tokens: HashMap<UserId, String>,
}

#[derive(Default)]
pub struct InMemoryTenantDirectory {
    state: RwLock<State>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_member(&self, tenant_id: TenantId, unit_id: UnitId, user_id: UserId, role: Role) {
        self.state.write().await.memberships.push(Membership {
            tenant_id,
            unit_id: Some(unit_id),
            user_id,
            role,
        });
    }

    /// A user attached to the tenant without a unit (admins, guards).
    pub async fn add_user_with_role(&self, tenant_id: TenantId, user_id: UserId, role: Role) {
        self.state.write().await.memberships.push(Membership {
            tenant_id,
            unit_id: None,
            user_id,
            role,
        });
    }

    pub async fn set_delinquent(&self, unit_id: UnitId, delinquent: bool) {
        let mut state = self.state.write().await;
        if delinquent {
            state.delinquent_units.insert(unit_id);
        } else {
            state.delinquent_units.remove(&unit_id);
        }
    }

    pub async fn set_push_token(&self, user_id: UserId, token: &str) {
        self.state.write().await.push_tokens.insert(user_id, token.to_string());
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn unit_for_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<UnitId>, DomainError> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .iter()
            .find(|m| m.tenant_id == tenant_id && m.user_id == user_id)
            .and_then(|m| m.unit_id))
    }

    async fn is_unit_delinquent(&self, unit_id: UnitId) -> Result<bool, DomainError> {
        Ok(self.state.read().await.delinquent_units.contains(&unit_id))
    }

    async fn unit_members(
        &self,
        tenant_id: TenantId,
        unit_id: UnitId,
    ) -> Result<Vec<UserId>, DomainError> {
        Ok(dedup(
            self.state
                .read()
                .await
                .memberships
                .iter()
                .filter(|m| m.tenant_id == tenant_id && m.unit_id == Some(unit_id))
                .map(|m| m.user_id),
        ))
    }

    async fn users_with_role(
        &self,
        tenant_id: TenantId,
        role: Role,
    ) -> Result<Vec<UserId>, DomainError> {
        Ok(dedup(
            self.state
                .read()
                .await
                .memberships
                .iter()
                .filter(|m| m.tenant_id == tenant_id && m.role == role)
                .map(|m| m.user_id),
        ))
    }

    async fn all_users(&self, tenant_id: TenantId) -> Result<Vec<UserId>, DomainError> {
        Ok(dedup(
            self.state
                .read()
                .await
                .memberships
                .iter()
                .filter(|m| m.tenant_id == tenant_id)
                .map(|m| m.user_id),
        ))
    }

    async fn push_token(&self, user_id: UserId) -> Result<Option<String>, DomainError> {
        Ok(self.state.read().await.push_tokens.get(&user_id).cloned())
    }
}

fn dedup(ids: impl Iterator<Item = UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unit_for_user_is_tenant_scoped() {
        let directory = InMemoryTenantDirectory::new();
        let (tenant, unit, user) = (TenantId::new(), UnitId::new(), UserId::new());
        directory.add_member(tenant, unit, user, Role::Resident).await;

        assert_eq!(directory.unit_for_user(tenant, user).await.unwrap(), Some(unit));
        assert_eq!(directory.unit_for_user(TenantId::new(), user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn all_users_deduplicates_multi_unit_members() {
        let directory = InMemoryTenantDirectory::new();
        let tenant = TenantId::new();
        let user = UserId::new();
        directory.add_member(tenant, UnitId::new(), user, Role::Resident).await;
        directory.add_member(tenant, UnitId::new(), user, Role::Resident).await;

        assert_eq!(directory.all_users(tenant).await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn delinquency_is_a_togglable_flag() {
        let directory = InMemoryTenantDirectory::new();
        let unit = UnitId::new();
        assert!(!directory.is_unit_delinquent(unit).await.unwrap());

        directory.set_delinquent(unit, true).await;
        assert!(directory.is_unit_delinquent(unit).await.unwrap());

        directory.set_delinquent(unit, false).await;
        assert!(!directory.is_unit_delinquent(unit).await.unwrap());
    }
}

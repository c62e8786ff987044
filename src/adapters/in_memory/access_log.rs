//! In-memory access attempt log.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::access::{AccessAttempt, NewAccessAttempt};
use crate::domain::foundation::{AccessAttemptId, DomainError, TenantId, Timestamp};
use crate::ports::{AccessLogFilter, AccessLogStore, Page, Paginated};

#[derive(Default)]
pub struct InMemoryAccessLogStore {
    rows: RwLock<Vec<AccessAttempt>>,
}

impl InMemoryAccessLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn all(&self) -> Vec<AccessAttempt> {
        self.rows.read().await.clone()
    }
}

fn matches(row: &AccessAttempt, tenant_id: TenantId, filter: &AccessLogFilter) -> bool {
    row.tenant_id == tenant_id
        && filter.unit_id.map_or(true, |u| row.unit_id == Some(u))
        && filter.method.map_or(true, |m| row.method == m)
        && filter.from.map_or(true, |f| !row.created_at.is_before(&f))
        && filter.to.map_or(true, |t| row.created_at.is_before(&t))
}

#[async_trait]
impl AccessLogStore for InMemoryAccessLogStore {
    async fn append(&self, attempt: NewAccessAttempt) -> Result<AccessAttempt, DomainError> {
        let row = AccessAttempt {
            id: AccessAttemptId::new(),
            tenant_id: attempt.tenant_id,
            unit_id: attempt.unit_id,
            actor_id: attempt.actor_id,
            device_id: attempt.device_id,
            method: attempt.method,
            direction: attempt.direction,
            granted: attempt.granted,
            reason: attempt.reason,
            visitor: attempt.visitor,
            created_at: Timestamp::now(),
        };
        self.rows.write().await.push(row.clone());
        Ok(row)
    }

    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &AccessLogFilter,
        page: Page,
    ) -> Result<Paginated<AccessAttempt>, DomainError> {
        let rows = self.rows.read().await;
        // Insertion order stands in for created_at; newest first.
        let filtered: Vec<AccessAttempt> = rows
            .iter()
            .rev()
            .filter(|row| matches(row, tenant_id, filter))
            .cloned()
            .collect();
        let total = filtered.len() as u64;
        let items = filtered
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Paginated { items, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::{AccessMethod, Direction, VisitorInfo};
    use crate::domain::foundation::{DeviceId, UnitId};

    fn attempt(tenant: TenantId, unit: Option<UnitId>, method: AccessMethod) -> NewAccessAttempt {
        NewAccessAttempt {
            tenant_id: tenant,
            unit_id: unit,
            actor_id: None,
            device_id: DeviceId::new(),
            method,
            direction: Direction::Entry,
            granted: true,
            reason: "Acceso concedido".to_string(),
            visitor: VisitorInfo::default(),
        }
    }

    #[tokio::test]
    async fn list_is_newest_first_with_totals() {
        let store = InMemoryAccessLogStore::new();
        let tenant = TenantId::new();
        let first = store.append(attempt(tenant, None, AccessMethod::App)).await.unwrap();
        let second = store
            .append(attempt(tenant, None, AccessMethod::Qr))
            .await
            .unwrap();

        let page = store
            .list(tenant, &AccessLogFilter::default(), Page { offset: 0, limit: 1 })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, second.id);

        let next = store
            .list(tenant, &AccessLogFilter::default(), Page { offset: 1, limit: 1 })
            .await
            .unwrap();
        assert_eq!(next.items[0].id, first.id);
    }

    #[tokio::test]
    async fn filters_compose() {
        let store = InMemoryAccessLogStore::new();
        let tenant = TenantId::new();
        let unit = UnitId::new();
        store.append(attempt(tenant, Some(unit), AccessMethod::App)).await.unwrap();
        store.append(attempt(tenant, None, AccessMethod::App)).await.unwrap();
        store.append(attempt(TenantId::new(), Some(unit), AccessMethod::App)).await.unwrap();

        let filter = AccessLogFilter {
            unit_id: Some(unit),
            method: Some(AccessMethod::App),
            ..Default::default()
        };
        let page = store.list(tenant, &filter, Page::default()).await.unwrap();
        assert_eq!(page.total, 1);
    }
}

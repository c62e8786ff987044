//! Access attempt audit log port.

use async_trait::async_trait;

use crate::domain::access::{AccessAttempt, AccessMethod, NewAccessAttempt};
use crate::domain::foundation::{DomainError, TenantId, Timestamp, UnitId};

use super::{Page, Paginated};

/// Filters for the log listing consumed by the excluded HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct AccessLogFilter {
    pub unit_id: Option<UnitId>,
    pub method: Option<AccessMethod>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

/// Port for the append-only access attempt log.
#[async_trait]
pub trait AccessLogStore: Send + Sync {
    /// Appends one attempt row, returning it with id and timestamp assigned.
    async fn append(&self, attempt: NewAccessAttempt) -> Result<AccessAttempt, DomainError>;

    /// Lists attempts for a tenant, newest first.
    async fn list(
        &self,
        tenant_id: TenantId,
        filter: &AccessLogFilter,
        page: Page,
    ) -> Result<Paginated<AccessAttempt>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn AccessLogStore) {}

    #[test]
    fn default_filter_is_unconstrained() {
        let filter = AccessLogFilter::default();
        assert!(filter.unit_id.is_none());
        assert!(filter.method.is_none());
        assert!(filter.from.is_none() && filter.to.is_none());
    }
}

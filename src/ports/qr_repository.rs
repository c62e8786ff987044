//! QR code storage port.

use async_trait::async_trait;

use crate::domain::access::QrCode;
use crate::domain::foundation::{DomainError, QrCodeId, TenantId, Timestamp, UserId};

use super::{Page, Paginated};

/// Port for visitor QR code persistence.
///
/// `consume_use` is the one operation with real race sensitivity: multiple
/// process instances may share the backing store, so the eligibility check and
/// the `used_count` increment must be a single conditional update there, not an
/// in-process lock.
#[async_trait]
pub trait QrRepository: Send + Sync {
    /// Persists a freshly issued code.
    async fn insert(&self, qr: &QrCode) -> Result<(), DomainError>;

    /// Looks up a code string within a tenant.
    async fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<QrCode>, DomainError>;

    /// Looks up a code by id within a tenant.
    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: QrCodeId,
    ) -> Result<Option<QrCode>, DomainError>;

    /// Atomically consumes one use if the code is still redeemable at `now`.
    ///
    /// Returns the updated row, or `None` when the guard failed (inactive,
    /// expired, or no uses left) - including when a concurrent redemption won
    /// the last use between the caller's read and this write.
    async fn consume_use(&self, id: QrCodeId, now: Timestamp)
        -> Result<Option<QrCode>, DomainError>;

    /// Flips `is_active` to false, returning the updated row.
    async fn deactivate(&self, id: QrCodeId) -> Result<QrCode, DomainError>;

    /// Deletes codes whose expiry is before `cutoff`. Returns the row count.
    async fn delete_expired_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;

    /// Lists a user's issued codes within a tenant, newest first.
    async fn list_by_issuer(
        &self,
        tenant_id: TenantId,
        issued_by: UserId,
        page: Page,
    ) -> Result<Paginated<QrCode>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn QrRepository) {}
}

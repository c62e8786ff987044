//! In-memory QR code store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::access::QrCode;
use crate::domain::foundation::{DomainError, QrCodeId, TenantId, Timestamp, UserId};
use crate::ports::{Page, Paginated, QrRepository};

#[derive(Default)]
pub struct InMemoryQrRepository {
    codes: Mutex<HashMap<QrCodeId, QrCode>>,
}

impl InMemoryQrRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QrRepository for InMemoryQrRepository {
    async fn insert(&self, qr: &QrCode) -> Result<(), DomainError> {
        self.codes.lock().await.insert(qr.id, qr.clone());
        Ok(())
    }

    async fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<QrCode>, DomainError> {
        Ok(self
            .codes
            .lock()
            .await
            .values()
            .find(|qr| qr.tenant_id == tenant_id && qr.code == code)
            .cloned())
    }

    async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: QrCodeId,
    ) -> Result<Option<QrCode>, DomainError> {
        Ok(self
            .codes
            .lock()
            .await
            .get(&id)
            .filter(|qr| qr.tenant_id == tenant_id)
            .cloned())
    }

    async fn consume_use(
        &self,
        id: QrCodeId,
        now: Timestamp,
    ) -> Result<Option<QrCode>, DomainError> {
        // Guard and increment under one lock, matching the Postgres adapter's
        // conditional UPDATE.
        let mut codes = self.codes.lock().await;
        match codes.get_mut(&id) {
            Some(qr) if qr.is_redeemable(now) => {
                qr.used_count += 1;
                Ok(Some(qr.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn deactivate(&self, id: QrCodeId) -> Result<QrCode, DomainError> {
        let mut codes = self.codes.lock().await;
        let qr = codes
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Código QR no encontrado"))?;
        qr.is_active = false;
        Ok(qr.clone())
    }

    async fn delete_expired_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut codes = self.codes.lock().await;
        let before = codes.len();
        codes.retain(|_, qr| !qr.expires_at.is_before(&cutoff));
        Ok((before - codes.len()) as u64)
    }

    async fn list_by_issuer(
        &self,
        tenant_id: TenantId,
        issued_by: UserId,
        page: Page,
    ) -> Result<Paginated<QrCode>, DomainError> {
        let codes = self.codes.lock().await;
        let mut matching: Vec<QrCode> = codes
            .values()
            .filter(|qr| qr.tenant_id == tenant_id && qr.issued_by == issued_by)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Paginated { items, total })
    }
}

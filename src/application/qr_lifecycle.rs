//! Visitor QR code lifecycle: issue, redeem, revoke, sweep.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::access::QrCode;
use crate::domain::foundation::{DomainError, QrCodeId, TenantId, Timestamp, UnitId, UserId};
use crate::domain::tenancy::Role;
use crate::ports::{Page, Paginated, QrRepository, TenantDirectory};

/// Outcome of a redemption attempt.
///
/// Denials carry both the user-facing error and the reason string for the
/// access log, so the caller can record the attempt before surfacing the
/// error. Storage failures remain plain `Err`.
#[derive(Debug)]
pub enum RedeemOutcome {
    /// The use was consumed; the returned row reflects the new count.
    Redeemed(QrCode),
    /// The code was found wanting. `unit_id` is present when the code itself
    /// resolved and only its state (or the unit's delinquency) blocked it.
    Denied {
        unit_id: Option<UnitId>,
        log_reason: String,
        error: DomainError,
    },
}

/// Issue/redeem/revoke operations over visitor QR codes.
pub struct QrLifecycle {
    qr_repo: Arc<dyn QrRepository>,
    directory: Arc<dyn TenantDirectory>,
}

impl QrLifecycle {
    pub fn new(qr_repo: Arc<dyn QrRepository>, directory: Arc<dyn TenantDirectory>) -> Self {
        Self { qr_repo, directory }
    }

    /// Issues a code for a unit. An explicit `unit_id` wins (an admin issuing
    /// on a unit's behalf has no membership of their own); otherwise the
    /// issuer's own membership is used.
    pub async fn generate(
        &self,
        tenant_id: TenantId,
        issued_by: UserId,
        unit_id: Option<UnitId>,
        visitor_name: &str,
        max_uses: u32,
        expires_in_hours: u32,
    ) -> Result<QrCode, DomainError> {
        let unit_id = match unit_id {
            Some(unit) => unit,
            None => self
                .directory
                .unit_for_user(tenant_id, issued_by)
                .await?
                .ok_or_else(|| {
                    DomainError::forbidden("Usuario sin unidad asignada en este condominio")
                })?,
        };

        let qr = QrCode::issue(
            tenant_id,
            unit_id,
            issued_by,
            visitor_name,
            max_uses,
            expires_in_hours,
            Timestamp::now(),
        )?;
        self.qr_repo.insert(&qr).await?;
        info!(tenant = %tenant_id, unit = %unit_id, code = %qr.code, "QR code issued");
        Ok(qr)
    }

    /// Classifies and, when eligible, consumes one use of a code.
    ///
    /// The eligibility read and the `used_count` increment are separate
    /// round-trips; the increment is conditional at the store, so a
    /// concurrent redemption that takes the last use in between turns into
    /// the exhausted denial here rather than an over-count.
    pub async fn redeem(
        &self,
        tenant_id: TenantId,
        code: Option<&str>,
        now: Timestamp,
    ) -> Result<RedeemOutcome, DomainError> {
        let code = match code.map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => return Err(DomainError::invalid_input("Código QR requerido")),
        };

        let qr = match self.qr_repo.find_by_code(tenant_id, code).await? {
            Some(qr) => qr,
            None => {
                return Ok(RedeemOutcome::Denied {
                    unit_id: None,
                    log_reason: "QR inválido".to_string(),
                    error: DomainError::invalid_input("Código QR inválido"),
                });
            }
        };

        if !qr.is_redeemable(now) {
            return Ok(RedeemOutcome::Denied {
                unit_id: Some(qr.unit_id),
                log_reason: "QR expirado o agotado".to_string(),
                error: DomainError::invalid_input("Código QR expirado o usos agotados"),
            });
        }

        if self.directory.is_unit_delinquent(qr.unit_id).await? {
            return Ok(RedeemOutcome::Denied {
                unit_id: Some(qr.unit_id),
                log_reason: "Acceso denegado por morosidad".to_string(),
                error: DomainError::forbidden("Acceso denegado: unidad con adeudo pendiente"),
            });
        }

        match self.qr_repo.consume_use(qr.id, now).await? {
            Some(updated) => {
                debug!(
                    code = %updated.code,
                    used = updated.used_count,
                    max = updated.max_uses,
                    "QR use consumed"
                );
                Ok(RedeemOutcome::Redeemed(updated))
            }
            // A concurrent redemption won the last use between the read and
            // the conditional update.
            None => Ok(RedeemOutcome::Denied {
                unit_id: Some(qr.unit_id),
                log_reason: "QR expirado o agotado".to_string(),
                error: DomainError::invalid_input("Código QR expirado o usos agotados")
                    .with_detail("conflict", "true"),
            }),
        }
    }

    /// Deactivates a code. Admins may revoke any code in the tenant;
    /// residents only their own.
    pub async fn revoke(
        &self,
        tenant_id: TenantId,
        actor_id: UserId,
        role: Role,
        qr_id: QrCodeId,
    ) -> Result<QrCode, DomainError> {
        let qr = self
            .qr_repo
            .find_by_id(tenant_id, qr_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Código QR no encontrado"))?;

        if role != Role::Admin && qr.issued_by != actor_id {
            return Err(DomainError::forbidden("Sin permiso para revocar este QR"));
        }

        let revoked = self.qr_repo.deactivate(qr.id).await?;
        info!(tenant = %tenant_id, code = %revoked.code, "QR code revoked");
        Ok(revoked)
    }

    /// Codes issued by a user, newest first.
    pub async fn list_for_issuer(
        &self,
        tenant_id: TenantId,
        issued_by: UserId,
        page: Page,
    ) -> Result<Paginated<QrCode>, DomainError> {
        self.qr_repo.list_by_issuer(tenant_id, issued_by, page).await
    }

    /// Deletes codes expired more than thirty days before `now`.
    pub async fn sweep(&self, now: Timestamp) -> Result<u64, DomainError> {
        let cutoff = now.minus_days(30);
        let deleted = self.qr_repo.delete_expired_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, "swept expired QR codes");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{InMemoryQrRepository, InMemoryTenantDirectory};
    use crate::domain::foundation::ErrorCode;

    fn at(secs: u64) -> Timestamp {
        Timestamp::from_unix_secs(secs)
    }

    fn lifecycle() -> (QrLifecycle, Arc<InMemoryQrRepository>, Arc<InMemoryTenantDirectory>) {
        let repo = Arc::new(InMemoryQrRepository::new());
        let directory = Arc::new(InMemoryTenantDirectory::new());
        (
            QrLifecycle::new(repo.clone(), directory.clone()),
            repo,
            directory,
        )
    }

    async fn seeded_code(
        repo: &InMemoryQrRepository,
        tenant: TenantId,
        unit: UnitId,
        issuer: UserId,
        max_uses: u32,
    ) -> QrCode {
        let qr = QrCode::issue(tenant, unit, issuer, "Ana Torres", max_uses, 24, at(1_000)).unwrap();
        repo.insert(&qr).await.unwrap();
        qr
    }

    #[tokio::test]
    async fn generate_requires_a_unit_membership_when_no_unit_is_given() {
        let (lifecycle, _repo, _directory) = lifecycle();
        let err = lifecycle
            .generate(TenantId::new(), UserId::new(), None, "Ana", 3, 24)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn generate_persists_a_code_for_the_issuers_unit() {
        let (lifecycle, repo, directory) = lifecycle();
        let (tenant, unit, issuer) = (TenantId::new(), UnitId::new(), UserId::new());
        directory.add_member(tenant, unit, issuer, Role::Resident).await;

        let qr = lifecycle.generate(tenant, issuer, None, "Ana", 3, 24).await.unwrap();

        assert_eq!(qr.unit_id, unit);
        assert!(repo.find_by_code(tenant, &qr.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn generate_accepts_an_explicit_unit_without_a_membership() {
        let (lifecycle, repo, _directory) = lifecycle();
        let (tenant, unit, admin) = (TenantId::new(), UnitId::new(), UserId::new());

        let qr = lifecycle
            .generate(tenant, admin, Some(unit), "Ana", 3, 24)
            .await
            .unwrap();

        assert_eq!(qr.unit_id, unit);
        assert_eq!(qr.issued_by, admin);
        assert!(repo.find_by_code(tenant, &qr.code).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn redeem_missing_code_is_a_plain_error() {
        let (lifecycle, _repo, _directory) = lifecycle();
        let err = lifecycle
            .redeem(TenantId::new(), None, at(2_000))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Código QR requerido");
    }

    #[tokio::test]
    async fn redeem_unknown_code_denies_without_a_unit() {
        let (lifecycle, _repo, _directory) = lifecycle();
        match lifecycle
            .redeem(TenantId::new(), Some("IAD-DEADBEEF"), at(2_000))
            .await
            .unwrap()
        {
            RedeemOutcome::Denied {
                unit_id,
                log_reason,
                error,
            } => {
                assert!(unit_id.is_none());
                assert_eq!(log_reason, "QR inválido");
                assert_eq!(error.message, "Código QR inválido");
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn redeem_in_another_tenant_looks_like_an_unknown_code() {
        let (lifecycle, repo, _directory) = lifecycle();
        let qr = seeded_code(&repo, TenantId::new(), UnitId::new(), UserId::new(), 3).await;

        match lifecycle
            .redeem(TenantId::new(), Some(&qr.code), at(2_000))
            .await
            .unwrap()
        {
            RedeemOutcome::Denied { error, .. } => {
                assert_eq!(error.message, "Código QR inválido")
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn redeem_consumes_a_use() {
        let (lifecycle, repo, _directory) = lifecycle();
        let tenant = TenantId::new();
        let qr = seeded_code(&repo, tenant, UnitId::new(), UserId::new(), 3).await;

        match lifecycle.redeem(tenant, Some(&qr.code), at(2_000)).await.unwrap() {
            RedeemOutcome::Redeemed(updated) => assert_eq!(updated.used_count, 1),
            other => panic!("expected redemption, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn redeem_expired_code_reports_the_exhausted_denial() {
        let (lifecycle, repo, _directory) = lifecycle();
        let tenant = TenantId::new();
        let qr = seeded_code(&repo, tenant, UnitId::new(), UserId::new(), 3).await;

        let after_expiry = qr.expires_at.plus_secs(1);
        match lifecycle
            .redeem(tenant, Some(&qr.code), after_expiry)
            .await
            .unwrap()
        {
            RedeemOutcome::Denied {
                unit_id, error, ..
            } => {
                assert_eq!(unit_id, Some(qr.unit_id));
                assert_eq!(error.message, "Código QR expirado o usos agotados");
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn second_redemption_of_a_single_use_code_is_denied() {
        let (lifecycle, repo, _directory) = lifecycle();
        let tenant = TenantId::new();
        let qr = seeded_code(&repo, tenant, UnitId::new(), UserId::new(), 1).await;

        assert!(matches!(
            lifecycle.redeem(tenant, Some(&qr.code), at(2_000)).await.unwrap(),
            RedeemOutcome::Redeemed(_)
        ));
        assert!(matches!(
            lifecycle.redeem(tenant, Some(&qr.code), at(2_001)).await.unwrap(),
            RedeemOutcome::Denied { .. }
        ));
    }

    #[tokio::test]
    async fn redeem_blocks_delinquent_units() {
        let (lifecycle, repo, directory) = lifecycle();
        let (tenant, unit) = (TenantId::new(), UnitId::new());
        let qr = seeded_code(&repo, tenant, unit, UserId::new(), 3).await;
        directory.set_delinquent(unit, true).await;

        match lifecycle.redeem(tenant, Some(&qr.code), at(2_000)).await.unwrap() {
            RedeemOutcome::Denied {
                log_reason, error, ..
            } => {
                assert_eq!(log_reason, "Acceso denegado por morosidad");
                assert_eq!(error.code, ErrorCode::Forbidden);
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn concurrent_redemptions_of_the_last_use_admit_exactly_one() {
        let (lifecycle, repo, _directory) = lifecycle();
        let tenant = TenantId::new();
        let qr = seeded_code(&repo, tenant, UnitId::new(), UserId::new(), 1).await;
        let lifecycle = Arc::new(lifecycle);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lifecycle = Arc::clone(&lifecycle);
            let code = qr.code.clone();
            handles.push(tokio::spawn(async move {
                lifecycle.redeem(tenant, Some(&code), at(2_000)).await.unwrap()
            }));
        }

        let mut redeemed = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), RedeemOutcome::Redeemed(_)) {
                redeemed += 1;
            }
        }
        assert_eq!(redeemed, 1);
    }

    #[tokio::test]
    async fn resident_cannot_revoke_someone_elses_code() {
        let (lifecycle, repo, _directory) = lifecycle();
        let tenant = TenantId::new();
        let qr = seeded_code(&repo, tenant, UnitId::new(), UserId::new(), 3).await;

        let err = lifecycle
            .revoke(tenant, UserId::new(), Role::Resident, qr.id)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Sin permiso para revocar este QR");
    }

    #[tokio::test]
    async fn admin_revokes_any_code_in_the_tenant() {
        let (lifecycle, repo, _directory) = lifecycle();
        let tenant = TenantId::new();
        let qr = seeded_code(&repo, tenant, UnitId::new(), UserId::new(), 3).await;

        let revoked = lifecycle
            .revoke(tenant, UserId::new(), Role::Admin, qr.id)
            .await
            .unwrap();
        assert!(!revoked.is_active);
    }

    #[tokio::test]
    async fn sweep_deletes_only_long_expired_codes() {
        let (lifecycle, repo, _directory) = lifecycle();
        let tenant = TenantId::new();
        let now = at(40 * 86_400);

        // Expired 31 days ago.
        let mut old = QrCode::issue(tenant, UnitId::new(), UserId::new(), "Ana", 1, 1, at(0)).unwrap();
        old.expires_at = now.minus_days(31);
        repo.insert(&old).await.unwrap();
        // Expired yesterday.
        let mut recent =
            QrCode::issue(tenant, UnitId::new(), UserId::new(), "Luis", 1, 1, at(0)).unwrap();
        recent.expires_at = now.minus_days(1);
        repo.insert(&recent).await.unwrap();

        assert_eq!(lifecycle.sweep(now).await.unwrap(), 1);
        assert!(repo.find_by_id(tenant, old.id).await.unwrap().is_none());
        assert!(repo.find_by_id(tenant, recent.id).await.unwrap().is_some());
    }
}

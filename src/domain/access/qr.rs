//! Visitor QR codes: short-lived, limited-use entry credentials.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, QrCodeId, TenantId, Timestamp, UnitId, UserId};

/// Allowed number of uses per code.
pub const MAX_USES_RANGE: RangeInclusive<u32> = 1..=10;

/// Allowed validity window in hours.
pub const EXPIRES_HOURS_RANGE: RangeInclusive<u32> = 1..=72;

/// A visitor access code issued by a resident or administrator.
///
/// Invariant: `0 <= used_count <= max_uses`. A code is redeemable iff it is
/// active, unexpired, has uses left, and its unit is not delinquent (the last
/// condition is checked by the caller against the tenant directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCode {
    pub id: QrCodeId,
    pub tenant_id: TenantId,
    pub unit_id: UnitId,
    pub issued_by: UserId,
    pub code: String,
    pub visitor_name: String,
    pub max_uses: u32,
    pub used_count: u32,
    pub expires_at: Timestamp,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl QrCode {
    /// Issues a new code, validating `max_uses` and `expires_in_hours` ranges.
    pub fn issue(
        tenant_id: TenantId,
        unit_id: UnitId,
        issued_by: UserId,
        visitor_name: impl Into<String>,
        max_uses: u32,
        expires_in_hours: u32,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let visitor_name = visitor_name.into();
        if visitor_name.trim().is_empty() {
            return Err(DomainError::invalid_input("Nombre del visitante requerido"));
        }
        if !MAX_USES_RANGE.contains(&max_uses) {
            return Err(DomainError::invalid_input(format!(
                "maxUses fuera de rango [{}, {}]: {}",
                MAX_USES_RANGE.start(),
                MAX_USES_RANGE.end(),
                max_uses
            )));
        }
        if !EXPIRES_HOURS_RANGE.contains(&expires_in_hours) {
            return Err(DomainError::invalid_input(format!(
                "expiresInHours fuera de rango [{}, {}]: {}",
                EXPIRES_HOURS_RANGE.start(),
                EXPIRES_HOURS_RANGE.end(),
                expires_in_hours
            )));
        }

        Ok(Self {
            id: QrCodeId::new(),
            tenant_id,
            unit_id,
            issued_by,
            code: generate_code(),
            visitor_name,
            max_uses,
            used_count: 0,
            expires_at: now.plus_hours(expires_in_hours),
            is_active: true,
            created_at: now,
        })
    }

    /// Whether the validity window has passed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        !now.is_before(&self.expires_at)
    }

    /// Whether all uses have been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }

    /// Redeemability check, excluding the delinquency condition.
    pub fn is_redeemable(&self, now: Timestamp) -> bool {
        self.is_active && !self.is_expired(now) && !self.is_exhausted()
    }
}

/// Short unguessable code: "IAD-" plus the first 8 hex digits of a v4 UUID.
fn generate_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("IAD-{}", hex[..8].to_uppercase())
}

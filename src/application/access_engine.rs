//! Access decision engine: policy evaluation, device command, audit log.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::application::notification_fanout::NotificationFanout;
use crate::application::qr_lifecycle::{QrLifecycle, RedeemOutcome};
use crate::application::throttle::{CooldownThrottle, ThrottleDecision};
use crate::domain::access::{
    AccessAttempt, AccessMethod, Direction, NewAccessAttempt, VisitorInfo,
};
use crate::domain::device::Device;
use crate::domain::foundation::{DeviceId, DomainError, TenantId, Timestamp, UnitId, UserId};
use crate::domain::notification::NotificationKind;
use crate::ports::{
    AccessLogFilter, AccessLogStore, CommandBus, DeviceRepository, Page, Paginated,
    TenantDirectory,
};

/// One open request as received from the excluded HTTP layer.
///
/// `unit_id` attributes the attempt to an explicit unit (a guard opening on a
/// resident's behalf has no membership of their own); when absent the actor's
/// own membership is used.
#[derive(Debug, Clone)]
pub struct OpenGateRequest {
    pub device_id: DeviceId,
    pub unit_id: Option<UnitId>,
    pub method: AccessMethod,
    pub direction: Direction,
    pub qr_code: Option<String>,
    pub visitor: VisitorInfo,
}

/// A granted decision. Denials surface as `DomainError`.
#[derive(Debug, Clone)]
pub struct OpenGateResult {
    pub granted: bool,
    pub reason: String,
    pub log: AccessAttempt,
}

/// Evaluates open requests against tenant policy, commands the device, and
/// records the attempt.
///
/// Policy precedence: device existence, then EXIT, then GUARD_OVERRIDE, then
/// QR classification, then delinquency before cooldown for app entries.
/// Every terminal policy branch writes exactly one log row, with two
/// exceptions: an unknown device (nothing to attribute the row to) and a
/// cooldown rejection (spam does not inflate the audit trail).
pub struct AccessDecisionEngine {
    devices: Arc<dyn DeviceRepository>,
    log: Arc<dyn AccessLogStore>,
    directory: Arc<dyn TenantDirectory>,
    qr: Arc<QrLifecycle>,
    throttle: Arc<CooldownThrottle>,
    bus: Arc<dyn CommandBus>,
    fanout: NotificationFanout,
}

impl AccessDecisionEngine {
    pub fn new(
        devices: Arc<dyn DeviceRepository>,
        log: Arc<dyn AccessLogStore>,
        directory: Arc<dyn TenantDirectory>,
        qr: Arc<QrLifecycle>,
        throttle: Arc<CooldownThrottle>,
        bus: Arc<dyn CommandBus>,
        fanout: NotificationFanout,
    ) -> Self {
        Self {
            devices,
            log,
            directory,
            qr,
            throttle,
            bus,
            fanout,
        }
    }

    /// Decides one open request.
    pub async fn open_gate(
        &self,
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        request: OpenGateRequest,
    ) -> Result<OpenGateResult, DomainError> {
        self.open_gate_at(tenant_id, actor_id, request, Timestamp::now())
            .await
    }

    /// `open_gate` against an explicit clock.
    pub async fn open_gate_at(
        &self,
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        request: OpenGateRequest,
        now: Timestamp,
    ) -> Result<OpenGateResult, DomainError> {
        let device = self
            .devices
            .find_active(tenant_id, request.device_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Dispositivo no encontrado"))?;

        // Explicit unit wins; the actor's own membership is the fallback.
        let unit_id = match request.unit_id {
            Some(unit) => Some(unit),
            None => match actor_id {
                Some(actor) => self.directory.unit_for_user(tenant_id, actor).await?,
                None => None,
            },
        };

        if request.direction == Direction::Exit {
            return self
                .grant(tenant_id, actor_id, unit_id, &device, &request, now, "Salida permitida")
                .await;
        }

        match request.method {
            AccessMethod::GuardOverride => {
                self.grant(
                    tenant_id,
                    actor_id,
                    unit_id,
                    &device,
                    &request,
                    now,
                    "Apertura manual por guardia",
                )
                .await
            }
            AccessMethod::Qr => {
                self.redeem_and_grant(tenant_id, actor_id, &device, &request, now)
                    .await
            }
            AccessMethod::App => {
                let actor = actor_id
                    .ok_or_else(|| DomainError::invalid_input("Usuario requerido"))?;

                if let Some(unit) = unit_id {
                    if self.directory.is_unit_delinquent(unit).await? {
                        self.deny(
                            tenant_id,
                            actor_id,
                            Some(unit),
                            &device,
                            &request,
                            "Acceso denegado por morosidad",
                        )
                        .await?;
                        return Err(DomainError::forbidden(
                            "Acceso denegado: unidad con adeudo pendiente",
                        ));
                    }
                }

                // No log row on a cooldown rejection.
                if let ThrottleDecision::Throttled { remaining_secs } =
                    self.throttle.try_consume_at(actor, device.id, now)
                {
                    return Err(DomainError::rate_limited(remaining_secs));
                }

                self.grant(
                    tenant_id,
                    actor_id,
                    unit_id,
                    &device,
                    &request,
                    now,
                    "Acceso concedido",
                )
                .await
            }
            AccessMethod::Remote => {
                self.deny(
                    tenant_id,
                    actor_id,
                    unit_id,
                    &device,
                    &request,
                    "Método de acceso no soportado",
                )
                .await?;
                Err(DomainError::invalid_input("Método de acceso no soportado"))
            }
        }
    }

    /// Access log listing for the excluded HTTP layer.
    pub async fn list_logs(
        &self,
        tenant_id: TenantId,
        filter: &AccessLogFilter,
        page: Page,
    ) -> Result<Paginated<AccessAttempt>, DomainError> {
        self.log.list(tenant_id, filter, page).await
    }

    async fn redeem_and_grant(
        &self,
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        device: &Device,
        request: &OpenGateRequest,
        now: Timestamp,
    ) -> Result<OpenGateResult, DomainError> {
        match self
            .qr
            .redeem(tenant_id, request.qr_code.as_deref(), now)
            .await?
        {
            RedeemOutcome::Redeemed(qr) => {
                let mut request = request.clone();
                if request.visitor.name.is_none() {
                    request.visitor.name = Some(qr.visitor_name.clone());
                }
                let result = self
                    .grant(
                        tenant_id,
                        actor_id,
                        Some(qr.unit_id),
                        device,
                        &request,
                        now,
                        &format!("Acceso QR: {}", qr.visitor_name),
                    )
                    .await?;

                self.fanout.send_to_unit(
                    tenant_id,
                    qr.unit_id,
                    NotificationKind::QrUsed,
                    "Acceso de visitante",
                    format!("{} ingresó con código QR", qr.visitor_name),
                    json!({
                        "qr_code_id": qr.id,
                        "device_id": device.id,
                        "used_count": qr.used_count,
                        "max_uses": qr.max_uses,
                    }),
                );
                Ok(result)
            }
            RedeemOutcome::Denied {
                unit_id,
                log_reason,
                error,
            } => {
                self.deny(tenant_id, actor_id, unit_id, device, request, &log_reason)
                    .await?;
                Err(error)
            }
        }
    }

    async fn grant(
        &self,
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        unit_id: Option<UnitId>,
        device: &Device,
        request: &OpenGateRequest,
        now: Timestamp,
        reason: &str,
    ) -> Result<OpenGateResult, DomainError> {
        self.dispatch_open(device, request.direction, now).await;

        if let Some(actor) = actor_id {
            self.throttle.record_at(actor, device.id, now);
        }

        let log = self
            .log
            .append(NewAccessAttempt {
                tenant_id,
                unit_id,
                actor_id,
                device_id: device.id,
                method: request.method,
                direction: request.direction,
                granted: true,
                reason: reason.to_string(),
                visitor: request.visitor.clone(),
            })
            .await?;

        info!(
            tenant = %tenant_id,
            device = %device.id,
            method = %request.method,
            reason,
            "access granted"
        );
        Ok(OpenGateResult {
            granted: true,
            reason: reason.to_string(),
            log,
        })
    }

    async fn deny(
        &self,
        tenant_id: TenantId,
        actor_id: Option<UserId>,
        unit_id: Option<UnitId>,
        device: &Device,
        request: &OpenGateRequest,
        reason: &str,
    ) -> Result<AccessAttempt, DomainError> {
        let log = self
            .log
            .append(NewAccessAttempt {
                tenant_id,
                unit_id,
                actor_id,
                device_id: device.id,
                method: request.method,
                direction: request.direction,
                granted: false,
                reason: reason.to_string(),
                visitor: request.visitor.clone(),
            })
            .await?;
        info!(
            tenant = %tenant_id,
            device = %device.id,
            method = %request.method,
            reason,
            "access denied"
        );
        Ok(log)
    }

    /// Publishes the OPEN command. Grant first, delivery second: a device
    /// without a configured topic or an unreachable broker never blocks the
    /// decision.
    async fn dispatch_open(&self, device: &Device, direction: Direction, now: Timestamp) {
        let Some(topic) = device.topic.as_deref() else {
            warn!(device = %device.id, "device has no broker topic; skipping command");
            return;
        };
        let payload = json!({
            "action": "OPEN",
            "direction": direction.as_str(),
            "timestamp": now.as_unix_millis(),
        });
        if let Err(err) = self.bus.publish(topic, payload).await {
            warn!(device = %device.id, error = %err, "OPEN command not delivered");
        }
    }
}

//! Notification fan-out: resolve a target scope to recipients and deliver.
//!
//! Fan-out is a background queue, not un-awaited concurrency: callers enqueue
//! a job and return immediately; a worker task resolves recipients, persists
//! one notification row per recipient, and attempts a best-effort push. Job
//! failures are logged and reported on a dedicated error channel so tests can
//! observe them; they never reach the request path.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use crate::domain::foundation::{DomainError, TenantId, UnitId, UserId};
use crate::domain::notification::{NewNotification, NotificationKind};
use crate::domain::tenancy::Role;
use crate::ports::{NotificationStore, PushSender, TenantDirectory};

/// Recipient scope of a fan-out job.
#[derive(Debug, Clone)]
pub enum FanoutScope {
    User(UserId),
    Unit(UnitId),
    Role(Role),
    AllTenant,
}

/// One queued delivery request.
#[derive(Debug, Clone)]
pub struct FanoutJob {
    pub tenant_id: TenantId,
    pub scope: FanoutScope,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
}

/// A fan-out failure surfaced on the error channel.
#[derive(Debug, Clone)]
pub struct FanoutFailure {
    pub job: FanoutJob,
    pub error: DomainError,
}

/// Handle used by the engine and the status tracker to enqueue deliveries.
#[derive(Clone)]
pub struct NotificationFanout {
    tx: mpsc::UnboundedSender<FanoutJob>,
}

impl NotificationFanout {
    /// Creates the handle/worker pair. Spawn `FanoutWorker::run` at startup.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        push: Arc<dyn PushSender>,
        directory: Arc<dyn TenantDirectory>,
    ) -> (Self, FanoutWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (error_tx, _error_rx) = mpsc::unbounded_channel();
        (
            Self { tx },
            FanoutWorker {
                rx,
                store,
                push,
                directory,
                error_tx,
            },
        )
    }

    /// Like `new`, also returning the worker's error channel for observation.
    pub fn with_error_channel(
        store: Arc<dyn NotificationStore>,
        push: Arc<dyn PushSender>,
        directory: Arc<dyn TenantDirectory>,
    ) -> (Self, FanoutWorker, mpsc::UnboundedReceiver<FanoutFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        (
            Self { tx },
            FanoutWorker {
                rx,
                store,
                push,
                directory,
                error_tx,
            },
            error_rx,
        )
    }

    /// Enqueues a delivery to one user.
    pub fn send_to_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: serde_json::Value,
    ) {
        self.enqueue(tenant_id, FanoutScope::User(user_id), kind, title, body, payload);
    }

    /// Enqueues a delivery to every active member of a unit.
    pub fn send_to_unit(
        &self,
        tenant_id: TenantId,
        unit_id: UnitId,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: serde_json::Value,
    ) {
        self.enqueue(tenant_id, FanoutScope::Unit(unit_id), kind, title, body, payload);
    }

    /// Enqueues a delivery to every active user holding a role in the tenant.
    pub fn send_to_role(
        &self,
        tenant_id: TenantId,
        role: Role,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: serde_json::Value,
    ) {
        self.enqueue(tenant_id, FanoutScope::Role(role), kind, title, body, payload);
    }

    /// Enqueues a delivery to every active user of the tenant, deduplicated.
    pub fn send_to_all(
        &self,
        tenant_id: TenantId,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: serde_json::Value,
    ) {
        self.enqueue(tenant_id, FanoutScope::AllTenant, kind, title, body, payload);
    }

    fn enqueue(
        &self,
        tenant_id: TenantId,
        scope: FanoutScope,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
        payload: serde_json::Value,
    ) {
        let job = FanoutJob {
            tenant_id,
            scope,
            kind,
            title: title.into(),
            body: body.into(),
            payload,
        };
        // Send fails only after the worker has shut down; nothing to deliver
        // to at that point.
        if self.tx.send(job).is_err() {
            warn!("notification fan-out worker is gone; dropping job");
        }
    }
}

/// Background task draining the fan-out queue.
pub struct FanoutWorker {
    rx: mpsc::UnboundedReceiver<FanoutJob>,
    store: Arc<dyn NotificationStore>,
    push: Arc<dyn PushSender>,
    directory: Arc<dyn TenantDirectory>,
    error_tx: mpsc::UnboundedSender<FanoutFailure>,
}

impl FanoutWorker {
    /// Runs until the shutdown signal flips, then drains whatever is queued.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        while let Ok(job) = self.rx.try_recv() {
                            self.process(job).await;
                        }
                        return;
                    }
                }
                job = self.rx.recv() => {
                    match job {
                        Some(job) => self.process(job).await,
                        None => return,
                    }
                }
            }
        }
    }

    /// Processes a single job (exposed for deterministic tests).
    pub async fn process(&self, job: FanoutJob) {
        if let Err(err) = self.deliver(&job).await {
            error!(
                kind = %job.kind,
                tenant = %job.tenant_id,
                error = %err,
                "notification fan-out failed"
            );
            let _ = self.error_tx.send(FanoutFailure { job, error: err });
        }
    }

    async fn deliver(&self, job: &FanoutJob) -> Result<(), DomainError> {
        let recipients = self.resolve_recipients(job).await?;
        debug!(
            kind = %job.kind,
            recipients = recipients.len(),
            "delivering notifications"
        );

        let deliveries = recipients
            .into_iter()
            .map(|user_id| self.deliver_to_user(job, user_id));
        let results = join_all(deliveries).await;

        // One failed recipient should not hide the rest; report the first.
        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
    }

    async fn resolve_recipients(&self, job: &FanoutJob) -> Result<Vec<UserId>, DomainError> {
        match &job.scope {
            FanoutScope::User(user_id) => Ok(vec![*user_id]),
            FanoutScope::Unit(unit_id) => {
                self.directory.unit_members(job.tenant_id, *unit_id).await
            }
            FanoutScope::Role(role) => self.directory.users_with_role(job.tenant_id, *role).await,
            FanoutScope::AllTenant => self.directory.all_users(job.tenant_id).await,
        }
    }

    async fn deliver_to_user(&self, job: &FanoutJob, user_id: UserId) -> Result<(), DomainError> {
        self.store
            .insert(NewNotification {
                tenant_id: job.tenant_id,
                user_id,
                kind: job.kind,
                title: job.title.clone(),
                body: job.body.clone(),
                payload: job.payload.clone(),
            })
            .await?;

        // Push is best-effort: the persisted row stands regardless.
        if let Some(token) = self.directory.push_token(user_id).await? {
            if let Err(err) = self
                .push
                .send(&token, &job.title, &job.body, &job.payload)
                .await
            {
                warn!(user = %user_id, error = %err, "push delivery failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{
        InMemoryNotificationStore, InMemoryTenantDirectory, RecordingPushSender,
    };
    use serde_json::json;

    fn setup() -> (
        NotificationFanout,
        FanoutWorker,
        mpsc::UnboundedReceiver<FanoutFailure>,
        Arc<InMemoryNotificationStore>,
        Arc<RecordingPushSender>,
        Arc<InMemoryTenantDirectory>,
    ) {
        let store = Arc::new(InMemoryNotificationStore::new());
        let push = Arc::new(RecordingPushSender::new());
        let directory = Arc::new(InMemoryTenantDirectory::new());
        let (fanout, worker, errors) = NotificationFanout::with_error_channel(
            store.clone(),
            push.clone(),
            directory.clone(),
        );
        (fanout, worker, errors, store, push, directory)
    }

    fn job_to_unit(tenant: TenantId, unit: UnitId) -> FanoutJob {
        FanoutJob {
            tenant_id: tenant,
            scope: FanoutScope::Unit(unit),
            kind: NotificationKind::QrUsed,
            title: "Acceso de visitante".to_string(),
            body: "Ana ingresó con código QR".to_string(),
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn unit_scope_persists_one_row_per_member() {
        let (_fanout, worker, _errors, store, _push, directory) = setup();
        let tenant = TenantId::new();
        let unit = UnitId::new();
        let (a, b) = (UserId::new(), UserId::new());
        directory.add_member(tenant, unit, a, Role::Resident).await;
        directory.add_member(tenant, unit, b, Role::Resident).await;

        worker.process(job_to_unit(tenant, unit)).await;

        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn push_failure_keeps_persisted_row_and_reports_no_job_failure() {
        let (_fanout, worker, mut errors, store, push, directory) = setup();
        push.fail_all().await;
        let tenant = TenantId::new();
        let user = UserId::new();
        directory.set_push_token(user, "tok-1").await;

        worker
            .process(FanoutJob {
                tenant_id: tenant,
                scope: FanoutScope::User(user),
                kind: NotificationKind::DeviceOffline,
                title: "Dispositivo sin conexión".to_string(),
                body: "Portón principal".to_string(),
                payload: json!({}),
            })
            .await;

        assert_eq!(store.count().await, 1);
        assert!(errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn store_failure_lands_on_error_channel() {
        let (_fanout, worker, mut errors, store, _push, _directory) = setup();
        store.fail_next().await;
        let tenant = TenantId::new();

        worker
            .process(FanoutJob {
                tenant_id: tenant,
                scope: FanoutScope::User(UserId::new()),
                kind: NotificationKind::Manual,
                title: "t".to_string(),
                body: "b".to_string(),
                payload: json!({}),
            })
            .await;

        let failure = errors.try_recv().expect("expected a fan-out failure");
        assert_eq!(failure.job.tenant_id, tenant);
    }

    #[tokio::test]
    async fn all_tenant_scope_deduplicates_recipients() {
        let (_fanout, worker, _errors, store, _push, directory) = setup();
        let tenant = TenantId::new();
        let unit_a = UnitId::new();
        let unit_b = UnitId::new();
        let user = UserId::new();
        // Same user active in two units.
        directory.add_member(tenant, unit_a, user, Role::Resident).await;
        directory.add_member(tenant, unit_b, user, Role::Resident).await;

        worker
            .process(FanoutJob {
                tenant_id: tenant,
                scope: FanoutScope::AllTenant,
                kind: NotificationKind::Manual,
                title: "t".to_string(),
                body: "b".to_string(),
                payload: json!({}),
            })
            .await;

        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn worker_drains_queue_on_shutdown() {
        let (fanout, worker, _errors, store, _push, _directory) = setup();
        let tenant = TenantId::new();
        let user = UserId::new();

        fanout.send_to_user(
            tenant,
            user,
            NotificationKind::Manual,
            "t",
            "b",
            json!({}),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(shutdown_rx));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(store.count().await, 1);
    }
}

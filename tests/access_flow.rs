//! Integration tests for the access decision flow.
//!
//! These tests wire the engine, QR lifecycle, throttle, notification fan-out,
//! and device status tracker against the in-memory adapters and the simulated
//! command bus, and verify the end-to-end contract:
//! 1. A decision publishes the OPEN command and writes exactly one log row
//! 2. Denial branches write a denied row (cooldown rejections write none)
//! 3. A granted QR redemption notifies the issuing unit
//! 4. An Online -> Offline device transition notifies tenant admins

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use acceso_core::adapters::in_memory::{
    InMemoryAccessLogStore, InMemoryDeviceRepository, InMemoryNotificationStore,
    InMemoryQrRepository, InMemoryTenantDirectory, RecordingPushSender,
};
use acceso_core::adapters::mqtt::SimulatedCommandBus;
use acceso_core::application::{
    AccessDecisionEngine, CooldownThrottle, DeviceStatusTracker, NotificationFanout, OpenGateRequest,
    QrLifecycle,
};
use acceso_core::domain::access::{AccessMethod, Direction, VisitorInfo};
use acceso_core::domain::device::{Device, DeviceKind, DeviceStatus};
use acceso_core::domain::foundation::{DeviceId, ErrorCode, TenantId, Timestamp, UnitId, UserId};
use acceso_core::domain::notification::NotificationKind;
use acceso_core::domain::tenancy::Role;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct App {
    engine: AccessDecisionEngine,
    lifecycle: Arc<QrLifecycle>,
    tracker: Arc<DeviceStatusTracker>,
    devices: Arc<InMemoryDeviceRepository>,
    log: Arc<InMemoryAccessLogStore>,
    directory: Arc<InMemoryTenantDirectory>,
    notifications: Arc<InMemoryNotificationStore>,
    bus: Arc<SimulatedCommandBus>,
    shutdown: watch::Sender<bool>,
}

fn app() -> App {
    let devices = Arc::new(InMemoryDeviceRepository::new());
    let log = Arc::new(InMemoryAccessLogStore::new());
    let directory = Arc::new(InMemoryTenantDirectory::new());
    let qr_repo = Arc::new(InMemoryQrRepository::new());
    let notifications = Arc::new(InMemoryNotificationStore::new());
    let bus = Arc::new(SimulatedCommandBus::new());

    let (fanout, worker) = NotificationFanout::new(
        notifications.clone(),
        Arc::new(RecordingPushSender::new()),
        directory.clone(),
    );
    let (shutdown, shutdown_rx) = watch::channel(false);
    tokio::spawn(worker.run(shutdown_rx));

    let lifecycle = Arc::new(QrLifecycle::new(qr_repo, directory.clone()));
    let engine = AccessDecisionEngine::new(
        devices.clone(),
        log.clone(),
        directory.clone(),
        lifecycle.clone(),
        Arc::new(CooldownThrottle::new(30)),
        bus.clone(),
        fanout.clone(),
    );
    let tracker = Arc::new(DeviceStatusTracker::new(devices.clone(), fanout));

    App {
        engine,
        lifecycle,
        tracker,
        devices,
        log,
        directory,
        notifications,
        bus,
        shutdown,
    }
}

async fn seeded_gate(app: &App, tenant: TenantId) -> Device {
    let device = Device {
        id: DeviceId::new(),
        tenant_id: tenant,
        name: "Portón principal".to_string(),
        kind: DeviceKind::Gate,
        topic: Some("iados/t1/gate1".to_string()),
        status: DeviceStatus::Online,
        is_active: true,
        last_seen: None,
    };
    app.devices.add(device.clone()).await;
    device
}

fn qr_request(device_id: DeviceId, code: &str) -> OpenGateRequest {
    OpenGateRequest {
        device_id,
        unit_id: None,
        method: AccessMethod::Qr,
        direction: Direction::Entry,
        qr_code: Some(code.to_string()),
        visitor: VisitorInfo::default(),
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

fn at(secs: u64) -> Timestamp {
    Timestamp::from_unix_secs(secs)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn granted_app_entry_publishes_open_and_writes_one_row() {
    let app = app();
    let tenant = TenantId::new();
    let device = seeded_gate(&app, tenant).await;
    let actor = UserId::new();

    let result = app
        .engine
        .open_gate_at(
            tenant,
            Some(actor),
            OpenGateRequest {
                device_id: device.id,
                unit_id: None,
                method: AccessMethod::App,
                direction: Direction::Entry,
                qr_code: None,
                visitor: VisitorInfo::default(),
            },
            at(1_000),
        )
        .await
        .unwrap();

    assert!(result.granted);
    assert_eq!(result.reason, "Acceso concedido");
    assert_eq!(app.log.count().await, 1);

    let published = app.bus.published().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "iados/t1/gate1");
    assert_eq!(published[0].1["action"], "OPEN");

    drop(app.shutdown);
}

#[tokio::test]
async fn cooldown_rejection_carries_remaining_seconds_and_no_row() {
    let app = app();
    let tenant = TenantId::new();
    let device = seeded_gate(&app, tenant).await;
    let actor = UserId::new();
    let request = OpenGateRequest {
        device_id: device.id,
        unit_id: None,
        method: AccessMethod::App,
        direction: Direction::Entry,
        qr_code: None,
        visitor: VisitorInfo::default(),
    };

    app.engine
        .open_gate_at(tenant, Some(actor), request.clone(), at(1_000))
        .await
        .unwrap();
    let err = app
        .engine
        .open_gate_at(tenant, Some(actor), request, at(1_005))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::RateLimited);
    assert_eq!(err.retry_after_secs(), Some(25));
    assert_eq!(app.log.count().await, 1);

    drop(app.shutdown);
}

#[tokio::test]
async fn full_qr_journey_generate_redeem_notify_exhaust() {
    let app = app();
    let tenant = TenantId::new();
    let device = seeded_gate(&app, tenant).await;
    let (unit, resident) = (UnitId::new(), UserId::new());
    app.directory.add_member(tenant, unit, resident, Role::Resident).await;

    // Resident issues a single-use code for a visitor.
    let qr = app
        .lifecycle
        .generate(tenant, resident, None, "Ana Torres", 1, 24)
        .await
        .unwrap();
    assert!(qr.code.starts_with("IAD-"));

    // First redemption opens the gate and notifies the unit.
    let result = app
        .engine
        .open_gate(tenant, None, qr_request(device.id, &qr.code))
        .await
        .unwrap();
    assert!(result.granted);
    assert_eq!(result.reason, "Acceso QR: Ana Torres");
    settle().await;

    let rows = app.notifications.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, resident);
    assert_eq!(rows[0].kind, NotificationKind::QrUsed);
    assert!(rows[0].body.contains("Ana Torres"));

    // Second redemption is the exhausted denial, logged as denied.
    let err = app
        .engine
        .open_gate(tenant, None, qr_request(device.id, &qr.code))
        .await
        .unwrap_err();
    assert_eq!(err.message, "Código QR expirado o usos agotados");

    let logs = app.log.all().await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs.iter().filter(|l| l.granted).count(), 1);
    assert_eq!(app.bus.published().await.len(), 1);

    drop(app.shutdown);
}

#[tokio::test]
async fn expired_qr_is_rejected() {
    let app = app();
    let tenant = TenantId::new();
    let device = seeded_gate(&app, tenant).await;
    let (unit, resident) = (UnitId::new(), UserId::new());
    app.directory.add_member(tenant, unit, resident, Role::Resident).await;

    let qr = app
        .lifecycle
        .generate(tenant, resident, None, "Ana Torres", 3, 1)
        .await
        .unwrap();

    let after_expiry = qr.expires_at.plus_secs(60);
    let err = app
        .engine
        .open_gate_at(tenant, None, qr_request(device.id, &qr.code), after_expiry)
        .await
        .unwrap_err();

    assert_eq!(err.message, "Código QR expirado o usos agotados");
    assert!(app.bus.published().await.is_empty());

    drop(app.shutdown);
}

#[tokio::test]
async fn delinquency_blocks_qr_entry_but_not_exit() {
    let app = app();
    let tenant = TenantId::new();
    let device = seeded_gate(&app, tenant).await;
    let (unit, resident) = (UnitId::new(), UserId::new());
    app.directory.add_member(tenant, unit, resident, Role::Resident).await;
    let qr = app
        .lifecycle
        .generate(tenant, resident, None, "Ana Torres", 3, 24)
        .await
        .unwrap();
    app.directory.set_delinquent(unit, true).await;

    let err = app
        .engine
        .open_gate(tenant, None, qr_request(device.id, &qr.code))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    // The same resident can still leave.
    let result = app
        .engine
        .open_gate(
            tenant,
            Some(resident),
            OpenGateRequest {
                device_id: device.id,
                unit_id: None,
                method: AccessMethod::App,
                direction: Direction::Exit,
                qr_code: None,
                visitor: VisitorInfo::default(),
            },
        )
        .await
        .unwrap();
    assert_eq!(result.reason, "Salida permitida");

    drop(app.shutdown);
}

#[tokio::test]
async fn concurrent_redemptions_of_a_single_use_code_open_once() {
    let app = app();
    let tenant = TenantId::new();
    let device = seeded_gate(&app, tenant).await;
    let (unit, resident) = (UnitId::new(), UserId::new());
    app.directory.add_member(tenant, unit, resident, Role::Resident).await;
    let qr = app
        .lifecycle
        .generate(tenant, resident, None, "Ana Torres", 1, 24)
        .await
        .unwrap();

    let engine = Arc::new(app.engine);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let request = qr_request(device.id, &qr.code);
        handles.push(tokio::spawn(async move {
            engine.open_gate(tenant, None, request).await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            granted += 1;
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(app.bus.published().await.len(), 1);
    assert_eq!(app.log.all().await.iter().filter(|l| l.granted).count(), 1);

    drop(app.shutdown);
}

#[tokio::test]
async fn device_offline_transition_notifies_admins() {
    let app = app();
    let tenant = TenantId::new();
    seeded_gate(&app, tenant).await;
    let admin = UserId::new();
    app.directory.add_user_with_role(tenant, admin, Role::Admin).await;

    app.tracker.subscribe_all(app.bus.as_ref()).await.unwrap();

    app.bus.inject("iados/t1/gate1/online", b"true").await;
    app.bus.inject("iados/t1/gate1/online", b"false").await;
    settle().await;

    let rows = app.notifications.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, admin);
    assert_eq!(rows[0].kind, NotificationKind::DeviceOffline);

    drop(app.shutdown);
}

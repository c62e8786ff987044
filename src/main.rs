//! Binary entrypoint: configuration, wiring, background tasks, shutdown.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use acceso_core::adapters::mqtt::{MqttCommandBus, SimulatedCommandBus};
use acceso_core::adapters::postgres::{
    PostgresDeviceRepository, PostgresNotificationStore, PostgresQrRepository,
    PostgresTenantDirectory,
};
use acceso_core::adapters::push::{FcmPushSender, NoopPushSender};
use acceso_core::application::{
    DeviceStatusTracker, NotificationFanout, QrLifecycle, QrSweeper,
};
use acceso_core::config::AppConfig;
use acceso_core::ports::{CommandBus, PushSender};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("migrations applied");
    }

    let devices = Arc::new(PostgresDeviceRepository::new(pool.clone()));
    let qr_repo = Arc::new(PostgresQrRepository::new(pool.clone()));
    let directory = Arc::new(PostgresTenantDirectory::new(pool.clone()));
    let notifications = Arc::new(PostgresNotificationStore::new(pool.clone()));

    let bus: Arc<dyn CommandBus> = if config.mqtt.is_configured() {
        MqttCommandBus::connect(&config.mqtt)?
    } else {
        warn!("no broker configured; device commands run in simulated mode");
        Arc::new(SimulatedCommandBus::new())
    };

    let push: Arc<dyn PushSender> = match &config.push.fcm_server_key {
        Some(key) => Arc::new(FcmPushSender::new(config.push.endpoint.clone(), key.clone())),
        None => {
            info!("push delivery disabled");
            Arc::new(NoopPushSender)
        }
    };

    let (fanout, fanout_worker) =
        NotificationFanout::new(notifications, push, directory.clone());
    let qr = Arc::new(QrLifecycle::new(qr_repo, directory));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let fanout_task = tokio::spawn(fanout_worker.run(shutdown_rx.clone()));
    let sweeper = QrSweeper::with_schedule(
        qr,
        config.access.sweep_initial_delay(),
        config.access.sweep_period(),
    );
    let sweeper_task = tokio::spawn(sweeper.run(shutdown_rx));

    let tracker = Arc::new(DeviceStatusTracker::new(devices, fanout));
    tracker.subscribe_all(bus.as_ref()).await?;

    info!("acceso-core running");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    shutdown_tx.send(true).ok();
    let _ = fanout_task.await;
    let _ = sweeper_task.await;
    pool.close().await;
    info!("shutdown complete");
    Ok(())
}

//! Scheduled cleanup of long-expired QR codes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::application::qr_lifecycle::QrLifecycle;
use crate::domain::foundation::Timestamp;

/// Background loop deleting codes expired more than thirty days ago.
///
/// Runs shortly after startup (so a fleet restart does not skip a day) and
/// then once per day. A failed sweep is logged and retried at the next tick.
pub struct QrSweeper {
    lifecycle: Arc<QrLifecycle>,
    initial_delay: Duration,
    period: Duration,
}

impl QrSweeper {
    pub fn new(lifecycle: Arc<QrLifecycle>) -> Self {
        Self::with_schedule(lifecycle, Duration::from_secs(60), Duration::from_secs(86_400))
    }

    /// Sweeper with an explicit schedule (tests and ops overrides).
    pub fn with_schedule(
        lifecycle: Arc<QrLifecycle>,
        initial_delay: Duration,
        period: Duration,
    ) -> Self {
        Self {
            lifecycle,
            initial_delay,
            period,
        }
    }

    /// Runs until the shutdown signal flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            initial_delay_secs = self.initial_delay.as_secs(),
            period_secs = self.period.as_secs(),
            "QR sweeper started"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.initial_delay) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
        self.sweep_once().await;

        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick completes immediately

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_once().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("QR sweeper stopped");
                        return;
                    }
                }
            }
        }
    }

    async fn sweep_once(&self) {
        match self.lifecycle.sweep(Timestamp::now()).await {
            Ok(deleted) => debug!(deleted, "QR sweep completed"),
            Err(err) => error!(error = %err, "QR sweep failed"),
        }
    }
}

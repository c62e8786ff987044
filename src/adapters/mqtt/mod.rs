//! Command bus adapters.
//!
//! `MqttCommandBus` carries real broker traffic over rumqttc; the
//! `SimulatedCommandBus` backs unconfigured deployments and the test suites.

mod client;
mod simulated;

pub use client::MqttCommandBus;
pub use simulated::SimulatedCommandBus;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::ports::MessageHandler;

/// Topic-to-handler routing table shared by both bus implementations.
#[derive(Default)]
pub(crate) struct HandlerTable {
    routes: RwLock<Vec<(String, Arc<dyn MessageHandler>)>>,
}

impl HandlerTable {
    pub(crate) async fn add(&self, topic: &str, handler: Arc<dyn MessageHandler>) {
        self.routes.write().await.push((topic.to_string(), handler));
    }

    pub(crate) async fn contains(&self, topic: &str) -> bool {
        self.routes.read().await.iter().any(|(t, _)| t == topic)
    }

    /// Invokes every handler registered for `topic`, logging failures.
    pub(crate) async fn dispatch(&self, topic: &str, payload: &[u8]) {
        let handlers: Vec<Arc<dyn MessageHandler>> = self
            .routes
            .read()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, h)| Arc::clone(h))
            .collect();

        if handlers.is_empty() {
            debug!(topic, "message on topic without handlers");
            return;
        }
        for handler in handlers {
            if let Err(err) = handler.handle(topic, payload).await {
                error!(topic, handler = handler.name(), error = %err, "message handler failed");
            }
        }
    }
}

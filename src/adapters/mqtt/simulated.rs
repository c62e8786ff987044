//! Simulated command bus for unconfigured deployments and tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::foundation::DomainError;
use crate::ports::{CommandBus, MessageHandler};

use super::HandlerTable;

/// Records publishes instead of delivering them and feeds injected messages
/// to subscribed handlers.
#[derive(Default)]
pub struct SimulatedCommandBus {
    published: Mutex<Vec<(String, serde_json::Value)>>,
    handlers: HandlerTable,
}

impl SimulatedCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(topic, payload)` pairs in publish order.
    pub async fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().await.clone()
    }

    pub async fn has_subscriber(&self, topic: &str) -> bool {
        self.handlers.contains(topic).await
    }

    /// Delivers a message to every handler subscribed to `topic`.
    pub async fn inject(&self, topic: &str, payload: &[u8]) {
        self.handlers.dispatch(topic, payload).await;
    }
}

#[async_trait]
impl CommandBus for SimulatedCommandBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), DomainError> {
        info!(topic, %payload, "simulated publish");
        self.published.lock().await.push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), DomainError> {
        self.handlers.add(topic, handler).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex as AsyncMutex;

    struct Recorder {
        seen: AsyncMutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn handle(&self, _topic: &str, payload: &[u8]) -> Result<(), DomainError> {
            self.seen.lock().await.push(payload.to_vec());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn records_publishes_in_order() {
        let bus = SimulatedCommandBus::new();
        bus.publish("a", json!({"n": 1})).await.unwrap();
        bus.publish("b", json!({"n": 2})).await.unwrap();

        let published = bus.published().await;
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].0, "a");
        assert_eq!(published[1].1["n"], 2);
    }

    #[tokio::test]
    async fn inject_reaches_only_matching_subscribers() {
        let bus = SimulatedCommandBus::new();
        let recorder = Arc::new(Recorder {
            seen: AsyncMutex::new(Vec::new()),
        });
        bus.subscribe("devices/1/online", recorder.clone()).await.unwrap();

        bus.inject("devices/1/online", b"true").await;
        bus.inject("devices/2/online", b"true").await;

        assert_eq!(recorder.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn handler_errors_do_not_stop_delivery() {
        struct Failing;

        #[async_trait]
        impl MessageHandler for Failing {
            async fn handle(&self, _topic: &str, _payload: &[u8]) -> Result<(), DomainError> {
                Err(DomainError::invalid_input("boom"))
            }

            fn name(&self) -> &'static str {
                "failing"
            }
        }

        let bus = SimulatedCommandBus::new();
        let recorder = Arc::new(Recorder {
            seen: AsyncMutex::new(Vec::new()),
        });
        bus.subscribe("t", Arc::new(Failing)).await.unwrap();
        bus.subscribe("t", recorder.clone()).await.unwrap();

        bus.inject("t", b"x").await;

        assert_eq!(recorder.seen.lock().await.len(), 1);
    }
}

//! Command bus port - the publish/subscribe boundary to physical actuators.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::DomainError;

/// Handler for messages arriving on a subscribed topic.
///
/// Handlers should be quick and idempotent; the bus invokes them from its
/// receive loop and logs (but does not retry) their errors.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes one inbound message.
    async fn handle(&self, topic: &str, payload: &[u8]) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Port for the broker connection carrying device commands and status.
///
/// Implementations hold a single long-lived connection per process,
/// established at startup. Reconnection after transient broker loss is the
/// underlying client's job; connect/error/reconnect events are surfaced as
/// log lines only.
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// Publishes a JSON payload with at-least-once delivery.
    ///
    /// Never fails the caller on broker unavailability: implementations fall
    /// back to a logged simulated publish, because granting access is not
    /// contingent on physical delivery confirmation.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), DomainError>;

    /// Registers a handler invoked for every message on `topic`.
    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), DomainError>;
}

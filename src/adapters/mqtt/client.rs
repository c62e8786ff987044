//! rumqttc-backed command bus.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::domain::foundation::DomainError;
use crate::ports::{CommandBus, MessageHandler};

use super::HandlerTable;

/// Single long-lived broker connection.
///
/// The event loop runs in a background task for the life of the process;
/// rumqttc reconnects on the next poll after a connection loss, and lifecycle
/// events surface as log lines only. Publish failures degrade to a logged
/// simulated publish so a broker outage never blocks an access grant.
pub struct MqttCommandBus {
    client: AsyncClient,
    handlers: Arc<HandlerTable>,
}

impl MqttCommandBus {
    /// Connects and spawns the event loop task.
    ///
    /// Call only with a configured broker (`config.is_configured()`); use the
    /// simulated bus otherwise.
    pub fn connect(config: &MqttConfig) -> Result<Arc<Self>, DomainError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| DomainError::invalid_input("broker host not configured"))?;

        let mut options = MqttOptions::new(config.client_id.clone(), host, config.port);
        options.set_keep_alive(config.keep_alive());
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.expose_secret().clone());
        }

        let (client, mut event_loop) = AsyncClient::new(options, 32);
        let handlers = Arc::new(HandlerTable::default());

        let loop_handlers = Arc::clone(&handlers);
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        loop_handlers.dispatch(&publish.topic, &publish.payload).await;
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("broker connection established");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "broker connection lost; retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        info!(host, port = config.port, client_id = %config.client_id, "MQTT bus connected");
        Ok(Arc::new(Self { client, handlers }))
    }
}

#[async_trait]
impl CommandBus for MqttCommandBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| DomainError::invalid_input(format!("unserializable payload: {e}")))?;

        match self.client.publish(topic, QoS::AtLeastOnce, false, bytes).await {
            Ok(()) => {
                debug!(topic, %payload, "command published");
                Ok(())
            }
            Err(err) => {
                // Degraded mode: the decision stands, delivery is lost.
                warn!(topic, %payload, error = %err, "broker unavailable; simulated publish");
                Ok(())
            }
        }
    }

    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), DomainError> {
        self.handlers.add(topic, handler).await;
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| {
                DomainError::new(
                    crate::domain::foundation::ErrorCode::InternalError,
                    format!("broker subscription failed: {e}"),
                )
            })?;
        debug!(topic, "subscribed");
        Ok(())
    }
}

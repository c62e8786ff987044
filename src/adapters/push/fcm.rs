//! FCM push sender.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::PushSender;

/// Sends notifications through the FCM legacy HTTP API.
///
/// Callers treat delivery as best-effort; errors returned here are logged by
/// the fan-out worker and go no further.
pub struct FcmPushSender {
    client: reqwest::Client,
    endpoint: String,
    server_key: SecretString,
}

impl FcmPushSender {
    pub fn new(endpoint: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            server_key: SecretString::new(server_key.into()),
        }
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        payload: &serde_json::Value,
    ) -> Result<(), DomainError> {
        let request = json!({
            "to": token,
            "notification": { "title": title, "body": body },
            "data": payload,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("key={}", self.server_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::InternalError, format!("FCM request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("FCM returned status {}", response.status()),
            ));
        }
        debug!(title, "push delivered");
        Ok(())
    }
}

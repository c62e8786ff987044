//! Push delivery configuration

use serde::Deserialize;

use super::error::ValidationError;

/// FCM legacy HTTP API settings.
///
/// With no server key configured pushes are skipped; persisted notification
/// rows are unaffected.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// FCM server key; absent disables push delivery
    pub fcm_server_key: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl PushConfig {
    pub fn is_configured(&self) -> bool {
        self.fcm_server_key.is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.endpoint.is_empty() {
            return Err(ValidationError::MissingRequired("PUSH__ENDPOINT"));
        }
        Ok(())
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            fcm_server_key: None,
            endpoint: default_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    "https://fcm.googleapis.com/fcm/send".to_string()
}

//! MQTT broker configuration

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Broker connection settings.
///
/// With no host configured the process runs in simulated mode: OPEN commands
/// are logged instead of published and no status subscriptions exist.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MqttConfig {
    /// Broker host; absent means simulated mode
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    pub username: Option<String>,

    pub password: Option<SecretString>,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl MqttConfig {
    pub fn is_configured(&self) -> bool {
        self.host.is_some()
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.password.is_some() && self.username.is_none() {
            return Err(ValidationError::MqttPasswordWithoutUsername);
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "acceso-core".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_means_simulated_mode() {
        let config = MqttConfig::default();
        assert!(!config.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn password_without_username_fails_validation() {
        let config = MqttConfig {
            host: Some("broker.local".to_string()),
            password: Some(SecretString::new("hunter2".to_string())),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

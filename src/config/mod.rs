//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `ACCESO` prefix
//! and nested sections use double underscores as separators:
//!
//! - `ACCESO__DATABASE__URL=postgres://...` -> `database.url`
//! - `ACCESO__MQTT__HOST=broker.local` -> `mqtt.host`
//! - `ACCESO__ACCESS__COOLDOWN_SECONDS=30` -> `access.cooldown_seconds`

mod access;
mod database;
mod error;
mod mqtt;
mod push;

pub use access::AccessConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use mqtt::MqttConfig;
pub use push::PushConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Broker connection; defaults to simulated mode
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// FCM push delivery; defaults to disabled
    #[serde(default)]
    pub push: PushConfig,

    /// Decision engine tunables
    #[serde(default)]
    pub access: AccessConfig,
}

impl AppConfig {
    /// Loads configuration from the environment, reading `.env` first when
    /// present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("ACCESO").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation across all sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.mqtt.validate()?;
        self.push.validate()?;
        self.access.validate()?;
        Ok(())
    }
}

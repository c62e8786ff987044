//! Access policy configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Tunables for the decision engine and its background tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Cooldown window between app-initiated opens per (actor, device)
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,

    /// Delay before the first QR sweep after startup
    #[serde(default = "default_sweep_delay")]
    pub sweep_initial_delay_secs: u64,

    /// Interval between QR sweeps
    #[serde(default = "default_sweep_period")]
    pub sweep_period_secs: u64,
}

impl AccessConfig {
    pub fn sweep_initial_delay(&self) -> Duration {
        Duration::from_secs(self.sweep_initial_delay_secs)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cooldown_seconds == 0 {
            return Err(ValidationError::InvalidCooldownWindow);
        }
        if self.sweep_period_secs == 0 {
            return Err(ValidationError::InvalidSweepPeriod);
        }
        Ok(())
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown(),
            sweep_initial_delay_secs: default_sweep_delay(),
            sweep_period_secs: default_sweep_period(),
        }
    }
}

fn default_cooldown() -> u64 {
    30
}

fn default_sweep_delay() -> u64 {
    60
}

fn default_sweep_period() -> u64 {
    86_400
}

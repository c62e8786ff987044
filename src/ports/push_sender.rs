//! Push delivery port.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for best-effort push delivery to a device token.
///
/// Failures are logged by the fan-out and never roll back the persisted
/// notification row.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Sends one push message.
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        payload: &serde_json::Value,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn PushSender) {}
}

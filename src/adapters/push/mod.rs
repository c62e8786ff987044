//! Push delivery adapters.

mod fcm;

pub use fcm::FcmPushSender;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::PushSender;

/// Sender used when push delivery is not configured.
pub struct NoopPushSender;

#[async_trait]
impl PushSender for NoopPushSender {
    async fn send(
        &self,
        _token: &str,
        _title: &str,
        _body: &str,
        _payload: &serde_json::Value,
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

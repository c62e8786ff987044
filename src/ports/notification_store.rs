//! Notification persistence port.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::notification::{NewNotification, Notification};

/// Port for persisting notification rows.
///
/// Read/mark-read operations belong to the excluded notifications module; the
/// core only appends.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persists one notification, returning it with id and timestamp assigned.
    async fn insert(&self, notification: NewNotification) -> Result<Notification, DomainError>;
}

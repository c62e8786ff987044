//! Foundation value objects shared across the domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{AccessAttemptId, DeviceId, NotificationId, QrCodeId, TenantId, UnitId, UserId};
pub use timestamp::Timestamp;

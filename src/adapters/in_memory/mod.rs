//! In-memory adapter implementations.
//!
//! Used by the test suites and by local development without a database.
//! Each adapter mirrors the concurrency contract of its Postgres twin; in
//! particular the QR repository's `consume_use` performs its guard and
//! increment under one lock.

mod access_log;
mod device_repository;
mod notification_store;
mod push_sender;
mod qr_repository;
mod tenant_directory;

pub use access_log::InMemoryAccessLogStore;
pub use device_repository::InMemoryDeviceRepository;
pub use notification_store::InMemoryNotificationStore;
pub use push_sender::RecordingPushSender;
pub use qr_repository::InMemoryQrRepository;
pub use tenant_directory::InMemoryTenantDirectory;

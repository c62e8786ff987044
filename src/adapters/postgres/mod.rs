//! PostgreSQL adapter implementations.
//!
//! Each adapter owns a `PgPool` clone and maps rows into domain types via a
//! `FromRow` struct plus `TryFrom`. Storage failures become
//! `DomainError::database`; enum columns round-trip through the domain
//! `as_str`/`parse` pairs.

mod access_log;
mod device_repository;
mod notification_store;
mod qr_repository;
mod tenant_directory;

pub use access_log::PostgresAccessLogStore;
pub use device_repository::PostgresDeviceRepository;
pub use notification_store::PostgresNotificationStore;
pub use qr_repository::PostgresQrRepository;
pub use tenant_directory::PostgresTenantDirectory;

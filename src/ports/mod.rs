//! Ports - interfaces between the core and its collaborators.
//!
//! Each port is an `async_trait` the application layer depends on; adapters
//! provide Postgres, MQTT, push, and in-memory implementations.

mod access_log;
mod command_bus;
mod device_repository;
mod notification_store;
mod push_sender;
mod qr_repository;
mod tenant_directory;

pub use access_log::{AccessLogFilter, AccessLogStore};
pub use command_bus::{CommandBus, MessageHandler};
pub use device_repository::DeviceRepository;
pub use notification_store::NotificationStore;
pub use push_sender::PushSender;
pub use qr_repository::QrRepository;
pub use tenant_directory::TenantDirectory;

/// Offset/limit pagination request.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

/// A page of results plus the total row count for the query.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
}

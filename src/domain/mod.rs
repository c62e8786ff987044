//! Domain model for the access engine.

pub mod access;
pub mod device;
pub mod foundation;
pub mod notification;
pub mod tenancy;

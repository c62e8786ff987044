//! Adapter implementations of the ports.

pub mod in_memory;
pub mod mqtt;
pub mod postgres;
pub mod push;

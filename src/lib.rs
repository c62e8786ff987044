//! Acceso Digital - Access Decision & Device Command Engine
//!
//! This crate implements the authorization core of a multi-tenant residential
//! community platform: gate/door open decisions, the visitor QR-code lifecycle,
//! device command dispatch over MQTT, device online/offline tracking, and the
//! notification fan-out those flows trigger.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

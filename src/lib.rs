//! HomeNode firmware library.
//!
//! Connected-node runtime for the mains-powered house nodes (garage,
//! LED driver): secure network bootstrap, a resilient MQTT session
//! with deterministic resubscribe, topic routing through handler
//! tokens, and the signal-conditioning primitives the tasks build on.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hw;
pub mod mqtt;
pub mod pins;
pub mod registry;
pub mod runtime;
pub mod signal;
pub mod tasks;

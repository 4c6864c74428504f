//! Platform adapters — everything that touches ESP-IDF or stands in
//! for it on the host.
//!
//! Each adapter is dual-target: real driver calls behind
//! `#[cfg(target_os = "espidf")]`, deterministic simulation hooks for
//! host-side tests everywhere else.

pub mod cert_store;
pub mod ota;
pub mod storage;
pub mod time;
pub mod wifi;

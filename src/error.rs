//! Unified error types for the HomeNode firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! composition root's error handling uniform. Variants are `Copy` where
//! possible so they can be passed through the runtime without allocation.
//! Fatal conditions are detected at the call site and reported up to
//! `main`, which halts for the external watchdog — there is no unwinding
//! across component boundaries.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is missing, malformed, or could not be loaded.
    Config(ConfigError),
    /// Network bring-up or broker session failure.
    Comms(CommsError),
    /// The topic registry rejected a registration.
    Registry(RegistryError),
    /// Peripheral or subsystem initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration / persistent-storage errors
// ---------------------------------------------------------------------------

/// Errors from configuration and trust-anchor loading.
///
/// All of these are fatal at startup: the node has no partial-config
/// operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Backing store (NVS / flash filesystem) could not be mounted or read.
    StorageUnavailable,
    /// The configuration document does not exist.
    NotFound,
    /// The configuration document failed JSON deserialisation.
    Malformed,
    /// A required field is absent. Names the JSON key.
    MissingField(&'static str),
    /// The trust-anchor blob is absent or empty.
    AnchorMissing,
    /// The trust-anchor blob exceeds the fixed anchor buffer.
    AnchorTooLarge,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StorageUnavailable => write!(f, "storage unavailable"),
            Self::NotFound => write!(f, "config not found"),
            Self::Malformed => write!(f, "config malformed"),
            Self::MissingField(key) => write!(f, "missing field '{key}'"),
            Self::AnchorMissing => write!(f, "trust anchor missing"),
            Self::AnchorTooLarge => write!(f, "trust anchor too large"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// WiFi association did not complete within the bring-up deadline.
    WifiAssociateTimeout,
    /// Wall-clock time did not sync within the bring-up deadline.
    TimeSyncTimeout,
    /// The WiFi driver rejected the configured credentials.
    WifiConfigRejected,
    /// Broker connect failed (retried on the next tick, not fatal).
    ConnectFailed,
    /// A publish was not accepted by the transport.
    PublishFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiAssociateTimeout => write!(f, "WiFi association timed out"),
            Self::TimeSyncTimeout => write!(f, "time sync timed out"),
            Self::WifiConfigRejected => write!(f, "WiFi credentials rejected"),
            Self::ConnectFailed => write!(f, "broker connect failed"),
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Topic registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// All binding slots are occupied.
    Full,
    /// The topic string exceeds the fixed topic capacity.
    TopicTooLong,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "registry full"),
            Self::TopicTooLong => write!(f, "topic too long"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

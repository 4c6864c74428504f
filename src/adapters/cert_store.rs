//! Trust-anchor handling.
//!
//! The trust anchor is a PEM-encoded certificate chain used to validate
//! the broker's identity during the TLS handshake. The core loads it
//! once at startup and never inspects it beyond handing it to the
//! secure-transport layer; a missing or empty anchor is fatal.

use crate::error::ConfigError;

/// Maximum anchor size (PEM format, includes headers).
pub const MAX_ANCHOR_SIZE: usize = 4096;

/// Opaque PEM certificate-chain blob, owned for the process lifetime.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    pem: heapless::Vec<u8, MAX_ANCHOR_SIZE>,
}

impl TrustAnchor {
    /// Wrap a PEM blob. Empty blobs are rejected — an absent anchor
    /// must fail bring-up, not silently disable validation.
    pub fn from_pem(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.is_empty() {
            return Err(ConfigError::AnchorMissing);
        }
        let mut pem = heapless::Vec::new();
        pem.extend_from_slice(bytes)
            .map_err(|()| ConfigError::AnchorTooLarge)?;
        Ok(Self { pem })
    }

    pub fn pem(&self) -> &[u8] {
        &self.pem
    }
}

/// Source of the trust anchor blob (NVS partition on the device,
/// in-memory bytes in tests).
pub trait AnchorSource {
    fn load(&self) -> Result<TrustAnchor, ConfigError>;
}

//! Persistent storage access for the node config and trust anchor.
//!
//! On the device both live in NVS blobs, provisioned out of band before
//! first boot. On the host the sources are in-memory byte buffers so
//! tests can script every load outcome.

use crate::adapters::cert_store::{AnchorSource, TrustAnchor, MAX_ANCHOR_SIZE};
use crate::config::NodeConfig;
use crate::error::ConfigError;

/// Node configuration loader. Loading happens exactly once, before any
/// network activity; a failure here is fatal.
pub trait ConfigSource {
    fn load(&self) -> Result<NodeConfig, ConfigError>;
}

/// In-memory JSON config for tests and host simulation.
#[cfg(not(target_os = "espidf"))]
pub struct MemConfigSource {
    doc: Option<Vec<u8>>,
}

#[cfg(not(target_os = "espidf"))]
impl MemConfigSource {
    pub fn from_json(doc: &[u8]) -> Self {
        Self {
            doc: Some(doc.to_vec()),
        }
    }

    /// A source whose backing store has no config at all.
    pub fn empty() -> Self {
        Self { doc: None }
    }
}

#[cfg(not(target_os = "espidf"))]
impl ConfigSource for MemConfigSource {
    fn load(&self) -> Result<NodeConfig, ConfigError> {
        let doc = self.doc.as_deref().ok_or(ConfigError::NotFound)?;
        NodeConfig::from_json(doc)
    }
}

/// In-memory trust anchor for tests and host simulation.
#[cfg(not(target_os = "espidf"))]
pub struct MemAnchorSource {
    pem: Vec<u8>,
}

#[cfg(not(target_os = "espidf"))]
impl MemAnchorSource {
    pub fn from_pem(pem: &[u8]) -> Self {
        Self { pem: pem.to_vec() }
    }
}

#[cfg(not(target_os = "espidf"))]
impl AnchorSource for MemAnchorSource {
    fn load(&self) -> Result<TrustAnchor, ConfigError> {
        TrustAnchor::from_pem(&self.pem)
    }
}

/// NVS-backed sources for the device build.
#[cfg(target_os = "espidf")]
pub mod nvs {
    use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

    use super::*;

    const CONFIG_NAMESPACE: &str = "node";
    const CONFIG_KEY: &str = "config";
    const CERT_NAMESPACE: &str = "certs";
    const CERT_KEY: &str = "ca_cert";

    /// Largest config document we will read back.
    const MAX_CONFIG_SIZE: usize = 1024;

    fn open(namespace: &str) -> Result<EspNvs<NvsDefault>, ConfigError> {
        let partition =
            EspNvsPartition::<NvsDefault>::take().map_err(|_| ConfigError::StorageUnavailable)?;
        EspNvs::new(partition, namespace, false).map_err(|_| ConfigError::StorageUnavailable)
    }

    pub struct NvsConfigSource;

    impl ConfigSource for NvsConfigSource {
        fn load(&self) -> Result<NodeConfig, ConfigError> {
            let nvs = open(CONFIG_NAMESPACE)?;
            let mut buf = [0u8; MAX_CONFIG_SIZE];
            let blob = nvs
                .get_blob(CONFIG_KEY, &mut buf)
                .map_err(|_| ConfigError::StorageUnavailable)?
                .ok_or(ConfigError::NotFound)?;
            NodeConfig::from_json(blob)
        }
    }

    pub struct NvsAnchorSource;

    impl AnchorSource for NvsAnchorSource {
        fn load(&self) -> Result<TrustAnchor, ConfigError> {
            let nvs = open(CERT_NAMESPACE)?;
            let mut buf = [0u8; MAX_ANCHOR_SIZE];
            let blob = nvs
                .get_blob(CERT_KEY, &mut buf)
                .map_err(|_| ConfigError::StorageUnavailable)?
                .ok_or(ConfigError::AnchorMissing)?;
            TrustAnchor::from_pem(blob)
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::config::tests_support::FULL_DOC;

    #[test]
    fn mem_source_round_trips_config() {
        let source = MemConfigSource::from_json(FULL_DOC.as_bytes());
        let config = source.load().unwrap();
        assert_eq!(config.hostname.as_str(), "garage");
    }

    #[test]
    fn empty_store_reports_not_found() {
        assert_eq!(MemConfigSource::empty().load().unwrap_err(), ConfigError::NotFound);
    }

    #[test]
    fn anchor_source_rejects_empty_blob() {
        assert_eq!(
            MemAnchorSource::from_pem(b"").load().unwrap_err(),
            ConfigError::AnchorMissing
        );
    }
}

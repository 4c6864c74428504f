//! Fuzz target: `NodeConfig::from_json`
//!
//! The provisioning document is written by an external tool and read
//! from flash, so the parser must reject arbitrary bytes without
//! panicking, and accepted documents must respect the fixed field
//! capacities.
//!
//! cargo fuzz run fuzz_config_parse

#![no_main]

use homenode::config::{NodeConfig, HOST_CAPACITY, NAME_CAPACITY, SECRET_CAPACITY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = NodeConfig::from_json(data) {
        // Truncation must have kept every field within capacity.
        assert!(config.ssid.len() <= NAME_CAPACITY);
        assert!(config.hostname.len() <= NAME_CAPACITY);
        assert!(config.mqtt_user.len() <= NAME_CAPACITY);
        assert!(config.wifi_password.len() <= SECRET_CAPACITY);
        assert!(config.mqtt_password.len() <= SECRET_CAPACITY);
        assert!(config.ota_password_hash.len() <= SECRET_CAPACITY);
        assert!(config.mqtt_broker_hostname.len() <= HOST_CAPACITY);
    }
});

//! Node configuration record.
//!
//! One JSON document, loaded once at startup by the storage adapter and
//! read-only thereafter. Field names follow the provisioning tool's
//! schema (`hostname`, `mqttBrokerHostname`, ...). Any missing or
//! malformed required field is fatal — the node has no partial-config
//! operating mode.
//!
//! In-memory fields are fixed-capacity `heapless` strings. Values longer
//! than a field's capacity are silently truncated; this is a documented
//! limitation of the provisioning format, not a fault.

use serde::Deserialize;

use crate::error::ConfigError;

/// Capacity of short identity fields (hostname, user).
pub const NAME_CAPACITY: usize = 32;
/// Capacity of secrets and hashes (passwords, OTA credential hash).
pub const SECRET_CAPACITY: usize = 64;
/// Capacity of the broker hostname.
pub const HOST_CAPACITY: usize = 64;

/// Core node configuration, populated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    // --- WiFi ---
    pub ssid: heapless::String<NAME_CAPACITY>,
    pub wifi_password: heapless::String<SECRET_CAPACITY>,
    pub hostname: heapless::String<NAME_CAPACITY>,

    // --- OTA update channel ---
    pub ota_port: u16,
    pub ota_password_hash: heapless::String<SECRET_CAPACITY>,

    // --- MQTT broker ---
    pub mqtt_broker_hostname: heapless::String<HOST_CAPACITY>,
    pub mqtt_port: u16,
    pub mqtt_user: heapless::String<NAME_CAPACITY>,
    pub mqtt_password: heapless::String<SECRET_CAPACITY>,
}

/// Wire shape of the provisioning document. Every field is optional at
/// the serde layer so that absence maps to a named `MissingField` error
/// instead of a generic deserialisation failure.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    hostname: Option<String>,
    mqtt_broker_hostname: Option<String>,
    mqtt_port: Option<u16>,
    mqtt_user: Option<String>,
    mqtt_password: Option<String>,
    ota_port: Option<u16>,
    ota_password_hash: Option<String>,
    ssid: Option<String>,
    wifi_password: Option<String>,
}

/// Copy `s` into a fixed-capacity string, silently truncating at the
/// last char boundary that fits.
fn truncate_into<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

impl NodeConfig {
    /// Parse the provisioning JSON document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_slice(bytes).map_err(|_| ConfigError::Malformed)?;

        fn require<T>(field: Option<T>, key: &'static str) -> Result<T, ConfigError> {
            field.ok_or(ConfigError::MissingField(key))
        }

        // Required fields are checked in the provisioning document's
        // key order so a multi-field failure always names the same one.
        let hostname = require(raw.hostname, "hostname")?;
        let mqtt_broker_hostname = require(raw.mqtt_broker_hostname, "mqttBrokerHostname")?;
        let mqtt_port = require(raw.mqtt_port, "mqttPort")?;
        let mqtt_user = require(raw.mqtt_user, "mqttUser")?;
        let mqtt_password = require(raw.mqtt_password, "mqttPassword")?;
        let ota_port = require(raw.ota_port, "otaPort")?;
        let ota_password_hash = require(raw.ota_password_hash, "otaPasswordHash")?;
        let ssid = require(raw.ssid, "ssid")?;
        let wifi_password = require(raw.wifi_password, "wifiPassword")?;

        Ok(Self {
            ssid: truncate_into(&ssid),
            wifi_password: truncate_into(&wifi_password),
            hostname: truncate_into(&hostname),
            ota_port,
            ota_password_hash: truncate_into(&ota_password_hash),
            mqtt_broker_hostname: truncate_into(&mqtt_broker_hostname),
            mqtt_port,
            mqtt_user: truncate_into(&mqtt_user),
            mqtt_password: truncate_into(&mqtt_password),
        })
    }
}

/// Canonical provisioning document for host-side tests.
#[cfg(not(target_os = "espidf"))]
pub mod tests_support {
    pub const FULL_DOC: &str = r#"{
        "hostname": "garage",
        "mqttBrokerHostname": "broker.lan",
        "mqttPort": 8883,
        "mqttUser": "garage",
        "mqttPassword": "hunter2hunter2",
        "otaPort": 8266,
        "otaPasswordHash": "0123456789abcdef0123456789abcdef",
        "ssid": "HomeNet",
        "wifiPassword": "correcthorse"
    }"#;
}

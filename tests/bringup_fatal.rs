//! Bring-up failure paths.
//!
//! A node with bad provisioning must fail before touching the network,
//! and every bring-up failure must surface as a typed error for `main`
//! to halt on. Host-only.

#![cfg(not(target_os = "espidf"))]

use homenode::adapters::storage::{MemAnchorSource, MemConfigSource};
use homenode::adapters::wifi;
use homenode::config::tests_support::FULL_DOC;
use homenode::error::{CommsError, ConfigError, Error};
use homenode::mqtt::sim::SimBroker;
use homenode::runtime::{NodeRuntime, RuntimeOptions};
use homenode::tasks::Handler;

const PEM: &[u8] = b"-----BEGIN CERTIFICATE-----\nAA==\n-----END CERTIFICATE-----\n";

fn init_with(config: &MemConfigSource, anchor: &MemAnchorSource) -> Result<(), Error> {
    NodeRuntime::<SimBroker, Handler>::init(
        RuntimeOptions::default(),
        config,
        anchor,
        SimBroker::new(),
    )
    .map(|_| ())
}

#[test]
fn missing_config_fails_before_any_network_activity() {
    wifi::sim::reset();

    let err = init_with(&MemConfigSource::empty(), &MemAnchorSource::from_pem(PEM)).unwrap_err();

    assert_eq!(err, Error::Config(ConfigError::NotFound));
    assert_eq!(wifi::sim::associate_attempts(), 0);
}

#[test]
fn malformed_config_names_the_missing_field() {
    wifi::sim::reset();

    let doc = br#"{"hostname": "garage"}"#;
    let err = init_with(
        &MemConfigSource::from_json(doc),
        &MemAnchorSource::from_pem(PEM),
    )
    .unwrap_err();

    assert_eq!(
        err,
        Error::Config(ConfigError::MissingField("mqttBrokerHostname"))
    );
    assert_eq!(wifi::sim::associate_attempts(), 0);
}

#[test]
fn missing_trust_anchor_is_fatal_before_association() {
    wifi::sim::reset();

    let err = init_with(
        &MemConfigSource::from_json(FULL_DOC.as_bytes()),
        &MemAnchorSource::from_pem(b""),
    )
    .unwrap_err();

    assert_eq!(err, Error::Config(ConfigError::AnchorMissing));
    assert_eq!(wifi::sim::associate_attempts(), 0);
}

#[test]
fn association_timeout_surfaces_as_typed_error() {
    wifi::sim::reset();
    wifi::sim::set_associate_ok(false);

    let err = init_with(
        &MemConfigSource::from_json(FULL_DOC.as_bytes()),
        &MemAnchorSource::from_pem(PEM),
    )
    .unwrap_err();

    assert_eq!(err, Error::Comms(CommsError::WifiAssociateTimeout));
    assert_eq!(wifi::sim::associate_attempts(), 1);
    wifi::sim::reset();
}

#[test]
fn rejected_credentials_fail_before_association() {
    wifi::sim::reset();

    // SSID with a control character is rejected at validation
    let doc = FULL_DOC.replace("HomeNet", "Home\\u0007Net");
    let err = init_with(
        &MemConfigSource::from_json(doc.as_bytes()),
        &MemAnchorSource::from_pem(PEM),
    )
    .unwrap_err();

    assert_eq!(err, Error::Comms(CommsError::WifiConfigRejected));
    assert_eq!(wifi::sim::associate_attempts(), 0);
}

//! Node runtime — the composition root.
//!
//! Owns every long-lived object (config, trust anchor, clock, WiFi,
//! update channel, topic registry, connection manager, broker transport)
//! and fixes the bring-up order: storage before network, network before
//! time sync, time sync before the first TLS connect. Any bring-up
//! failure is returned to `main`, which halts for the watchdog; there is
//! no degraded mode.

use crate::adapters::cert_store::{AnchorSource, TrustAnchor};
use crate::adapters::ota::UpdateChannel;
use crate::adapters::storage::ConfigSource;
use crate::adapters::time::NodeClock;
use crate::adapters::wifi::WifiAdapter;
use crate::config::NodeConfig;
use crate::error::Result;
use crate::mqtt::{BrokerPort, ConnectionManager, LinkState, LinkStats, MessageDelegate};
use crate::registry::TopicRegistry;

/// Bring-up deadlines. Infinite waits are not allowed; a node that
/// cannot associate or sync time within these windows halts and lets
/// the watchdog reset it.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub wifi_deadline_ms: u32,
    pub sntp_deadline_ms: u32,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            wifi_deadline_ms: 60_000,
            sntp_deadline_ms: 30_000,
        }
    }
}

pub struct NodeRuntime<B: BrokerPort, H: Copy> {
    config: NodeConfig,
    #[allow(dead_code)] // held for the broker's lifetime
    anchor: TrustAnchor,
    clock: NodeClock,
    #[allow(dead_code)] // owns the station for the boot lifetime
    wifi: WifiAdapter,
    updates: UpdateChannel,
    registry: TopicRegistry<H>,
    manager: ConnectionManager,
    broker: B,
}

impl<B: BrokerPort, H: Copy> NodeRuntime<B, H> {
    /// Bring the node up. Order is load-bearing:
    ///
    /// 1. config and trust anchor from storage (no network yet)
    /// 2. WiFi association, bounded
    /// 3. wall-clock sync, bounded (TLS needs a sane clock)
    /// 4. update channel announcement
    /// 5. broker endpoint configuration and session identity
    ///
    /// The first connect attempt happens on the first `run_cycle`, not
    /// here; bring-up ends with the session machinery armed.
    pub fn init(
        opts: RuntimeOptions,
        config_source: &dyn ConfigSource,
        anchor_source: &dyn AnchorSource,
        mut broker: B,
    ) -> Result<Self> {
        let config = config_source.load()?;
        let anchor = anchor_source.load()?;

        let mut wifi = WifiAdapter::new();
        wifi.set_credentials(&config.ssid, &config.wifi_password, &config.hostname)?;
        wifi.associate_blocking(opts.wifi_deadline_ms)?;

        let clock = NodeClock::new();
        clock.sync_wall_clock(opts.sntp_deadline_ms)?;

        let mut updates = UpdateChannel::new();
        updates.begin(&config.hostname, config.ota_port, &config.ota_password_hash);

        broker.set_broker(&config.mqtt_broker_hostname, config.mqtt_port, &anchor)?;

        let mut manager = ConnectionManager::new();
        manager.configure(&config);

        Ok(Self {
            config,
            anchor,
            clock,
            wifi,
            updates,
            registry: TopicRegistry::new(),
            manager,
            broker,
        })
    }

    /// Bind a topic to a handler token. Bindings registered before the
    /// first connect are subscribed on connect; later bindings take
    /// effect on the next reconnect.
    pub fn subscribe(&mut self, topic: &str, handler: H) -> Result<()> {
        self.registry.subscribe(topic, handler)?;
        Ok(())
    }

    /// One cooperative cycle: service the update channel first so an
    /// in-flight upload is never starved, then drive the session state
    /// machine (connect / resubscribe / pump inbound).
    pub fn run_cycle(&mut self, delegate: &mut dyn MessageDelegate<H>) {
        self.updates.service();
        self.manager
            .tick(&mut self.broker, &self.registry, delegate);
    }

    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        self.manager.publish(&mut self.broker, topic, payload)
    }

    pub fn log(&mut self, args: core::fmt::Arguments<'_>) {
        self.manager.log(&mut self.broker, args);
    }

    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn state(&self) -> LinkState {
        self.manager.state()
    }

    pub fn stats(&self) -> LinkStats {
        self.manager.stats()
    }

    pub fn updates(&self) -> &UpdateChannel {
        &self.updates
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }
}

impl<B: BrokerPort, H: Copy> crate::mqtt::NodeServices for NodeRuntime<B, H> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        NodeRuntime::publish(self, topic, payload)
    }

    fn log(&mut self, args: core::fmt::Arguments<'_>) {
        NodeRuntime::log(self, args);
    }
}

/// A unit of node behaviour driven by the main loop. Tasks sample
/// sensors or actuate outputs on their own cadence using the shared
/// monotonic clock, and publish through the node services handle.
pub trait Task {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn run_cycle(&mut self, now_ms: u32, node: &mut dyn crate::mqtt::NodeServices);
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::adapters::storage::{MemAnchorSource, MemConfigSource};
    use crate::config::tests_support::FULL_DOC;
    use crate::mqtt::sim::SimBroker;
    use crate::mqtt::NodeServices;

    const PEM: &[u8] = b"-----BEGIN CERTIFICATE-----\nAA==\n-----END CERTIFICATE-----\n";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Token {
        Door,
    }

    struct NullDelegate;

    impl MessageDelegate<Token> for NullDelegate {
        fn on_message(
            &mut self,
            _handler: Token,
            _topic: &str,
            _payload: &[u8],
            _node: &mut dyn NodeServices,
        ) {
        }
    }

    fn bring_up() -> NodeRuntime<SimBroker, Token> {
        NodeRuntime::init(
            RuntimeOptions::default(),
            &MemConfigSource::from_json(FULL_DOC.as_bytes()),
            &MemAnchorSource::from_pem(PEM),
            SimBroker::new(),
        )
        .unwrap()
    }

    #[test]
    fn init_configures_broker_endpoint_and_anchor() {
        let rt = bring_up();
        assert_eq!(
            rt.broker().broker_host,
            Some(("broker.lan".to_string(), 8883))
        );
        assert_eq!(rt.broker().anchor_len, PEM.len());
        assert_eq!(rt.state(), LinkState::Disconnected);
    }

    #[test]
    fn first_cycle_connects_and_subscribes_bindings() {
        let mut rt = bring_up();
        rt.subscribe("door/config", Token::Door).unwrap();

        rt.run_cycle(&mut NullDelegate);

        assert_eq!(rt.state(), LinkState::Connected);
        assert_eq!(rt.broker().subscribed, vec!["door/config"]);
        assert_eq!(rt.updates().services(), 1);
    }

    #[test]
    fn update_channel_is_serviced_every_cycle() {
        let mut rt = bring_up();
        rt.run_cycle(&mut NullDelegate);
        rt.run_cycle(&mut NullDelegate);
        rt.run_cycle(&mut NullDelegate);
        assert_eq!(rt.updates().services(), 3);
    }

    #[test]
    fn publish_before_connect_fails_and_is_counted() {
        let mut rt = bring_up();
        assert!(!rt.publish("sonar/state", b"42"));
        assert_eq!(rt.stats().publish_failures, 1);
    }
}

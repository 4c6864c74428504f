//! Connection manager — the reconnect state machine and inbound dispatch.

use core::fmt;

use log::{info, warn};

use crate::config::{NodeConfig, NAME_CAPACITY, SECRET_CAPACITY};
use crate::diagnostics::LineBuf;
use crate::registry::{TopicRegistry, MAX_TOPIC_LEN};

use super::{BrokerPort, MessageDelegate, NodeLink};

/// Session state against the upstream broker.
///
/// No separate "authenticating" state is distinguished: the connect
/// call is blocking and resolves to `Connected` or back to
/// `Disconnected` within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Session counters, exposed for telemetry and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Failed blocking connect attempts.
    pub connect_failures: u32,
    /// Successful connects (first connect included).
    pub connects: u32,
    /// Inbound messages with no registry binding.
    pub unknown_topics: u32,
    /// Publishes the transport did not accept.
    pub publish_failures: u32,
}

/// Owns the broker session lifecycle: one blocking connect attempt per
/// tick while disconnected, deterministic resubscribe on every
/// (re)connect, and synchronous dispatch of inbound messages.
pub struct ConnectionManager {
    state: LinkState,
    client_id: heapless::String<NAME_CAPACITY>,
    user: heapless::String<NAME_CAPACITY>,
    password: heapless::String<SECRET_CAPACITY>,
    log_topic: heapless::String<MAX_TOPIC_LEN>,
    stats: LinkStats,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            state: LinkState::Disconnected,
            client_id: heapless::String::new(),
            user: heapless::String::new(),
            password: heapless::String::new(),
            log_topic: heapless::String::new(),
            stats: LinkStats::default(),
        }
    }

    /// Adopt session identity and credentials from the loaded config.
    /// The per-node log topic is `<hostname>/log`.
    pub fn configure(&mut self, config: &NodeConfig) {
        self.client_id = config.hostname.clone();
        self.user = config.mqtt_user.clone();
        self.password = config.mqtt_password.clone();

        self.log_topic.clear();
        // hostname capacity + "/log" always fits MAX_TOPIC_LEN
        let _ = fmt::Write::write_fmt(
            &mut self.log_topic,
            format_args!("{}/log", config.hostname),
        );
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Drive one tick of the session state machine.
    ///
    /// Disconnected: one blocking connect attempt; on success,
    /// resubscribe every registry binding in prepend order. On failure,
    /// log the broker code plus the transport's handshake error and
    /// leave the retry to the next tick. There is deliberately no
    /// backoff: with the main loop's tick rate reconnect attempts can
    /// hot-loop against a dead broker (recorded product decision).
    ///
    /// Connected: pump inbound once, dispatching each message through
    /// the registry to `delegate`; transport loss at any point drops
    /// the state back to Disconnected.
    pub fn tick<B: BrokerPort, H: Copy>(
        &mut self,
        broker: &mut B,
        registry: &TopicRegistry<H>,
        delegate: &mut dyn MessageDelegate<H>,
    ) {
        match self.state {
            LinkState::Disconnected | LinkState::Connecting => {
                self.try_connect(broker, registry);
            }
            LinkState::Connected => {
                self.pump(broker, registry, delegate);
            }
        }
    }

    fn try_connect<B: BrokerPort, H: Copy>(
        &mut self,
        broker: &mut B,
        registry: &TopicRegistry<H>,
    ) {
        info!("connecting to MQTT broker...");
        self.state = LinkState::Connecting;

        match broker.connect(&self.client_id, &self.user, &self.password) {
            Ok(()) => {
                self.state = LinkState::Connected;
                self.stats.connects += 1;
                self.log(broker, format_args!("connected to MQTT broker"));
                for topic in registry.topics() {
                    self.log(broker, format_args!("subscribing to {}", topic));
                    if !broker.subscribe(topic) {
                        warn!("subscribe to {} not accepted", topic);
                    }
                }
            }
            Err(e) => {
                self.state = LinkState::Disconnected;
                self.stats.connect_failures += 1;
                self.log(
                    broker,
                    format_args!("connecting to MQTT broker failed. {}", e),
                );
            }
        }
    }

    fn pump<B: BrokerPort, H: Copy>(
        &mut self,
        broker: &mut B,
        registry: &TopicRegistry<H>,
        delegate: &mut dyn MessageDelegate<H>,
    ) {
        if !broker.is_connected() {
            self.state = LinkState::Disconnected;
            warn!("MQTT connection lost");
            return;
        }

        while let Some(msg) = broker.poll() {
            match registry.resolve(msg.topic.as_str()) {
                Some(handler) => {
                    let mut link = NodeLink::new(broker, self.log_topic.as_str(), true);
                    delegate.on_message(handler, msg.topic.as_str(), &msg.payload, &mut link);
                }
                None => {
                    self.stats.unknown_topics += 1;
                    self.log(
                        broker,
                        format_args!("received unknown topic {}", msg.topic),
                    );
                }
            }
        }

        if !broker.is_connected() {
            self.state = LinkState::Disconnected;
        }
    }

    /// Fire-and-forget publish. Failures are logged and counted; the
    /// caller decides whether a failed publish is significant.
    pub fn publish<B: BrokerPort>(&mut self, broker: &mut B, topic: &str, payload: &[u8]) -> bool {
        if broker.publish(topic, payload) {
            return true;
        }
        self.stats.publish_failures += 1;
        warn!("failed to publish {}", topic);
        false
    }

    /// Write a bounded line to the local diagnostic sink; when the
    /// session is up, additionally best-effort publish it to the
    /// per-node log topic. Never blocks on the publish; a failed log
    /// publish is silently dropped.
    pub fn log<B: BrokerPort>(&mut self, broker: &mut B, args: fmt::Arguments<'_>) {
        let line = LineBuf::format(args);
        info!("{}", line.as_str());
        if self.state == LinkState::Connected {
            let _ = broker.publish(&self.log_topic, line.as_bytes());
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::mqtt::sim::SimBroker;
    use crate::mqtt::NodeServices;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Token {
        Door,
        Light,
    }

    /// Delegate that records every dispatch.
    struct Recorder {
        calls: Vec<(Token, String, Vec<u8>)>,
    }

    impl Recorder {
        fn new() -> Self {
            Self { calls: Vec::new() }
        }
    }

    impl MessageDelegate<Token> for Recorder {
        fn on_message(
            &mut self,
            handler: Token,
            topic: &str,
            payload: &[u8],
            _node: &mut dyn NodeServices,
        ) {
            self.calls.push((handler, topic.to_string(), payload.to_vec()));
        }
    }

    fn configured_manager() -> ConnectionManager {
        let cfg = crate::config::NodeConfig::from_json(
            br#"{
                "hostname": "garage",
                "mqttBrokerHostname": "broker.lan",
                "mqttPort": 8883,
                "mqttUser": "garage",
                "mqttPassword": "pw",
                "otaPort": 8266,
                "otaPasswordHash": "00",
                "ssid": "net",
                "wifiPassword": "secret"
            }"#,
        )
        .unwrap();
        let mut mgr = ConnectionManager::new();
        mgr.configure(&cfg);
        mgr
    }

    #[test]
    fn log_topic_is_per_node() {
        let mgr = configured_manager();
        assert_eq!(mgr.log_topic.as_str(), "garage/log");
    }

    #[test]
    fn connects_and_resubscribes_in_prepend_order() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::new();
        let mut registry: TopicRegistry<Token> = TopicRegistry::new();
        registry.subscribe("door/config", Token::Door).unwrap();
        registry.subscribe("light/config", Token::Light).unwrap();
        let mut delegate = Recorder::new();

        mgr.tick(&mut broker, &registry, &mut delegate);

        assert_eq!(mgr.state(), LinkState::Connected);
        assert_eq!(broker.subscribed, vec!["light/config", "door/config"]);
        assert_eq!(broker.connect_attempts, 1);
    }

    #[test]
    fn failed_connect_is_retried_next_tick() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::accept_on_attempt(2);
        let registry: TopicRegistry<Token> = TopicRegistry::new();
        let mut delegate = Recorder::new();

        mgr.tick(&mut broker, &registry, &mut delegate);
        assert_eq!(mgr.state(), LinkState::Disconnected);
        assert_eq!(mgr.stats().connect_failures, 1);

        mgr.tick(&mut broker, &registry, &mut delegate);
        assert_eq!(mgr.state(), LinkState::Connected);
        assert_eq!(mgr.stats().connects, 1);
    }

    #[test]
    fn dispatches_to_most_recent_duplicate_binding() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::new();
        let mut registry: TopicRegistry<Token> = TopicRegistry::new();
        registry.subscribe("a", Token::Door).unwrap();
        registry.subscribe("b", Token::Light).unwrap();
        registry.subscribe("a", Token::Light).unwrap(); // shadows Door
        let mut delegate = Recorder::new();

        mgr.tick(&mut broker, &registry, &mut delegate); // connect
        broker.inject("a", b"{}");
        mgr.tick(&mut broker, &registry, &mut delegate); // pump

        assert_eq!(delegate.calls.len(), 1);
        assert_eq!(delegate.calls[0].0, Token::Light);
        assert_eq!(delegate.calls[0].1, "a");
    }

    #[test]
    fn unknown_topic_logs_one_diagnostic_and_continues() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::new();
        let registry: TopicRegistry<Token> = TopicRegistry::new();
        let mut delegate = Recorder::new();

        mgr.tick(&mut broker, &registry, &mut delegate); // connect
        broker.inject("c", b"x");
        mgr.tick(&mut broker, &registry, &mut delegate); // pump

        assert!(delegate.calls.is_empty());
        assert_eq!(mgr.stats().unknown_topics, 1);
        assert_eq!(mgr.state(), LinkState::Connected);
    }

    #[test]
    fn transport_loss_drops_to_disconnected() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::new();
        let registry: TopicRegistry<Token> = TopicRegistry::new();
        let mut delegate = Recorder::new();

        mgr.tick(&mut broker, &registry, &mut delegate);
        assert_eq!(mgr.state(), LinkState::Connected);

        broker.drop_link();
        mgr.tick(&mut broker, &registry, &mut delegate);
        assert_eq!(mgr.state(), LinkState::Disconnected);
    }

    #[test]
    fn reconnect_resubscribes_every_binding_exactly_once() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::new();
        let mut registry: TopicRegistry<Token> = TopicRegistry::new();
        registry.subscribe("a", Token::Door).unwrap();
        registry.subscribe("b", Token::Light).unwrap();
        registry.subscribe("a", Token::Light).unwrap();
        let mut delegate = Recorder::new();

        mgr.tick(&mut broker, &registry, &mut delegate); // connect #1
        broker.subscribed.clear();

        broker.drop_link();
        mgr.tick(&mut broker, &registry, &mut delegate); // observe loss
        mgr.tick(&mut broker, &registry, &mut delegate); // reconnect

        assert_eq!(mgr.state(), LinkState::Connected);
        assert_eq!(broker.subscribed, vec!["a", "b", "a"]);
    }

    #[test]
    fn publish_failure_is_counted_not_fatal() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::new();
        broker.reject_publishes();

        assert!(!mgr.publish(&mut broker, "sonar/state", b"42"));
        assert_eq!(mgr.stats().publish_failures, 1);
    }

    #[test]
    fn log_publishes_to_log_topic_only_when_connected() {
        let mut mgr = configured_manager();
        let mut broker = SimBroker::new();
        let registry: TopicRegistry<Token> = TopicRegistry::new();
        let mut delegate = Recorder::new();

        mgr.log(&mut broker, format_args!("before connect"));
        assert!(broker.published.is_empty());

        mgr.tick(&mut broker, &registry, &mut delegate);
        broker.published.clear();
        mgr.log(&mut broker, format_args!("after connect"));
        assert_eq!(broker.published.len(), 1);
        assert_eq!(broker.published[0].0, "garage/log");
        assert_eq!(broker.published[0].1, b"after connect");
    }
}

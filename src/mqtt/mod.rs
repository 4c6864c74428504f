//! MQTT session layer.
//!
//! [`BrokerPort`] is the hexagonal boundary for the publish/subscribe
//! transport. The real ESP-IDF client lives behind
//! `#[cfg(target_os = "espidf")]`; all other targets get the scripted
//! [`sim::SimBroker`] used by the integration tests.
//!
//! [`ConnectionManager`] drives the reconnect state machine over any
//! `BrokerPort` and routes inbound messages through the
//! [`TopicRegistry`](crate::registry::TopicRegistry) to a
//! [`MessageDelegate`] owned by the composition root.

use core::fmt;

use crate::adapters::cert_store::TrustAnchor;
use crate::diagnostics::LineBuf;
use crate::error::Result;
use crate::registry::MAX_TOPIC_LEN;

pub mod manager;

#[cfg(target_os = "espidf")]
pub mod esp_impl;
#[cfg(not(target_os = "espidf"))]
pub mod sim;

pub use manager::{ConnectionManager, LinkState, LinkStats};

/// Maximum inbound payload retained per message; longer payloads are
/// truncated by the transport adapter.
pub const MAX_INBOUND_PAYLOAD: usize = 128;

/// One inbound message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: heapless::String<MAX_TOPIC_LEN>,
    pub payload: heapless::Vec<u8, MAX_INBOUND_PAYLOAD>,
}

/// Why a blocking connect attempt failed: the broker-level status code
/// plus the secure transport's last handshake error string. Both go
/// into the retry diagnostic verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectError {
    pub code: i16,
    pub handshake: heapless::String<96>,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MQTT error={} TLS error='{}'", self.code, self.handshake)
    }
}

/// Transport boundary for the publish/subscribe session.
///
/// `connect` is blocking from the runtime's perspective: it returns
/// success or failure, possibly after the transport's internal timeout.
/// `subscribe` and `publish` are best-effort single attempts.
pub trait BrokerPort {
    /// Point the transport at the broker and hand over the trust anchor.
    /// Called once during `init`, before the first connect attempt.
    fn set_broker(&mut self, host: &str, port: u16, anchor: &TrustAnchor) -> Result<()>;

    /// One blocking connect attempt with the node's session identity.
    fn connect(&mut self, client_id: &str, user: &str, password: &str)
        -> core::result::Result<(), ConnectError>;

    /// Whether the transport currently holds a live session.
    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> bool;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;

    /// Pump the inbound loop once; `None` when no message is pending.
    fn poll(&mut self) -> Option<InboundMessage>;
}

/// Node-side services available to task modules and message handlers:
/// best-effort publish and bounded diagnostic logging.
pub trait NodeServices {
    /// Fire-and-forget publish. The return value reports transport
    /// acceptance; the runtime never retries on the caller's behalf.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;

    /// Write a line to the diagnostic sink and, when connected,
    /// best-effort publish it to the per-node log topic. Lines are
    /// truncated to the fixed outbound buffer.
    fn log(&mut self, args: fmt::Arguments<'_>);
}

/// Inbound-message routing, implemented by the composition root.
///
/// The connection manager resolves a topic to a handler token `H` and
/// invokes this synchronously with the raw payload. Handlers may
/// publish and log through `node`.
pub trait MessageDelegate<H: Copy> {
    fn on_message(&mut self, handler: H, topic: &str, payload: &[u8], node: &mut dyn NodeServices);
}

/// Short-lived [`NodeServices`] view over a connected transport,
/// constructed by the connection manager for the duration of one
/// handler invocation.
pub struct NodeLink<'a, B: BrokerPort> {
    broker: &'a mut B,
    log_topic: &'a str,
    connected: bool,
}

impl<'a, B: BrokerPort> NodeLink<'a, B> {
    pub(crate) fn new(broker: &'a mut B, log_topic: &'a str, connected: bool) -> Self {
        Self {
            broker,
            log_topic,
            connected,
        }
    }
}

impl<B: BrokerPort> NodeServices for NodeLink<'_, B> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        let ok = self.broker.publish(topic, payload);
        if !ok {
            log::warn!("failed to publish {}", topic);
        }
        ok
    }

    fn log(&mut self, args: fmt::Arguments<'_>) {
        let line = LineBuf::format(args);
        log::info!("{}", line.as_str());
        if self.connected {
            // Best effort; a failed log publish is dropped silently to
            // avoid recursive failure reporting.
            let _ = self.broker.publish(self.log_topic, line.as_bytes());
        }
    }
}

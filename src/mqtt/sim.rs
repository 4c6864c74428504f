//! Scripted broker backend for host-side tests and simulation.
//!
//! Deterministic stand-in for the ESP-IDF transport: connect outcomes
//! are scripted per attempt, subscribes and publishes are recorded, and
//! inbound messages are injected by the test.

use std::collections::VecDeque;

use crate::adapters::cert_store::TrustAnchor;
use crate::error::Result;

use super::{BrokerPort, ConnectError, InboundMessage, MAX_INBOUND_PAYLOAD};

pub struct SimBroker {
    /// Connect attempts succeed from this attempt number onward (1-based).
    accept_from: u32,
    pub connect_attempts: u32,
    connected: bool,
    accept_publishes: bool,
    /// Subscribed topics in call order, cleared by tests as needed.
    pub subscribed: Vec<String>,
    /// Published (topic, payload) pairs in call order.
    pub published: Vec<(String, Vec<u8>)>,
    inbound: VecDeque<InboundMessage>,
    pub broker_host: Option<(String, u16)>,
    pub anchor_len: usize,
}

impl SimBroker {
    /// A broker that accepts the first connect attempt.
    pub fn new() -> Self {
        Self::accept_on_attempt(1)
    }

    /// A broker that rejects connect attempts before the `n`th.
    pub fn accept_on_attempt(n: u32) -> Self {
        Self {
            accept_from: n,
            connect_attempts: 0,
            connected: false,
            accept_publishes: true,
            subscribed: Vec::new(),
            published: Vec::new(),
            inbound: VecDeque::new(),
            broker_host: None,
            anchor_len: 0,
        }
    }

    /// Queue an inbound message for the next pump.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        let mut t = heapless::String::new();
        t.push_str(topic).expect("test topic fits");
        let mut p = heapless::Vec::new();
        p.extend_from_slice(&payload[..payload.len().min(MAX_INBOUND_PAYLOAD)])
            .expect("test payload fits");
        self.inbound.push_back(InboundMessage {
            topic: t,
            payload: p,
        });
    }

    /// Simulate transport loss.
    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    /// Make subsequent publishes fail at the transport.
    pub fn reject_publishes(&mut self) {
        self.accept_publishes = false;
    }
}

impl Default for SimBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerPort for SimBroker {
    fn set_broker(&mut self, host: &str, port: u16, anchor: &TrustAnchor) -> Result<()> {
        self.broker_host = Some((host.to_string(), port));
        self.anchor_len = anchor.pem().len();
        Ok(())
    }

    fn connect(
        &mut self,
        _client_id: &str,
        _user: &str,
        _password: &str,
    ) -> core::result::Result<(), ConnectError> {
        self.connect_attempts += 1;
        if self.connect_attempts >= self.accept_from {
            self.connected = true;
            Ok(())
        } else {
            let mut handshake = heapless::String::new();
            let _ = handshake.push_str("handshake refused (sim)");
            Err(ConnectError {
                code: -2,
                handshake,
            })
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        if !self.connected {
            return false;
        }
        self.subscribed.push(topic.to_string());
        true
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        if !self.connected || !self.accept_publishes {
            return false;
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        true
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        if !self.connected {
            return None;
        }
        self.inbound.pop_front()
    }
}

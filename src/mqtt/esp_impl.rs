//! ESP-IDF broker transport — TLS MQTT via `esp_idf_svc`.
//!
//! The esp-mqtt client delivers connection state and inbound messages
//! through a callback on its own task; this adapter funnels them into
//! an atomic flag plus a bounded channel so the cooperative main loop
//! can stay single-threaded. The trust anchor is handed to mbedTLS as
//! the server CA; certificate validity checking is why `init` syncs
//! wall-clock time before the first connect.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use esp_idf_svc::tls::X509;
use log::warn;

use crate::adapters::cert_store::TrustAnchor;
use crate::error::{Error, Result};

use super::{BrokerPort, ConnectError, InboundMessage, MAX_INBOUND_PAYLOAD};

/// Inbound messages buffered between main-loop ticks.
const INBOUND_QUEUE_DEPTH: usize = 8;
/// How long one blocking connect attempt waits for the CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

pub struct EspBroker {
    url: Option<String>,
    // PEM handed to mbedTLS; leaked once per boot so the X509 reference
    // stays valid for the client's lifetime.
    anchor_pem: Option<&'static core::ffi::CStr>,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
    last_tls_error: Arc<Mutex<String>>,
    inbound_rx: Option<Receiver<InboundMessage>>,
}

impl EspBroker {
    pub fn new() -> Self {
        Self {
            url: None,
            anchor_pem: None,
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            last_tls_error: Arc::new(Mutex::new(String::new())),
            inbound_rx: None,
        }
    }
}

impl Default for EspBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerPort for EspBroker {
    fn set_broker(&mut self, host: &str, port: u16, anchor: &TrustAnchor) -> Result<()> {
        self.url = Some(format!("mqtts://{host}:{port}"));
        let pem = CString::new(anchor.pem().to_vec()).map_err(|_| Error::Init("anchor PEM"))?;
        self.anchor_pem = Some(Box::leak(pem.into_boxed_c_str()));
        Ok(())
    }

    fn connect(
        &mut self,
        client_id: &str,
        user: &str,
        password: &str,
    ) -> core::result::Result<(), ConnectError> {
        let transport_error = |detail: &str| {
            let mut handshake = heapless::String::new();
            for ch in detail.chars() {
                if handshake.push(ch).is_err() {
                    break;
                }
            }
            ConnectError {
                code: -2,
                handshake,
            }
        };

        let (Some(url), Some(pem)) = (self.url.as_deref(), self.anchor_pem) else {
            return Err(transport_error("broker not configured"));
        };

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: Some(user),
            password: Some(password),
            server_certificate: Some(X509::pem(pem)),
            ..Default::default()
        };

        let connected = Arc::clone(&self.connected);
        let last_tls_error = Arc::clone(&self.last_tls_error);
        let (tx, rx): (SyncSender<InboundMessage>, _) = sync_channel(INBOUND_QUEUE_DEPTH);
        let (conn_tx, conn_rx) = sync_channel::<bool>(1);

        connected.store(false, Ordering::Release);

        let client = EspMqttClient::new_cb(url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                connected.store(true, Ordering::Release);
                let _ = conn_tx.try_send(true);
            }
            EventPayload::Disconnected => {
                connected.store(false, Ordering::Release);
            }
            EventPayload::Error(e) => {
                if let Ok(mut slot) = last_tls_error.lock() {
                    *slot = format!("{e:?}");
                }
                let _ = conn_tx.try_send(false);
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => {
                let mut t = heapless::String::new();
                if t.push_str(topic).is_err() {
                    warn!("inbound topic too long, dropped");
                    return;
                }
                let mut p = heapless::Vec::new();
                let take = data.len().min(MAX_INBOUND_PAYLOAD);
                let _ = p.extend_from_slice(&data[..take]);
                match tx.try_send(InboundMessage { topic: t, payload: p }) {
                    Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                    Err(TrySendError::Full(_)) => warn!("inbound queue full, message dropped"),
                }
            }
            _ => {}
        })
        .map_err(|e| transport_error(&format!("client init: {e}")))?;

        // Block until CONNACK or the first error, bounded by the
        // transport timeout; the runtime treats connect as blocking.
        match conn_rx.recv_timeout(CONNECT_TIMEOUT) {
            Ok(true) => {
                self.client = Some(client);
                self.inbound_rx = Some(rx);
                Ok(())
            }
            Ok(false) => {
                let detail = self
                    .last_tls_error
                    .lock()
                    .map(|s| s.clone())
                    .unwrap_or_default();
                Err(transport_error(&detail))
            }
            Err(_) => Err(transport_error("connect timed out")),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        match self.client.as_mut() {
            Some(c) => c.subscribe(topic, QoS::AtMostOnce).is_ok(),
            None => false,
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.client.as_mut() {
            Some(c) => c
                .publish(topic, QoS::AtMostOnce, false, payload)
                .is_ok(),
            None => false,
        }
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        self.inbound_rx.as_ref()?.try_recv().ok()
    }
}

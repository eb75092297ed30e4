//! In-memory bus broker
//!
//! Mock implementation for unit tests and broker-less runs, supporting
//! failure-scenario injection: failing the next N connect attempts and
//! severing every live connection mid-stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::QosLevel;
use tokio::sync::{mpsc, watch};
use tracing::{debug, instrument, trace};

use crate::client::{BusConnection, BusConnector, BusMessage};
use crate::error::ConnectionError;
use crate::topic::topic_matches;

/// Shared in-memory broker
///
/// Cloning shares the broker; every connector and connection created from
/// one `MemoryBus` sees the same topic space.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<Mutex<BrokerInner>>,
}

#[derive(Default)]
struct BrokerInner {
    subscriptions: Vec<Subscription>,
    sessions: HashMap<u64, watch::Sender<bool>>,
    next_session_id: u64,
    fail_next_connects: u32,
}

struct Subscription {
    session_id: u64,
    filter: String,
    tx: mpsc::UnboundedSender<BusMessage>,
}

impl MemoryBus {
    /// Create an empty broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector for one leg of this broker
    pub fn connector(&self, leg: impl Into<String>) -> MemoryConnector {
        MemoryConnector {
            bus: self.clone(),
            leg: leg.into(),
        }
    }

    /// Fail the next `n` connect attempts with a transport error
    pub fn fail_next_connects(&self, n: u32) {
        self.lock().fail_next_connects = n;
    }

    /// Sever every live connection, simulating a broker outage.
    ///
    /// Severed sessions fail their next recv/publish with
    /// `ConnectionLost`; new connects succeed.
    #[instrument(name = "memory_bus_sever_all", skip(self))]
    pub fn sever_all(&self) {
        let mut inner = self.lock();
        for sender in inner.sessions.values() {
            let _ = sender.send(true);
        }
        inner.sessions.clear();
        inner.subscriptions.clear();
        debug!("all in-memory bus sessions severed");
    }

    /// Publish directly into the broker, bypassing any connection.
    ///
    /// Used by the synthetic telemetry source and by tests.
    pub fn publish(&self, topic: &str, payload: impl Into<Bytes>) {
        let payload = payload.into();
        let inner = self.lock();
        for sub in &inner.subscriptions {
            if topic_matches(&sub.filter, topic) {
                let _ = sub.tx.send(BusMessage::new(topic, payload.clone()));
            }
        }
    }

    /// Current live session count
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_session(&self, leg: &str) -> Result<MemoryConnection, ConnectionError> {
        let mut inner = self.lock();
        if inner.fail_next_connects > 0 {
            inner.fail_next_connects -= 1;
            return Err(ConnectionError::connect_failed(
                leg,
                "injected connect failure",
            ));
        }

        let session_id = inner.next_session_id;
        inner.next_session_id += 1;

        let (severed_tx, severed_rx) = watch::channel(false);
        inner.sessions.insert(session_id, severed_tx);

        let (tx, rx) = mpsc::unbounded_channel();

        Ok(MemoryConnection {
            bus: self.clone(),
            session_id,
            leg: leg.to_string(),
            tx,
            rx,
            severed: severed_rx,
        })
    }

    fn add_subscription(
        &self,
        session_id: u64,
        filter: &str,
        tx: mpsc::UnboundedSender<BusMessage>,
    ) -> Result<(), ConnectionError> {
        let mut inner = self.lock();
        if !inner.sessions.contains_key(&session_id) {
            return Err(ConnectionError::subscribe_failed(filter, "session severed"));
        }
        inner.subscriptions.push(Subscription {
            session_id,
            filter: filter.to_string(),
            tx,
        });
        Ok(())
    }

    fn close_session(&self, session_id: u64) {
        let mut inner = self.lock();
        inner.sessions.remove(&session_id);
        inner.subscriptions.retain(|s| s.session_id != session_id);
    }
}

/// Connector for one leg of a MemoryBus
#[derive(Clone)]
pub struct MemoryConnector {
    bus: MemoryBus,
    leg: String,
}

impl BusConnector for MemoryConnector {
    type Connection = MemoryConnection;

    fn leg(&self) -> &str {
        &self.leg
    }

    async fn connect(&self) -> Result<MemoryConnection, ConnectionError> {
        self.bus.open_session(&self.leg)
    }
}

/// One live in-memory session
pub struct MemoryConnection {
    bus: MemoryBus,
    session_id: u64,
    leg: String,
    tx: mpsc::UnboundedSender<BusMessage>,
    rx: mpsc::UnboundedReceiver<BusMessage>,
    severed: watch::Receiver<bool>,
}

impl MemoryConnection {
    fn is_severed(&self) -> bool {
        *self.severed.borrow()
    }
}

impl BusConnection for MemoryConnection {
    async fn subscribe(&mut self, filter: &str) -> Result<(), ConnectionError> {
        if self.is_severed() {
            return Err(ConnectionError::subscribe_failed(filter, "session severed"));
        }
        trace!(leg = %self.leg, filter = %filter, "memory bus subscribe");
        self.bus
            .add_subscription(self.session_id, filter, self.tx.clone())
    }

    async fn recv(&mut self) -> Result<BusMessage, ConnectionError> {
        loop {
            if self.is_severed() {
                return Err(ConnectionError::lost("session severed"));
            }
            tokio::select! {
                msg = self.rx.recv() => {
                    return msg.ok_or_else(|| ConnectionError::lost("broker gone"));
                }
                changed = self.severed.changed() => {
                    if changed.is_err() || self.is_severed() {
                        return Err(ConnectionError::lost("session severed"));
                    }
                }
            }
        }
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: Bytes,
        _qos: QosLevel,
    ) -> Result<(), ConnectionError> {
        if self.is_severed() {
            return Err(ConnectionError::publish_failed(topic, "session severed"));
        }
        self.bus.publish(topic, payload);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ConnectionError> {
        self.bus.close_session(self.session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = MemoryBus::new();
        let connector = bus.connector("uncurated");

        let mut conn = connector.connect().await.unwrap();
        conn.subscribe("raw/#").await.unwrap();

        bus.publish("raw/line1/temp", &b"{\"v\":1}"[..]);

        let msg = conn.recv().await.unwrap();
        assert_eq!(msg.topic, "raw/line1/temp");
        assert_eq!(&msg.payload[..], b"{\"v\":1}");
    }

    #[tokio::test]
    async fn test_filter_excludes_non_matching() {
        let bus = MemoryBus::new();
        let mut conn = bus.connector("uncurated").connect().await.unwrap();
        conn.subscribe("raw/+/temp").await.unwrap();

        bus.publish("other/line1/temp", &b"x"[..]);
        bus.publish("raw/line1/temp", &b"y"[..]);

        let msg = conn.recv().await.unwrap();
        assert_eq!(&msg.payload[..], b"y");
    }

    #[tokio::test]
    async fn test_fail_next_connects() {
        let bus = MemoryBus::new();
        bus.fail_next_connects(2);
        let connector = bus.connector("uncurated");

        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_ok());
    }

    #[tokio::test]
    async fn test_sever_all_breaks_recv() {
        let bus = MemoryBus::new();
        let mut conn = bus.connector("uncurated").connect().await.unwrap();
        conn.subscribe("#").await.unwrap();

        let bus_clone = bus.clone();
        let recv_task = tokio::spawn(async move { conn.recv().await });

        // Give the recv a chance to park before severing
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        bus_clone.sever_all();

        let result = recv_task.await.unwrap();
        assert!(matches!(result, Err(ConnectionError::ConnectionLost { .. })));
    }

    #[tokio::test]
    async fn test_sever_then_reconnect_succeeds() {
        let bus = MemoryBus::new();
        let mut conn = bus.connector("uncurated").connect().await.unwrap();
        conn.subscribe("#").await.unwrap();
        bus.sever_all();

        let mut publish_result = conn
            .publish("raw/x", Bytes::from_static(b"p"), QosLevel::AtMostOnce)
            .await;
        assert!(publish_result.is_err());

        // A new session works again
        let mut fresh = bus.connector("uncurated").connect().await.unwrap();
        fresh.subscribe("#").await.unwrap();
        publish_result = fresh
            .publish("raw/x", Bytes::from_static(b"p"), QosLevel::AtMostOnce)
            .await;
        assert!(publish_result.is_ok());
        let msg = fresh.recv().await.unwrap();
        assert_eq!(msg.topic, "raw/x");
    }

    #[tokio::test]
    async fn test_disconnect_removes_session() {
        let bus = MemoryBus::new();
        let mut conn = bus.connector("uncurated").connect().await.unwrap();
        assert_eq!(bus.session_count(), 1);
        conn.disconnect().await.unwrap();
        assert_eq!(bus.session_count(), 0);
    }
}

//! Bus client abstraction
//!
//! Defines traits for interacting with the message bus, supporting a real
//! broker implementation and the in-memory broker for tests. The pipeline
//! only ever sees these traits; wire framing belongs to the client library
//! behind them.

use std::future::Future;

use bytes::Bytes;
use contracts::{QosLevel, TopicPath};

use crate::error::ConnectionError;

/// One message as delivered by a subscription
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Topic the message was published on
    pub topic: TopicPath,

    /// Payload bytes as published (zero copy)
    pub payload: Bytes,
}

impl BusMessage {
    /// Create a BusMessage
    pub fn new(topic: impl Into<TopicPath>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Live bus connection trait
///
/// One value represents one connected session. Any returned
/// `ConnectionError` means the session is dead and must be re-established
/// through the owning `BusConnector`.
#[trait_variant::make(BusConnection: Send)]
pub trait LocalBusConnection {
    /// Subscribe to a topic filter (MQTT-style `+` / `#` wildcards)
    async fn subscribe(&mut self, filter: &str) -> Result<(), ConnectionError>;

    /// Await the next message on any active subscription
    async fn recv(&mut self) -> Result<BusMessage, ConnectionError>;

    /// Publish a payload at the given quality-of-service level (no retain)
    async fn publish(
        &mut self,
        topic: &str,
        payload: Bytes,
        qos: QosLevel,
    ) -> Result<(), ConnectionError>;

    /// Close the session
    async fn disconnect(&mut self) -> Result<(), ConnectionError>;
}

/// Bus connector trait
///
/// Abstracts session establishment for one bus leg. The reconnect loop
/// calls `connect` again after every transport error; connectors are cheap
/// handles that can be cloned into tasks.
pub trait BusConnector: Send + Sync {
    /// Connection type produced by this connector
    type Connection: BusConnection + Send + 'static;

    /// Leg name (used for logging/metrics), e.g. "uncurated" or "curated"
    fn leg(&self) -> &str;

    /// Establish a new session
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, ConnectionError>> + Send;
}

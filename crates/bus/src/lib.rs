//! # Bus
//!
//! Message-bus client abstraction.
//!
//! Responsibilities:
//! - `BusConnector` / `BusConnection` traits decoupling the pipeline from
//!   the wire protocol
//! - MQTT-style topic filter matching (`+` / `#` wildcards)
//! - Reconnect policy and connection state transitions
//! - In-memory broker with failure injection for tests and mock runs
//! - Synthetic telemetry publisher for mock-mode pipelines
//! - Optional rumqttc-backed connector (`real-mqtt` feature)

mod client;
mod error;
mod memory;
#[cfg(feature = "real-mqtt")]
mod mqtt;
mod reconnect;
mod sim;
mod topic;

pub use client::{BusConnection, BusConnector, BusMessage, LocalBusConnection};
pub use error::ConnectionError;
pub use memory::{MemoryBus, MemoryConnection, MemoryConnector};
#[cfg(feature = "real-mqtt")]
pub use mqtt::{MqttConnection, MqttConnector};
pub use reconnect::{next_phase, ConnectionEvent, ConnectionStateHandle, ReconnectPolicy};
pub use sim::{SimPublisher, SimPublisherConfig};
pub use topic::topic_matches;

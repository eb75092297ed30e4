//! # Bridge
//!
//! Dual-connection bridge/republisher.
//!
//! Responsibilities:
//! - Hold a subscriber and a publisher connection, re-established together
//!   by a fixed-backoff reconnect loop
//! - Per message: mapping-cache lookup, payload transform, republish at the
//!   configured QoS; messages without an approved mapping are dropped
//!   silently and counted
//! - Namespace variant forwarding under a downstream prefix with
//!   republish-loop exclusion
//! - Fire-and-forget lineage writes through a bounded queue that never
//!   blocks the publish path

mod lineage;
mod republisher;
mod stats;

pub use lineage::{lineage_channel, LineageHandle, LineageQueue, LineageSnapshot, LineageStats};
pub use republisher::{Bridge, BridgeConfig, BridgeHandle};
pub use stats::{BridgeSnapshot, BridgeStats};

//! Bridge metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics for a single bridge route
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Messages received from the subscriber leg
    received: AtomicU64,
    /// Messages transformed and republished
    transformed: AtomicU64,
    /// Messages dropped (no mapping, or excluded by prefix)
    dropped: AtomicU64,
    /// Completed reconnects
    reconnects: AtomicU64,
}

impl BridgeStats {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a received message
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transformed and republished message
    pub fn record_transformed(&self) {
        self.transformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped message
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed (re)connect
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Dropped message count
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Transformed message count
    pub fn transformed(&self) -> u64 {
        self.transformed.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> BridgeSnapshot {
        let received = self.received.load(Ordering::Relaxed);
        let transformed = self.transformed.load(Ordering::Relaxed);
        BridgeSnapshot {
            received,
            transformed,
            dropped: self.dropped.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            transform_rate: if received > 0 {
                transformed as f64 / received as f64
            } else {
                0.0
            },
        }
    }
}

/// Snapshot of bridge metrics (for reporting)
#[derive(Debug, Clone, Default, Serialize)]
pub struct BridgeSnapshot {
    pub received: u64,
    pub transformed: u64,
    pub dropped: u64,
    pub reconnects: u64,
    pub transform_rate: f64,
}

//! Ingestion metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::ConformanceStatus;
use serde::Serialize;

/// Metrics for the ingest queue and batch worker
#[derive(Debug, Default)]
pub struct IngestStats {
    /// Total messages accepted onto the queue
    received: AtomicU64,
    /// Total messages dropped because the queue was full
    dropped_queue_full: AtomicU64,
    /// Total batches flushed successfully
    batches_flushed: AtomicU64,
    /// Total message records written
    messages_written: AtomicU64,
    /// Total messages lost to failed batch writes
    write_errors: AtomicU64,
    /// Conformant message count
    conformant: AtomicU64,
    /// Non-conformant message count
    non_conformant: AtomicU64,
    /// Unbound message count
    unbound: AtomicU64,
    /// Current queue length
    queue_len: AtomicUsize,
}

impl IngestStats {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message accepted onto the queue
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message shed because the queue was full
    pub fn record_dropped_full(&self) {
        self.dropped_queue_full.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully flushed batch
    pub fn record_batch_flushed(&self, messages: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.messages_written
            .fetch_add(messages as u64, Ordering::Relaxed);
    }

    /// Record a failed batch write (counts every message in the batch)
    pub fn record_write_errors(&self, messages: usize) {
        self.write_errors
            .fetch_add(messages as u64, Ordering::Relaxed);
    }

    /// Record one conformance outcome
    pub fn record_conformance(&self, status: ConformanceStatus) {
        match status {
            ConformanceStatus::Conformant => self.conformant.fetch_add(1, Ordering::Relaxed),
            ConformanceStatus::NonConformant => {
                self.non_conformant.fetch_add(1, Ordering::Relaxed)
            }
            ConformanceStatus::Unbound => self.unbound.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Update current queue length
    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Messages dropped because the queue was full
    pub fn dropped_full(&self) -> u64 {
        self.dropped_queue_full.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            messages_written: self.messages_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            conformant: self.conformant.load(Ordering::Relaxed),
            non_conformant: self.non_conformant.load(Ordering::Relaxed),
            unbound: self.unbound.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of ingestion metrics (for reporting)
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSnapshot {
    pub received: u64,
    pub dropped_queue_full: u64,
    pub batches_flushed: u64,
    pub messages_written: u64,
    pub write_errors: u64,
    pub conformant: u64,
    pub non_conformant: u64,
    pub unbound: u64,
    pub queue_len: usize,
}

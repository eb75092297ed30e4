//! IngestQueue - bounded handoff between intake and batch worker
//!
//! Enqueue never blocks: when the queue is full the message is shed and
//! counted. Stalling the bus subscriber would delay newer, more relevant
//! data, so load shedding is the deliberate policy.

use std::sync::Arc;

use contracts::RawMessage;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::stats::IngestStats;

/// Create the bounded ingest channel
pub fn ingest_channel(
    capacity: usize,
    stats: Arc<IngestStats>,
) -> (IngestQueue, mpsc::Receiver<RawMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (IngestQueue { tx, stats }, rx)
}

/// Producer handle onto the bounded ingest queue
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<RawMessage>,
    stats: Arc<IngestStats>,
}

impl IngestQueue {
    /// Enqueue a message without blocking.
    ///
    /// Returns true if accepted, false if shed (queue full) or if the
    /// worker is gone.
    pub fn try_enqueue(&self, message: RawMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => {
                self.stats.record_received();
                true
            }
            Err(mpsc::error::TrySendError::Full(m)) => {
                self.stats.record_dropped_full();
                metrics::counter!("curator_ingest_dropped_total", "reason" => "queue_full")
                    .increment(1);
                warn!(topic = %m.topic, "ingest queue full, message shed");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("batch worker closed unexpectedly");
                false
            }
        }
    }

    /// Shared stats handle
    pub fn stats(&self) -> Arc<IngestStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str) -> RawMessage {
        RawMessage::new(topic, &b"{}"[..], "direct")
    }

    #[tokio::test]
    async fn test_overflow_sheds_exactly_one() {
        let stats = Arc::new(IngestStats::new());
        let capacity = 4;
        let (queue, _rx) = ingest_channel(capacity, Arc::clone(&stats));

        let mut accepted = 0;
        for i in 0..=capacity {
            if queue.try_enqueue(message(&format!("raw/{i}"))) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, capacity);
        assert_eq!(stats.dropped_full(), 1);
        assert_eq!(stats.snapshot().received, capacity as u64);
    }

    #[tokio::test]
    async fn test_closed_worker_rejects() {
        let stats = Arc::new(IngestStats::new());
        let (queue, rx) = ingest_channel(4, stats);
        drop(rx);
        assert!(!queue.try_enqueue(message("raw/x")));
    }
}

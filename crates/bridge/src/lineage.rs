//! Lineage write queue
//!
//! Fire-and-forget lineage persistence modeled as a bounded queue with its
//! own worker task: the publish path only does a non-blocking enqueue, and
//! write failures are counted where an orphaned task would hide them. On
//! shutdown the queue is drained before the worker returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{CurationStore, LineageRecord};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Metrics for the lineage writer
#[derive(Debug, Default)]
pub struct LineageStats {
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl LineageStats {
    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> LineageSnapshot {
        LineageSnapshot {
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of lineage metrics (for reporting)
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineageSnapshot {
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Producer handle onto the bounded lineage queue
#[derive(Clone)]
pub struct LineageQueue {
    tx: mpsc::Sender<LineageRecord>,
    stats: Arc<LineageStats>,
}

impl LineageQueue {
    /// Enqueue a lineage record without blocking.
    ///
    /// A full queue drops the record and counts it; lineage loss must
    /// never stall the publish path.
    pub fn try_send(&self, record: LineageRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(record)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("curator_lineage_dropped_total").increment(1);
                warn!(raw_topic = %record.raw_topic, "lineage queue full, record dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("lineage worker closed unexpectedly");
                false
            }
        }
    }

    /// Shared stats handle
    pub fn stats(&self) -> Arc<LineageStats> {
        Arc::clone(&self.stats)
    }
}

/// Handle to the running lineage worker
pub struct LineageHandle {
    task: JoinHandle<()>,
    stats: Arc<LineageStats>,
}

impl LineageHandle {
    /// Shared stats handle
    pub fn stats(&self) -> Arc<LineageStats> {
        Arc::clone(&self.stats)
    }

    /// Await worker completion.
    ///
    /// Drop every `LineageQueue` clone first; the worker drains what is
    /// queued and then returns.
    pub async fn shutdown(self) {
        if let Err(e) = self.task.await {
            error!(error = ?e, "lineage worker task panicked");
        }
        debug!("lineage worker shutdown complete");
    }
}

/// Create the lineage queue and spawn its worker
pub fn lineage_channel<S>(store: Arc<S>, capacity: usize) -> (LineageQueue, LineageHandle)
where
    S: CurationStore + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::channel::<LineageRecord>(capacity);
    let stats = Arc::new(LineageStats::default());

    let worker_stats = Arc::clone(&stats);
    let task = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            match store.insert_lineage(&record).await {
                Ok(()) => {
                    worker_stats.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    worker_stats.failed.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!("curator_lineage_failures_total").increment(1);
                    error!(
                        raw_topic = %record.raw_topic,
                        error = %e,
                        "lineage write failed"
                    );
                }
            }
        }
        debug!("lineage queue closed, worker stopped");
    });

    (
        LineageQueue {
            tx,
            stats: Arc::clone(&stats),
        },
        LineageHandle { task, stats },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use store::MemoryStore;

    fn record(raw: &str) -> LineageRecord {
        LineageRecord {
            raw_topic: raw.into(),
            curated_topic: format!("curated/{raw}").into(),
            mapping_id: "m-1".into(),
            produced_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_records_drained_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let (queue, handle) = lineage_channel(Arc::clone(&store), 16);

        for i in 0..5 {
            assert!(queue.try_send(record(&format!("raw/{i}"))));
        }
        drop(queue);
        handle.shutdown().await;

        assert_eq!(store.lineage().len(), 5);
    }

    #[tokio::test]
    async fn test_failures_counted_not_propagated() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let (queue, handle) = lineage_channel(Arc::clone(&store), 16);

        assert!(queue.try_send(record("raw/a")));
        let stats = queue.stats();
        drop(queue);
        handle.shutdown().await;

        assert_eq!(stats.snapshot().failed, 1);
        assert_eq!(stats.snapshot().written, 0);
    }

}

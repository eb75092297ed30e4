//! Retention job
//!
//! Periodic deletion of message records older than the retention window.
//! Shares the store connection; failures are logged and the next sweep
//! runs on schedule.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::CurationStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to the running retention sweep task
pub struct RetentionJob {
    task: JoinHandle<()>,
}

impl RetentionJob {
    /// Spawn the sweep task.
    ///
    /// `retention` is the record age limit; `interval` the time between
    /// sweeps.
    pub fn spawn<S>(store: Arc<S>, retention: Duration, interval: Duration) -> Self
    where
        S: CurationStore + Send + Sync + 'static,
    {
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                let cutoff = Utc::now()
                    - chrono::Duration::from_std(retention)
                        .unwrap_or_else(|_| chrono::Duration::hours(24 * 7));
                match store.purge_message_records_before(cutoff).await {
                    Ok(0) => debug!("retention sweep: nothing to purge"),
                    Ok(purged) => info!(purged, "retention sweep purged aged records"),
                    Err(e) => warn!(error = %e, "retention sweep failed"),
                }
            }
        });
        Self { task }
    }

    /// Cancel the sweep task and await its completion
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use contracts::{ConformanceStatus, MessageRecord};

    #[tokio::test(start_paused = true)]
    async fn test_retention_purges_on_schedule() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_message_records(&[MessageRecord {
                topic: "raw/a".into(),
                publisher_id: "direct".into(),
                canonical_text: String::new(),
                payload_bytes: 0,
                conformance: ConformanceStatus::Unbound,
                violations: vec![],
                received_at: Utc::now() - chrono::Duration::hours(2),
            }])
            .await
            .unwrap();

        let job = RetentionJob::spawn(
            Arc::clone(&store),
            Duration::from_secs(3600),
            Duration::from_secs(60),
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(store.record_count(), 0);

        job.stop().await;
    }
}

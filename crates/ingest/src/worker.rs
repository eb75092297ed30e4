//! Batch worker - collects queued messages and drives grouped store writes
//!
//! The loop runs Idle -> CollectingBatch -> Flushing -> Idle until the
//! queue closes. A failed batch write abandons that batch, counts its
//! messages as errors and never terminates the loop.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cache::BindingCache;
use contracts::{ConformanceResult, CurationStore, MessageRecord, RawMessage, TopicNode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

use crate::canonical::canonical_text;
use crate::stats::IngestStats;

/// Batch collection configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum messages per batch
    pub batch_size: usize,

    /// Maximum wait for the first message of a batch
    pub batch_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_timeout: Duration::from_millis(100),
        }
    }
}

/// Worker draining the ingest queue into the persistent store
pub struct BatchWorker<S> {
    rx: mpsc::Receiver<RawMessage>,
    store: Arc<S>,
    bindings: Arc<BindingCache>,
    config: BatchConfig,
    stats: Arc<IngestStats>,
}

impl<S> BatchWorker<S>
where
    S: CurationStore + Send + Sync + 'static,
{
    /// Create a worker over the given queue receiver
    pub fn new(
        rx: mpsc::Receiver<RawMessage>,
        store: Arc<S>,
        bindings: Arc<BindingCache>,
        config: BatchConfig,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            rx,
            store,
            bindings,
            config,
            stats,
        }
    }

    /// Spawn the worker as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the worker loop.
    ///
    /// Returns when the queue closes; everything still queued at that
    /// point is drained and flushed first, so a clean shutdown loses no
    /// accepted message.
    #[instrument(name = "batch_worker_run", skip(self))]
    pub async fn run(mut self) {
        info!(
            batch_size = self.config.batch_size,
            batch_timeout_ms = self.config.batch_timeout.as_millis() as u64,
            "batch worker started"
        );

        loop {
            let first = match timeout(self.config.batch_timeout, self.rx.recv()).await {
                // No message within the window; stay idle
                Err(_) => continue,
                // Queue closed and fully drained
                Ok(None) => break,
                Ok(Some(message)) => message,
            };

            let mut batch = Vec::with_capacity(self.config.batch_size);
            batch.push(first);
            while batch.len() < self.config.batch_size {
                match self.rx.try_recv() {
                    Ok(message) => batch.push(message),
                    Err(_) => break,
                }
            }
            self.stats.set_queue_len(self.rx.len());

            self.flush(batch).await;
        }

        info!("ingest queue closed, batch worker stopped");
    }

    /// Flush one batch with grouped store writes
    #[instrument(name = "batch_worker_flush", skip(self, batch), fields(batch_len = batch.len()))]
    async fn flush(&self, batch: Vec<RawMessage>) {
        let batch_len = batch.len();
        metrics::histogram!("curator_ingest_batch_size").record(batch_len as f64);

        // Derive records and deduplicated hierarchy within the batch
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut seen_nodes = HashSet::new();
        let mut seen_edges = HashSet::new();
        let mut records = Vec::with_capacity(batch_len);
        let mut total_bytes = 0usize;

        for message in &batch {
            total_bytes += message.payload_len();

            for node in TopicNode::nodes_for(&message.topic) {
                if seen_nodes.insert(node.path.clone()) {
                    nodes.push(node);
                }
            }
            for edge in TopicNode::edges_for(&message.topic) {
                if seen_edges.insert((edge.parent.clone(), edge.child.clone())) {
                    edges.push(edge);
                }
            }

            records.push(self.build_record(message));
        }

        debug!(
            messages = batch_len,
            unique_topics = seen_nodes.len(),
            bytes = total_bytes,
            "flushing batch"
        );

        // Grouped writes: three round trips per batch, not per message
        let result = async {
            self.store.upsert_topic_nodes(&nodes).await?;
            self.store.upsert_topic_edges(&edges).await?;
            self.store.insert_message_records(&records).await?;
            Ok::<(), contracts::CurationError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.stats.record_batch_flushed(batch_len);
                for record in &records {
                    self.stats.record_conformance(record.conformance);
                    metrics::counter!(
                        "curator_ingest_messages_total",
                        "conformance" => record.conformance.as_str()
                    )
                    .increment(1);
                }
                metrics::counter!("curator_ingest_batches_total").increment(1);
            }
            Err(e) => {
                // Abandon the batch; the next message on these topics will
                // be re-ingested later. The worker itself keeps running.
                self.stats.record_write_errors(batch_len);
                metrics::counter!("curator_ingest_write_errors_total")
                    .increment(batch_len as u64);
                error!(error = %e, messages = batch_len, "batch write failed, batch abandoned");
            }
        }
    }

    /// Decode, canonicalize and conformance-check one message
    fn build_record(&self, message: &RawMessage) -> MessageRecord {
        let payload = transform::decode_payload(&message.payload);
        let binding = self.bindings.get(message.topic.as_str());
        let ConformanceResult {
            status, violations, ..
        } = transform::check(&payload, binding.as_ref());

        MessageRecord {
            topic: message.topic.clone(),
            publisher_id: message.publisher_id.clone(),
            canonical_text: canonical_text(&message.topic, &payload),
            payload_bytes: message.payload_len(),
            conformance: status,
            violations,
            received_at: message.received_at,
        }
    }
}

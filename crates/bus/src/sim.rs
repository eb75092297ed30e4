//! Synthetic telemetry publisher
//!
//! Generates machine-telemetry payloads onto the in-memory bus so the
//! pipeline can run end-to-end without a broker or real devices.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::memory::MemoryBus;

/// Synthetic publisher configuration
#[derive(Debug, Clone)]
pub struct SimPublisherConfig {
    /// Topics to publish on, round-robin
    pub topics: Vec<String>,

    /// Interval between published messages
    pub interval: Duration,
}

impl Default for SimPublisherConfig {
    fn default() -> Self {
        Self {
            topics: vec![
                "raw/line1/temp".to_string(),
                "raw/line1/pressure".to_string(),
                "raw/line2/temp".to_string(),
            ],
            interval: Duration::from_millis(50),
        }
    }
}

/// Periodic publisher of synthetic payloads onto a MemoryBus
pub struct SimPublisher {
    bus: MemoryBus,
    config: SimPublisherConfig,
    running: Arc<AtomicBool>,
    published: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl SimPublisher {
    /// Create a stopped publisher
    pub fn new(bus: MemoryBus, config: SimPublisherConfig) -> Self {
        Self {
            bus,
            config,
            running: Arc::new(AtomicBool::new(false)),
            published: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Total messages published so far
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Start publishing in a background task; idempotent
    #[instrument(name = "sim_publisher_start", skip(self))]
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let bus = self.bus.clone();
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let published = Arc::clone(&self.published);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            let mut seq: u64 = 0;

            debug!(topics = config.topics.len(), "sim publisher started");

            while running.load(Ordering::Relaxed) {
                ticker.tick().await;
                if config.topics.is_empty() {
                    continue;
                }
                let topic = &config.topics[(seq as usize) % config.topics.len()];
                let payload = synthetic_payload(seq);
                bus.publish(topic, payload);
                published.fetch_add(1, Ordering::Relaxed);
                seq += 1;
            }

            debug!(published = published.load(Ordering::Relaxed), "sim publisher stopped");
        }));
    }

    /// Stop publishing and await the task
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Deterministic JSON payload varying with the sequence number
fn synthetic_payload(seq: u64) -> Vec<u8> {
    let value = serde_json::json!({
        "tmp": 20.0 + (seq % 10) as f64 * 0.5,
        "hum": 40 + (seq % 20),
        "seq": seq,
    });
    serde_json::to_vec(&value).unwrap_or_else(|_| b"{}".to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BusConnection, BusConnector};

    #[tokio::test]
    async fn test_sim_publisher_emits_messages() {
        let bus = MemoryBus::new();
        let mut conn = bus.connector("uncurated").connect().await.unwrap();
        conn.subscribe("raw/#").await.unwrap();

        let mut publisher = SimPublisher::new(
            bus.clone(),
            SimPublisherConfig {
                topics: vec!["raw/line1/temp".to_string()],
                interval: Duration::from_millis(5),
            },
        );
        publisher.start();

        let msg = conn.recv().await.unwrap();
        assert_eq!(msg.topic, "raw/line1/temp");
        let value: serde_json::Value = serde_json::from_slice(&msg.payload).unwrap();
        assert!(value.get("tmp").is_some());

        publisher.stop().await;
        assert!(publisher.published_count() >= 1);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let bus = MemoryBus::new();
        let mut publisher = SimPublisher::new(bus, SimPublisherConfig::default());
        publisher.start();
        publisher.start();
        publisher.stop().await;
    }
}

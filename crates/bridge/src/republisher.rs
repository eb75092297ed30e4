//! Bridge - moves messages between buses through the mapping cache
//!
//! Both connections are re-established together after any transport error,
//! with a fixed backoff between attempts. Absence of an approved mapping is
//! the normal state for most raw topics, so unmapped messages are dropped
//! silently and only counted.

use std::sync::Arc;

use bus::{
    BusConnection, BusConnector, BusMessage, ConnectionError, ConnectionEvent,
    ConnectionStateHandle, ReconnectPolicy,
};
use cache::MappingCache;
use chrono::Utc;
use contracts::{LineageRecord, QosLevel, RepublishPolicy};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::lineage::LineageQueue;
use crate::stats::BridgeStats;

/// Bridge route configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Route name (used for logging/metrics)
    pub name: String,

    /// Topic filter on the subscriber leg
    pub subscribe_filter: String,

    /// Publish quality-of-service level
    pub qos: QosLevel,

    /// Reconnect policy
    pub policy: ReconnectPolicy,

    /// How republish targets are derived
    pub republish: RepublishPolicy,
}

/// Bridge over one subscriber leg and one publisher leg
pub struct Bridge<Sub, Pub> {
    config: BridgeConfig,
    subscriber: Sub,
    publisher: Pub,
    mappings: Arc<MappingCache>,
    lineage: Option<LineageQueue>,
    stats: Arc<BridgeStats>,
    state: ConnectionStateHandle,
    shutdown: watch::Receiver<bool>,
}

/// Handle to a running bridge task
pub struct BridgeHandle {
    name: String,
    task: JoinHandle<()>,
    stats: Arc<BridgeStats>,
    state: ConnectionStateHandle,
    shutdown_tx: watch::Sender<bool>,
}

impl BridgeHandle {
    /// Route name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared stats handle
    pub fn stats(&self) -> Arc<BridgeStats> {
        Arc::clone(&self.stats)
    }

    /// Connection state for health reporting
    pub fn state(&self) -> ConnectionStateHandle {
        self.state.clone()
    }

    /// Request shutdown and await the task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

impl<Sub, Pub> Bridge<Sub, Pub>
where
    Sub: BusConnector + 'static,
    Pub: BusConnector + 'static,
{
    /// Spawn a bridge task over the given connectors
    pub fn spawn(
        config: BridgeConfig,
        subscriber: Sub,
        publisher: Pub,
        mappings: Arc<MappingCache>,
        lineage: Option<LineageQueue>,
    ) -> BridgeHandle {
        let name = config.name.clone();
        let stats = Arc::new(BridgeStats::new());
        let state = ConnectionStateHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let bridge = Bridge {
            config,
            subscriber,
            publisher,
            mappings,
            lineage,
            stats: Arc::clone(&stats),
            state: state.clone(),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(async move {
            bridge.run().await;
        });

        BridgeHandle {
            name,
            task,
            stats,
            state,
            shutdown_tx,
        }
    }

    /// Reconnect loop: Disconnected -> Connecting -> Connected, forever
    /// while the service runs
    #[instrument(name = "bridge_run", skip(self), fields(bridge = %self.config.name))]
    async fn run(mut self) {
        info!(
            filter = %self.config.subscribe_filter,
            qos = self.config.qos.as_u8(),
            "bridge started"
        );

        while !*self.shutdown.borrow() {
            self.state.apply(&ConnectionEvent::AttemptStarted);

            let connections = self.connect_both().await;
            let (mut sub_conn, mut pub_conn) = match connections {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "bridge connect failed");
                    self.state.apply(&ConnectionEvent::TransportError(e));
                    if self.backoff().await {
                        break;
                    }
                    continue;
                }
            };

            self.state.apply(&ConnectionEvent::Established);
            self.stats.record_reconnect();
            info!("bridge connected");

            if self.forward_until_error(&mut sub_conn, &mut pub_conn).await {
                let _ = sub_conn.disconnect().await;
                let _ = pub_conn.disconnect().await;
                break;
            }

            if self.backoff().await {
                break;
            }
        }

        self.state.apply(&ConnectionEvent::Closed);
        info!("bridge stopped");
    }

    /// Establish both legs and subscribe; any failure tears down the pair
    async fn connect_both(
        &self,
    ) -> Result<(Sub::Connection, Pub::Connection), ConnectionError> {
        let mut sub_conn = self.subscriber.connect().await?;
        let pub_conn = self.publisher.connect().await?;
        sub_conn.subscribe(&self.config.subscribe_filter).await?;
        Ok((sub_conn, pub_conn))
    }

    /// Forward loop; returns true on shutdown, false on transport error
    async fn forward_until_error(
        &mut self,
        sub_conn: &mut Sub::Connection,
        pub_conn: &mut Pub::Connection,
    ) -> bool {
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return true;
                    }
                }
                received = sub_conn.recv() => {
                    let message = match received {
                        Ok(message) => message,
                        Err(e) => {
                            warn!(error = %e, "bridge subscriber error");
                            self.state.apply(&ConnectionEvent::TransportError(e));
                            return false;
                        }
                    };
                    if let Err(e) = self.handle_message(message, pub_conn).await {
                        warn!(error = %e, "bridge publisher error");
                        self.state.apply(&ConnectionEvent::TransportError(e));
                        return false;
                    }
                }
            }
        }
    }

    /// Route one message; Ok covers both republished and dropped outcomes
    async fn handle_message(
        &self,
        message: BusMessage,
        pub_conn: &mut Pub::Connection,
    ) -> Result<(), ConnectionError> {
        self.stats.record_received();

        match &self.config.republish {
            RepublishPolicy::Mapped => self.republish_mapped(message, pub_conn).await,
            RepublishPolicy::Namespace {
                prefix,
                exclude_prefixes,
            } => {
                self.republish_namespace(message, prefix, exclude_prefixes, pub_conn)
                    .await
            }
        }
    }

    async fn republish_mapped(
        &self,
        message: BusMessage,
        pub_conn: &mut Pub::Connection,
    ) -> Result<(), ConnectionError> {
        let Some(mapping) = self.mappings.get(message.topic.as_str()) else {
            // Routine for most raw topics; counted, not logged per-message
            self.stats.record_dropped();
            metrics::counter!(
                "curator_bridge_messages_dropped_total",
                "bridge" => self.config.name.clone()
            )
            .increment(1);
            trace!(topic = %message.topic, "no approved mapping, message dropped");
            return Ok(());
        };

        let (_, payload) = transform::transform(&message.payload, &mapping.key_mapping);
        pub_conn
            .publish(mapping.curated_topic.as_str(), payload, self.config.qos)
            .await?;

        self.stats.record_transformed();
        metrics::counter!(
            "curator_bridge_messages_transformed_total",
            "bridge" => self.config.name.clone()
        )
        .increment(1);

        if let Some(lineage) = &self.lineage {
            lineage.try_send(LineageRecord {
                raw_topic: message.topic,
                curated_topic: mapping.curated_topic.clone(),
                mapping_id: mapping.mapping_id.clone(),
                produced_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn republish_namespace(
        &self,
        message: BusMessage,
        prefix: &str,
        exclude_prefixes: &[String],
        pub_conn: &mut Pub::Connection,
    ) -> Result<(), ConnectionError> {
        // Own output and any configured prefixes are excluded to prevent
        // republish loops
        let excluded = message.topic.has_prefix(prefix)
            || exclude_prefixes.iter().any(|p| message.topic.has_prefix(p));
        if excluded {
            self.stats.record_dropped();
            trace!(topic = %message.topic, "excluded from namespace republish");
            return Ok(());
        }

        let target = format!("{}/{}", prefix.trim_end_matches('/'), message.topic);
        pub_conn
            .publish(&target, message.payload, self.config.qos)
            .await?;

        self.stats.record_transformed();
        debug!(topic = %message.topic, target = %target, "namespace republished");
        Ok(())
    }

    /// Fixed-delay backoff; returns true if shutdown arrived during it
    async fn backoff(&mut self) -> bool {
        debug!(
            backoff_secs = self.config.policy.backoff.as_secs(),
            "bridge backing off"
        );
        tokio::select! {
            _ = tokio::time::sleep(self.config.policy.backoff) => false,
            changed = self.shutdown.changed() => {
                changed.is_err() || *self.shutdown.borrow()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::MemoryBus;
    use contracts::Mapping;
    use std::collections::HashMap;
    use std::time::Duration;
    use store::MemoryStore;
    use tokio::time::sleep;

    fn mapped_config(name: &str) -> BridgeConfig {
        BridgeConfig {
            name: name.into(),
            subscribe_filter: "raw/#".into(),
            qos: QosLevel::AtLeastOnce,
            policy: ReconnectPolicy::new(Duration::from_millis(20)),
            republish: RepublishPolicy::Mapped,
        }
    }

    fn mapping_cache(entries: &[(&str, &str)]) -> Arc<MappingCache> {
        let cache = Arc::new(MappingCache::new("mappings"));
        cache.install(
            entries
                .iter()
                .map(|(raw, curated)| {
                    (
                        raw.to_string(),
                        Mapping {
                            raw_topic: (*raw).into(),
                            curated_topic: (*curated).into(),
                            key_mapping: HashMap::from([(
                                "tmp".to_string(),
                                "temperature".to_string(),
                            )]),
                            mapping_id: "m-1".into(),
                        },
                    )
                })
                .collect(),
        );
        cache
    }

    #[tokio::test]
    async fn test_mapped_message_transformed_and_republished() {
        let uncurated = MemoryBus::new();
        let curated = MemoryBus::new();
        let mappings = mapping_cache(&[("raw/line1/temp", "curated/line1/temperature")]);

        let mut curated_conn = curated.connector("probe").connect().await.unwrap();
        curated_conn.subscribe("curated/#").await.unwrap();

        let handle = Bridge::spawn(
            mapped_config("main"),
            uncurated.connector("uncurated"),
            curated.connector("curated"),
            mappings,
            None,
        );

        sleep(Duration::from_millis(20)).await;
        uncurated.publish("raw/line1/temp", &br#"{"tmp": 21.5}"#[..]);

        let forwarded = curated_conn.recv().await.unwrap();
        assert_eq!(forwarded.topic, "curated/line1/temperature");
        let value: serde_json::Value = serde_json::from_slice(&forwarded.payload).unwrap();
        assert_eq!(value, serde_json::json!({"temperature": 21.5}));

        assert_eq!(handle.stats().transformed(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unmapped_message_dropped_and_counted() {
        let uncurated = MemoryBus::new();
        let curated = MemoryBus::new();
        let mappings = mapping_cache(&[]);

        let mut curated_conn = curated.connector("probe").connect().await.unwrap();
        curated_conn.subscribe("#").await.unwrap();

        let handle = Bridge::spawn(
            mapped_config("main"),
            uncurated.connector("uncurated"),
            curated.connector("curated"),
            mappings,
            None,
        );

        sleep(Duration::from_millis(20)).await;
        uncurated.publish("raw/unknown", &b"{}"[..]);
        sleep(Duration::from_millis(50)).await;

        let stats = handle.stats();
        assert_eq!(stats.dropped(), 1);
        assert_eq!(stats.transformed(), 0);
        handle.shutdown().await;

        // Nothing arrived on the curated side
        assert!(tokio::time::timeout(Duration::from_millis(50), curated_conn.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_lineage_enqueued_per_republication() {
        let uncurated = MemoryBus::new();
        let curated = MemoryBus::new();
        let store = Arc::new(MemoryStore::new());
        let (lineage_queue, lineage_handle) = crate::lineage_channel(Arc::clone(&store), 16);
        let mappings = mapping_cache(&[("raw/a", "curated/a")]);

        let handle = Bridge::spawn(
            mapped_config("main"),
            uncurated.connector("uncurated"),
            curated.connector("curated"),
            mappings,
            Some(lineage_queue),
        );

        sleep(Duration::from_millis(20)).await;
        uncurated.publish("raw/a", &b"{}"[..]);
        sleep(Duration::from_millis(50)).await;

        handle.shutdown().await;
        lineage_handle.shutdown().await;

        let lineage = store.lineage();
        assert_eq!(lineage.len(), 1);
        assert_eq!(lineage[0].raw_topic, "raw/a");
        assert_eq!(lineage[0].curated_topic, "curated/a");
        assert_eq!(lineage[0].mapping_id, "m-1");
    }

    #[tokio::test]
    async fn test_namespace_variant_excludes_own_output() {
        let curated = MemoryBus::new();
        let config = BridgeConfig {
            name: "downstream".into(),
            subscribe_filter: "#".into(),
            qos: QosLevel::AtMostOnce,
            policy: ReconnectPolicy::new(Duration::from_millis(20)),
            republish: RepublishPolicy::Namespace {
                prefix: "downstream".into(),
                exclude_prefixes: vec![],
            },
        };

        let mut probe = curated.connector("probe").connect().await.unwrap();
        probe.subscribe("downstream/#").await.unwrap();

        // Same bus on both legs, the loop-prone shape
        let handle = Bridge::spawn(
            config,
            curated.connector("sub"),
            curated.connector("pub"),
            mapping_cache(&[]),
            None,
        );

        sleep(Duration::from_millis(20)).await;
        curated.publish("curated/line1/temp", &b"{}"[..]);

        let forwarded = probe.recv().await.unwrap();
        assert_eq!(forwarded.topic, "downstream/curated/line1/temp");

        // The republished message loops back into the bridge's own filter
        // but is excluded; give it time to (not) cascade
        sleep(Duration::from_millis(100)).await;
        let stats = handle.stats();
        assert_eq!(stats.transformed(), 1);
        assert!(stats.dropped() >= 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reconnect_after_transport_error() {
        let uncurated = MemoryBus::new();
        let curated = MemoryBus::new();
        let mappings = mapping_cache(&[("raw/a", "curated/a")]);

        let handle = Bridge::spawn(
            mapped_config("main"),
            uncurated.connector("uncurated"),
            curated.connector("curated"),
            mappings,
            None,
        );
        let state = handle.state();

        sleep(Duration::from_millis(20)).await;
        assert!(state.is_connected());

        // Sever mid-stream; the bridge must come back within backoff + ε
        uncurated.sever_all();
        curated.sever_all();
        sleep(Duration::from_millis(100)).await;
        assert!(state.is_connected());

        // Forwarding resumed with no cache state lost
        let mut probe = curated.connector("probe").connect().await.unwrap();
        probe.subscribe("curated/#").await.unwrap();
        uncurated.publish("raw/a", &b"{}"[..]);
        let forwarded = probe.recv().await.unwrap();
        assert_eq!(forwarded.topic, "curated/a");

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_failure_retries_until_success() {
        let uncurated = MemoryBus::new();
        let curated = MemoryBus::new();
        uncurated.fail_next_connects(2);

        let handle = Bridge::spawn(
            mapped_config("main"),
            uncurated.connector("uncurated"),
            curated.connector("curated"),
            mapping_cache(&[]),
            None,
        );
        let state = handle.state();

        sleep(Duration::from_millis(150)).await;
        assert!(state.is_connected());
        handle.shutdown().await;
    }
}

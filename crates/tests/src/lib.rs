//! # Integration Tests
//!
//! End-to-end tests over the in-memory bus, without a broker or an
//! external store.

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use bridge::{lineage_channel, Bridge, BridgeConfig};
    use bus::{
        BusConnection, BusConnector, MemoryBus, ReconnectPolicy, SimPublisher,
        SimPublisherConfig,
    };
    use cache::{BindingCache, CacheHandle, MappingCache};
    use contracts::{Binding, Mapping, QosLevel, RepublishPolicy};
    use ingest::{ingest_channel, BatchConfig, BatchWorker, Intake, IntakeConfig, IngestStats};
    use store::{MappingLoader, MemoryStore};
    use tokio::time::sleep;

    fn demo_mapping(raw: &str, curated: &str) -> Mapping {
        Mapping {
            raw_topic: raw.into(),
            curated_topic: curated.into(),
            key_mapping: HashMap::from([("tmp".to_string(), "temperature".to_string())]),
            mapping_id: format!("map-{raw}"),
        }
    }

    /// End-to-end test: SimPublisher -> MemoryBus -> Intake -> BatchWorker
    /// plus Bridge -> curated bus, sharing the mapping cache.
    ///
    /// Verifies the full flow:
    /// 1. Synthetic telemetry lands on the uncurated bus
    /// 2. The intake queues it and the batch worker persists records
    /// 3. The bridge transforms mapped topics onto the curated bus
    /// 4. Unmapped topics are counted as dropped, not republished
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let uncurated = MemoryBus::new();
        let curated = MemoryBus::new();
        let store = Arc::new(MemoryStore::new());

        store.approve_mapping(demo_mapping("raw/line1/temp", "curated/line1/temperature"));
        store.approve_binding(Binding {
            topic: "raw/line1/temp".into(),
            expected_schema: ["tmp", "seq"].iter().map(|s| s.to_string()).collect(),
            proposal_id: "p-temp".into(),
        });

        // Mapping cache fed from the store, as in production wiring
        let mapping_handle = CacheHandle::start(
            "mappings",
            MappingLoader::new(Arc::clone(&store)),
            Duration::from_secs(30),
        )
        .await
        .unwrap();
        let mappings: Arc<MappingCache> = mapping_handle.cache();

        // Binding cache installed directly; refresh is covered elsewhere
        let bindings = Arc::new(BindingCache::new("bindings"));
        bindings.install(HashMap::from([(
            "raw/line1/temp".to_string(),
            Binding {
                topic: "raw/line1/temp".into(),
                expected_schema: ["tmp", "seq"].iter().map(|s| s.to_string()).collect(),
                proposal_id: "p-temp".into(),
            },
        )]));

        // Ingest side
        let ingest_stats = Arc::new(IngestStats::new());
        let (queue, queue_rx) = ingest_channel(100, Arc::clone(&ingest_stats));
        let worker = BatchWorker::new(
            queue_rx,
            Arc::clone(&store),
            Arc::clone(&bindings),
            BatchConfig {
                batch_size: 5,
                batch_timeout: Duration::from_millis(20),
            },
            Arc::clone(&ingest_stats),
        )
        .spawn();
        let intake = Intake::spawn(
            uncurated.connector("uncurated"),
            IntakeConfig {
                filters: vec!["raw/#".to_string()],
                publisher_namespace: None,
                policy: ReconnectPolicy::new(Duration::from_millis(20)),
            },
            queue.clone(),
        );

        // Bridge side
        let (lineage_queue, lineage_handle) = lineage_channel(Arc::clone(&store), 64);
        let bridge = Bridge::spawn(
            BridgeConfig {
                name: "main".into(),
                subscribe_filter: "raw/#".into(),
                qos: QosLevel::AtLeastOnce,
                policy: ReconnectPolicy::new(Duration::from_millis(20)),
                republish: RepublishPolicy::Mapped,
            },
            uncurated.connector("uncurated"),
            curated.connector("curated"),
            Arc::clone(&mappings),
            Some(lineage_queue.clone()),
        );

        // Probe on the curated side
        let mut probe = curated.connector("probe").connect().await.unwrap();
        probe.subscribe("curated/#").await.unwrap();

        // Synthetic traffic: one mapped topic, one unmapped
        let mut sim = SimPublisher::new(
            uncurated.clone(),
            SimPublisherConfig {
                topics: vec!["raw/line1/temp".to_string(), "raw/line9/unknown".to_string()],
                interval: Duration::from_millis(5),
            },
        );
        sleep(Duration::from_millis(30)).await;
        sim.start();

        // A transformed message arrives on the curated bus
        let forwarded = tokio::time::timeout(Duration::from_secs(5), probe.recv())
            .await
            .expect("no curated message within timeout")
            .unwrap();
        assert_eq!(forwarded.topic, "curated/line1/temperature");
        let value: serde_json::Value = serde_json::from_slice(&forwarded.payload).unwrap();
        assert!(value.get("temperature").is_some(), "tmp key renamed");
        assert!(value.get("tmp").is_none());

        // Let the batch worker flush a few batches
        sleep(Duration::from_millis(200)).await;
        sim.stop().await;

        // Shutdown in production order: intake, queue, worker, bridge, lineage
        intake.shutdown().await;
        drop(queue);
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .expect("worker drained")
            .unwrap();
        bridge.shutdown().await;
        drop(lineage_queue);
        lineage_handle.shutdown().await;
        mapping_handle.stop().await;

        // Ingest persisted records for both topics
        assert!(store.record_count() > 0, "message records persisted");
        let records = store.records();
        assert!(records.iter().any(|r| r.topic == "raw/line1/temp"));
        assert!(records.iter().any(|r| r.topic == "raw/line9/unknown"));

        // Topic hierarchy was written
        assert!(store.node_count() >= 5);
        assert!(store.edge_count() >= 3);

        // Lineage recorded for the mapped topic only
        let lineage = store.lineage();
        assert!(!lineage.is_empty());
        assert!(lineage.iter().all(|l| l.raw_topic == "raw/line1/temp"));

        // Conformance: bound topic conformant, unknown topic unbound
        let snapshot = ingest_stats.snapshot();
        assert!(snapshot.conformant > 0);
        assert!(snapshot.unbound > 0);
        assert_eq!(snapshot.write_errors, 0);
    }

    /// Reconnect recovery: sever the transport mid-stream; the bridge must
    /// re-enter Connected within backoff + ε and resume forwarding with no
    /// cache state lost.
    #[tokio::test]
    async fn test_e2e_reconnect_recovery() {
        let uncurated = MemoryBus::new();
        let curated = MemoryBus::new();

        let mappings = Arc::new(MappingCache::new("mappings"));
        mappings.install(HashMap::from([(
            "raw/a".to_string(),
            demo_mapping("raw/a", "curated/a"),
        )]));

        let backoff = Duration::from_millis(50);
        let bridge = Bridge::spawn(
            BridgeConfig {
                name: "main".into(),
                subscribe_filter: "raw/#".into(),
                qos: QosLevel::AtLeastOnce,
                policy: ReconnectPolicy::new(backoff),
                republish: RepublishPolicy::Mapped,
            },
            uncurated.connector("uncurated"),
            curated.connector("curated"),
            Arc::clone(&mappings),
            None,
        );
        let state = bridge.state();

        sleep(Duration::from_millis(30)).await;
        assert!(state.is_connected());

        // Forward one message before the outage
        let mut probe = curated.connector("probe").connect().await.unwrap();
        probe.subscribe("curated/#").await.unwrap();
        uncurated.publish("raw/a", &br#"{"tmp": 1}"#[..]);
        let before = probe.recv().await.unwrap();
        assert_eq!(before.topic, "curated/a");

        // Outage on both legs
        uncurated.sever_all();
        curated.sever_all();

        // Within backoff + ε the bridge is connected again
        sleep(backoff + Duration::from_millis(100)).await;
        assert!(state.is_connected());

        // Subsequently published messages flow; the mapping survived intact
        let mut probe = curated.connector("probe").connect().await.unwrap();
        probe.subscribe("curated/#").await.unwrap();
        uncurated.publish("raw/a", &br#"{"tmp": 2}"#[..]);
        let after = tokio::time::timeout(Duration::from_secs(2), probe.recv())
            .await
            .expect("forwarding resumed")
            .unwrap();
        assert_eq!(after.topic, "curated/a");

        assert!(bridge.stats().transformed() >= 2);
        bridge.shutdown().await;
    }

    /// Config loading drives real wiring types end to end.
    #[test]
    fn test_config_round_trip_drives_bridges() {
        let toml = r#"
[bus.uncurated]
host = "localhost"

[bus.curated]
host = "localhost"

[[bridges]]
name = "main"
subscribe_filter = "raw/#"
qos = 2

[[bridges]]
name = "downstream"
subscribe_filter = "curated/#"
republish = { mode = "namespace", prefix = "downstream", exclude_prefixes = ["private"] }
"#;
        let config =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(config.bridges.len(), 2);
        assert_eq!(config.bridges[0].qos, QosLevel::ExactlyOnce);
        match &config.bridges[1].republish {
            RepublishPolicy::Namespace {
                prefix,
                exclude_prefixes,
            } => {
                assert_eq!(prefix, "downstream");
                assert_eq!(exclude_prefixes, &vec!["private".to_string()]);
            }
            _ => panic!("expected namespace policy"),
        }
    }
}

//! Pipeline orchestrator - coordinates all components.
//!
//! Supports a real MQTT broker and the in-memory bus via feature flags.
//! When the `real-mqtt` feature is disabled, runs against the in-memory
//! bus with a synthetic telemetry publisher.
//!
//! Startup order: store, caches, lineage worker, batch worker, intake,
//! bridges. Shutdown is the reverse: intake stops first so the queue
//! drains, then bridges, lineage, caches and finally the store.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bridge::{Bridge, BridgeConfig, BridgeHandle};
use bus::{BusConnector, ReconnectPolicy};
use cache::CacheHandle;
use contracts::{CuratorConfig, RepublishPolicy};
use ingest::{ingest_channel, BatchConfig, BatchWorker, Intake, IntakeConfig, IngestStats};
use observability::CurationMetricsAggregator;
use store::{BindingLoader, MappingLoader, RetentionJob, SqliteStore};
use tokio::sync::watch;
use tracing::{info, warn};

use super::health::{self, BridgeHealth, HealthRegistry};
use super::RunStats;

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// The curator configuration
    pub config: CuratorConfig,

    /// Maximum ingested messages before stopping (None = unlimited)
    pub max_messages: Option<u64>,

    /// Run duration limit (None = until shutdown signal)
    pub timeout: Option<Duration>,

    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Health endpoint port (None = disabled)
    pub health_port: Option<u16>,

    /// Synthetic publisher interval (mock mode only)
    #[cfg_attr(feature = "real-mqtt", allow(dead_code))]
    pub sim_interval: Duration,
}

/// Main service orchestrator
pub struct CurationService {
    config: ServiceConfig,
}

impl CurationService {
    /// Create a new service with the given configuration
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Run the service to completion
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        #[cfg(feature = "real-mqtt")]
        return self.run_real(shutdown).await;

        #[cfg(not(feature = "real-mqtt"))]
        return self.run_mock(shutdown).await;
    }

    /// Run against a real MQTT broker
    #[cfg(feature = "real-mqtt")]
    async fn run_real(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        use bus::MqttConnector;

        let bus_config = &self.config.config.bus;
        info!(
            uncurated = %bus_config.uncurated.host,
            curated = %bus_config.curated.host,
            "Connecting to MQTT brokers..."
        );

        let uncurated = MqttConnector::new(bus_config.uncurated.clone(), "uncurated");
        let curated = MqttConnector::new(bus_config.curated.clone(), "curated");

        self.run_pipeline(uncurated, curated, shutdown).await
    }

    /// Run against the in-memory bus with synthetic traffic
    #[cfg(not(feature = "real-mqtt"))]
    async fn run_mock(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        use bus::{MemoryBus, SimPublisher, SimPublisherConfig};

        info!("Running in MOCK mode (no broker required)");

        let uncurated_bus = MemoryBus::new();
        let curated_bus = MemoryBus::new();

        let sim_config = SimPublisherConfig {
            interval: self.config.sim_interval,
            ..Default::default()
        };
        let mut sim = SimPublisher::new(uncurated_bus.clone(), sim_config);
        sim.start();

        let result = self
            .run_pipeline(
                uncurated_bus.connector("uncurated"),
                curated_bus.connector("curated"),
                shutdown,
            )
            .await;

        sim.stop().await;
        result
    }

    /// Common pipeline logic shared between mock and real modes
    async fn run_pipeline<SubC, PubC>(
        &self,
        uncurated: SubC,
        curated: PubC,
        shutdown: impl Future<Output = ()>,
    ) -> Result<RunStats>
    where
        SubC: BusConnector + Clone + 'static,
        PubC: BusConnector + Clone + 'static,
    {
        let start_time = Instant::now();
        let config = &self.config.config;

        // Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            match observability::init_metrics_only(port) {
                Ok(()) => info!("Metrics endpoint available on port {}", port),
                Err(e) => warn!(error = %e, port, "metrics exporter unavailable, continuing"),
            }
        }

        // Store: the only startup failure that prevents a running state
        info!(path = %config.store.path, "Connecting to store...");
        let store = Arc::new(
            SqliteStore::connect(&config.store.path)
                .await
                .context("cannot resolve store at startup")?,
        );

        #[cfg(not(feature = "real-mqtt"))]
        seed_demo_approvals(&store).await?;

        // Caches must be loaded before any consumer starts; a cold cache
        // serves "no mapping" / "unbound" correctly, an unloaded one does not
        info!("Loading caches...");
        let refresh = Duration::from_secs(config.cache.refresh_interval_secs);
        let mapping_handle =
            CacheHandle::start("mappings", MappingLoader::new(Arc::clone(&store)), refresh)
                .await
                .context("mapping cache initial load failed")?;
        let binding_handle =
            CacheHandle::start("bindings", BindingLoader::new(Arc::clone(&store)), refresh)
                .await
                .context("binding cache initial load failed")?;
        let mappings = mapping_handle.cache();
        let bindings = binding_handle.cache();

        info!(
            mappings = mappings.len(),
            bindings = bindings.len(),
            "Caches loaded"
        );

        // Lineage worker
        let lineage_capacity = config
            .bridges
            .iter()
            .map(|b| b.lineage_queue_capacity)
            .max()
            .unwrap_or(256);
        let (lineage_queue, lineage_handle) =
            bridge::lineage_channel(Arc::clone(&store), lineage_capacity);
        let lineage_stats = lineage_handle.stats();

        // Batch worker
        let ingest_stats = Arc::new(IngestStats::new());
        let (queue, queue_rx) = ingest_channel(config.ingest.queue_capacity, Arc::clone(&ingest_stats));
        let worker_handle = BatchWorker::new(
            queue_rx,
            Arc::clone(&store),
            Arc::clone(&bindings),
            BatchConfig {
                batch_size: config.ingest.batch_size,
                batch_timeout: Duration::from_millis(config.ingest.batch_timeout_ms),
            },
            Arc::clone(&ingest_stats),
        )
        .spawn();

        // Intake
        let intake_handle = Intake::spawn(
            uncurated.clone(),
            IntakeConfig {
                filters: config.ingest.subscribe_filters.clone(),
                publisher_namespace: config.ingest.publisher_namespace.clone(),
                policy: ReconnectPolicy::default(),
            },
            queue.clone(),
        );
        let intake_state = intake_handle.state();

        // Bridges: the mapped route goes uncurated -> curated; the
        // namespace variant consumes the curated bus itself
        let mut bridge_handles: Vec<BridgeHandle> = Vec::with_capacity(config.bridges.len());
        for settings in &config.bridges {
            let bridge_config = BridgeConfig {
                name: settings.name.clone(),
                subscribe_filter: settings.subscribe_filter.clone(),
                qos: settings.qos,
                policy: ReconnectPolicy::new(Duration::from_secs(settings.backoff_secs)),
                republish: settings.republish.clone(),
            };
            let handle = match &settings.republish {
                RepublishPolicy::Mapped => Bridge::spawn(
                    bridge_config,
                    uncurated.clone(),
                    curated.clone(),
                    Arc::clone(&mappings),
                    Some(lineage_queue.clone()),
                ),
                RepublishPolicy::Namespace { .. } => Bridge::spawn(
                    bridge_config,
                    curated.clone(),
                    curated.clone(),
                    Arc::clone(&mappings),
                    None,
                ),
            };
            bridge_handles.push(handle);
        }

        info!(bridges = bridge_handles.len(), "Pipeline running");

        // Retention job
        let retention = RetentionJob::spawn(
            Arc::clone(&store),
            Duration::from_secs(config.store.retention_hours * 3600),
            Duration::from_secs(config.store.cleanup_interval_secs),
        );

        // Health endpoint
        let registry = Arc::new(HealthRegistry {
            intake_state: intake_state.clone(),
            bridges: bridge_handles
                .iter()
                .map(|handle| BridgeHealth {
                    name: handle.name().to_string(),
                    stats: handle.stats(),
                    state: handle.state(),
                })
                .collect(),
            ingest: Arc::clone(&ingest_stats),
            lineage: Arc::clone(&lineage_stats),
            mappings: Arc::clone(&mappings),
            bindings: Arc::clone(&bindings),
        });
        let (health_shutdown_tx, health_shutdown_rx) = watch::channel(false);
        let health_task = self
            .config
            .health_port
            .map(|port| health::spawn(port, Arc::clone(&registry), health_shutdown_rx));

        // Observe until a stop condition arrives
        let mut aggregator = CurationMetricsAggregator::default();
        let timeout_reached = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(timeout_reached);
        let mut poll = tokio::time::interval(Duration::from_secs(1));
        poll.tick().await;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = &mut timeout_reached => {
                    info!(timeout_secs = self.config.timeout.map(|t| t.as_secs()), "Run timeout reached");
                    break;
                }
                _ = poll.tick() => {
                    let snapshot = ingest_stats.snapshot();
                    aggregator.observe_queue_depth(snapshot.queue_len);
                    aggregator.observe_connection("intake", intake_state.is_connected());
                    for bridge in &registry.bridges {
                        let stats = bridge.stats.snapshot();
                        aggregator.observe_drop_rate(&bridge.name, stats.received, stats.dropped);
                        aggregator.observe_connection(
                            &format!("bridge:{}", bridge.name),
                            bridge.state.is_connected(),
                        );
                    }
                    if let Some(max) = self.config.max_messages {
                        if snapshot.received >= max {
                            info!(received = snapshot.received, "Reached max messages limit");
                            break;
                        }
                    }
                }
            }
        }

        // Ordered shutdown: stop intake first so nothing new is accepted,
        // then let the worker drain the queue
        info!("Shutting down pipeline...");
        intake_handle.shutdown().await;
        drop(queue);
        if tokio::time::timeout(Duration::from_secs(5), worker_handle)
            .await
            .is_err()
        {
            warn!("batch worker did not drain within grace period");
        }

        for handle in bridge_handles {
            if tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
                .await
                .is_err()
            {
                warn!("bridge did not stop within grace period");
            }
        }

        drop(lineage_queue);
        if tokio::time::timeout(Duration::from_secs(5), lineage_handle.shutdown())
            .await
            .is_err()
        {
            warn!("lineage worker did not drain within grace period");
        }

        retention.stop().await;

        let _ = health_shutdown_tx.send(true);
        if let Some(task) = health_task {
            let _ = tokio::time::timeout(Duration::from_secs(2), task).await;
        }

        let stats = RunStats {
            duration: start_time.elapsed(),
            ingest: ingest_stats.snapshot(),
            bridges: registry
                .bridges
                .iter()
                .map(|b| (b.name.clone(), b.stats.snapshot()))
                .collect(),
            lineage: lineage_stats.snapshot(),
            mapping_cache: mappings.stats(),
            binding_cache: bindings.stats(),
            metrics: aggregator.summary(),
        };

        mapping_handle.stop().await;
        binding_handle.stop().await;
        store.close().await;

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            ingested = stats.ingest.received,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Seed approvals matching the synthetic topics so a mock run curates
/// end to end. `raw/line2/temp` is left unmapped on purpose to exercise
/// the silent-drop path.
#[cfg(not(feature = "real-mqtt"))]
async fn seed_demo_approvals(store: &SqliteStore) -> Result<()> {
    use contracts::{Binding, Mapping};
    use std::collections::HashMap;

    let mappings = [
        Mapping {
            raw_topic: "raw/line1/temp".into(),
            curated_topic: "curated/line1/temperature".into(),
            key_mapping: HashMap::from([
                ("tmp".to_string(), "temperature".to_string()),
                ("hum".to_string(), "humidity".to_string()),
            ]),
            mapping_id: "demo-temp".into(),
        },
        Mapping {
            raw_topic: "raw/line1/pressure".into(),
            curated_topic: "curated/line1/pressure".into(),
            key_mapping: HashMap::new(),
            mapping_id: "demo-pressure".into(),
        },
    ];
    for mapping in &mappings {
        store.seed_mapping(mapping).await?;
    }

    let bindings = [
        Binding {
            topic: "raw/line1/temp".into(),
            expected_schema: ["tmp", "seq"].iter().map(|s| s.to_string()).collect(),
            proposal_id: "demo-binding-temp".into(),
        },
        Binding {
            // Expects a key the synthetic payloads never carry, so the
            // non-conformant path stays visible in a demo run
            topic: "raw/line2/temp".into(),
            expected_schema: ["tmp", "unit"].iter().map(|s| s.to_string()).collect(),
            proposal_id: "demo-binding-line2".into(),
        },
    ];
    for binding in &bindings {
        store.seed_binding(binding).await?;
    }

    info!("Seeded demo mappings and bindings");
    Ok(())
}

//! CuratorConfig - Config Loader output
//!
//! Describes the full service configuration: bus legs, persistent store,
//! cache refresh, ingestion tuning and bridge routes.

use serde::{Deserialize, Serialize};

use crate::QosLevel;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Full service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Message bus legs
    pub bus: BusSettings,

    /// Persistent store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Cache refresh settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Ingestion pipeline settings
    #[serde(default)]
    pub ingest: IngestSettings,

    /// Bridge routes (uncurated to curated, plus optional namespace variants)
    #[serde(default)]
    pub bridges: Vec<BridgeSettings>,
}

/// Both bus legs; the subscriber and publisher may point at the same broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSettings {
    /// Uncurated (subscribe) leg
    pub uncurated: BusEndpoint,

    /// Curated (publish) leg
    pub curated: BusEndpoint,
}

/// One bus endpoint: host, port and optional credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEndpoint {
    /// Broker host
    #[serde(default = "default_bus_host")]
    pub host: String,

    /// Broker port
    #[serde(default = "default_bus_port")]
    pub port: u16,

    /// Optional username
    #[serde(default)]
    pub username: Option<String>,

    /// Optional password
    #[serde(default)]
    pub password: Option<String>,

    /// Optional client id (generated when absent)
    #[serde(default)]
    pub client_id: Option<String>,
}

fn default_bus_host() -> String {
    "localhost".to_string()
}

fn default_bus_port() -> u16 {
    1883
}

impl Default for BusEndpoint {
    fn default() -> Self {
        Self {
            host: default_bus_host(),
            port: default_bus_port(),
            username: None,
            password: None,
            client_id: None,
        }
    }
}

/// Persistent store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// SQLite database path, or ":memory:" for an ephemeral store
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Message-record retention window in hours
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Interval between retention sweeps in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_store_path() -> String {
    "curator.db".to_string()
}

fn default_retention_hours() -> u64 {
    168
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            retention_hours: default_retention_hours(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Cache refresh settings, shared by the mapping and binding caches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Interval between wholesale snapshot refreshes in seconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    30
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

/// Ingestion pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Bounded ingest queue capacity; overflow sheds newest messages
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum messages per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum wait for the first message of a batch in milliseconds
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// Topic filters the intake subscribes to
    #[serde(default = "default_subscribe_filters")]
    pub subscribe_filters: Vec<String>,

    /// Namespace whose first path segment after the prefix is a publisher id.
    /// The intake subscribes to `<namespace>/+/#` in addition to the filters
    /// above. None disables the second subscription.
    #[serde(default = "default_publisher_namespace")]
    pub publisher_namespace: Option<String>,
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_timeout_ms() -> u64 {
    100
}

fn default_subscribe_filters() -> Vec<String> {
    vec!["raw/#".to_string()]
}

fn default_publisher_namespace() -> Option<String> {
    Some("republished".to_string())
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            subscribe_filters: default_subscribe_filters(),
            publisher_namespace: default_publisher_namespace(),
        }
    }
}

/// One bridge route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Unique route name (used for logging/metrics)
    pub name: String,

    /// Topic filter on the subscriber leg
    #[serde(default = "default_bridge_filter")]
    pub subscribe_filter: String,

    /// Publish quality-of-service level
    #[serde(default)]
    pub qos: QosLevel,

    /// Fixed delay before each reconnect attempt in seconds
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,

    /// Bounded lineage write queue capacity
    #[serde(default = "default_lineage_capacity")]
    pub lineage_queue_capacity: usize,

    /// How republish targets are derived
    #[serde(default)]
    pub republish: RepublishPolicy,
}

fn default_bridge_filter() -> String {
    "raw/#".to_string()
}

fn default_backoff_secs() -> u64 {
    5
}

fn default_lineage_capacity() -> usize {
    256
}

/// Republish target policy
///
/// `Mapped` consults the mapping cache and transforms payloads; `Namespace`
/// forwards under a fixed prefix and filters out its own republished topics
/// to prevent loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RepublishPolicy {
    /// Look up the mapping cache; drop (counted) when no mapping exists
    Mapped,
    /// Prefix-rewrite into a downstream namespace
    Namespace {
        /// Prefix prepended to the incoming topic
        prefix: String,

        /// Topic prefixes excluded from republishing (own output included
        /// automatically)
        #[serde(default)]
        exclude_prefixes: Vec<String>,
    },
}

impl Default for RepublishPolicy {
    fn default() -> Self {
        Self::Mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ingest = IngestSettings::default();
        assert_eq!(ingest.queue_capacity, 1000);
        assert_eq!(ingest.batch_size, 10);
        assert_eq!(ingest.batch_timeout_ms, 100);
        assert_eq!(ingest.publisher_namespace.as_deref(), Some("republished"));

        let cache = CacheSettings::default();
        assert_eq!(cache.refresh_interval_secs, 30);
    }

    #[test]
    fn test_republish_policy_serde() {
        let mapped: RepublishPolicy = serde_json::from_str(r#"{"mode": "mapped"}"#).unwrap();
        assert!(matches!(mapped, RepublishPolicy::Mapped));

        let ns: RepublishPolicy =
            serde_json::from_str(r#"{"mode": "namespace", "prefix": "downstream"}"#).unwrap();
        match ns {
            RepublishPolicy::Namespace {
                prefix,
                exclude_prefixes,
            } => {
                assert_eq!(prefix, "downstream");
                assert!(exclude_prefixes.is_empty());
            }
            _ => panic!("expected namespace policy"),
        }
    }

    #[test]
    fn test_minimal_config_json() {
        let json = r#"{
            "bus": {
                "uncurated": {"host": "broker-a"},
                "curated": {}
            }
        }"#;
        let config: CuratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.bus.uncurated.host, "broker-a");
        assert_eq!(config.bus.uncurated.port, 1883);
        assert_eq!(config.bus.curated.host, "localhost");
        assert!(config.bridges.is_empty());
    }
}

//! Configuration validation
//!
//! Validation rules:
//! - bridge names unique and non-empty
//! - queue capacities and batch sizes > 0
//! - batch timeout > 0
//! - refresh/cleanup intervals > 0
//! - namespace republish prefixes non-empty
//! - subscribe filters non-empty

use std::collections::HashSet;

use contracts::{CurationError, CuratorConfig, RepublishPolicy};

/// Validate a CuratorConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &CuratorConfig) -> Result<(), CurationError> {
    validate_bridges(config)?;
    validate_ingest(config)?;
    validate_intervals(config)?;
    Ok(())
}

/// Validate bridge route uniqueness and republish policies
fn validate_bridges(config: &CuratorConfig) -> Result<(), CurationError> {
    let mut seen = HashSet::new();
    for bridge in &config.bridges {
        if bridge.name.is_empty() {
            return Err(CurationError::config_validation(
                "bridges[].name",
                "bridge name cannot be empty",
            ));
        }
        if !seen.insert(&bridge.name) {
            return Err(CurationError::config_validation(
                format!("bridges[name={}]", bridge.name),
                "duplicate bridge name",
            ));
        }
        if bridge.subscribe_filter.is_empty() {
            return Err(CurationError::config_validation(
                format!("bridges[{}].subscribe_filter", bridge.name),
                "subscribe filter cannot be empty",
            ));
        }
        if bridge.lineage_queue_capacity == 0 {
            return Err(CurationError::config_validation(
                format!("bridges[{}].lineage_queue_capacity", bridge.name),
                "lineage queue capacity must be > 0",
            ));
        }
        if let RepublishPolicy::Namespace { prefix, .. } = &bridge.republish {
            if prefix.trim_matches('/').is_empty() {
                return Err(CurationError::config_validation(
                    format!("bridges[{}].republish.prefix", bridge.name),
                    "namespace prefix cannot be empty",
                ));
            }
        }
    }
    Ok(())
}

/// Validate ingestion tuning values
fn validate_ingest(config: &CuratorConfig) -> Result<(), CurationError> {
    let ingest = &config.ingest;

    if ingest.queue_capacity == 0 {
        return Err(CurationError::config_validation(
            "ingest.queue_capacity",
            "queue capacity must be > 0",
        ));
    }
    if ingest.batch_size == 0 {
        return Err(CurationError::config_validation(
            "ingest.batch_size",
            "batch size must be > 0",
        ));
    }
    if ingest.batch_timeout_ms == 0 {
        return Err(CurationError::config_validation(
            "ingest.batch_timeout_ms",
            "batch timeout must be > 0",
        ));
    }
    if ingest.subscribe_filters.iter().any(|f| f.is_empty()) {
        return Err(CurationError::config_validation(
            "ingest.subscribe_filters",
            "subscribe filter cannot be empty",
        ));
    }
    if let Some(namespace) = &ingest.publisher_namespace {
        if namespace.trim_matches('/').is_empty() {
            return Err(CurationError::config_validation(
                "ingest.publisher_namespace",
                "publisher namespace cannot be empty (omit to disable)",
            ));
        }
    }
    Ok(())
}

/// Validate refresh and cleanup intervals
fn validate_intervals(config: &CuratorConfig) -> Result<(), CurationError> {
    if config.cache.refresh_interval_secs == 0 {
        return Err(CurationError::config_validation(
            "cache.refresh_interval_secs",
            "refresh interval must be > 0",
        ));
    }
    if config.store.cleanup_interval_secs == 0 {
        return Err(CurationError::config_validation(
            "store.cleanup_interval_secs",
            "cleanup interval must be > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BridgeSettings, BusEndpoint, BusSettings, ConfigVersion, QosLevel};

    fn minimal_config() -> CuratorConfig {
        CuratorConfig {
            version: ConfigVersion::V1,
            bus: BusSettings {
                uncurated: BusEndpoint::default(),
                curated: BusEndpoint::default(),
            },
            store: Default::default(),
            cache: Default::default(),
            ingest: Default::default(),
            bridges: vec![BridgeSettings {
                name: "main".into(),
                subscribe_filter: "raw/#".into(),
                qos: QosLevel::AtLeastOnce,
                backoff_secs: 5,
                lineage_queue_capacity: 256,
                republish: RepublishPolicy::Mapped,
            }],
        }
    }

    #[test]
    fn test_minimal_config_valid() {
        assert!(validate(&minimal_config()).is_ok());
    }

    #[test]
    fn test_duplicate_bridge_name() {
        let mut config = minimal_config();
        config.bridges.push(config.bridges[0].clone());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate bridge name"));
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = minimal_config();
        config.ingest.batch_size = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn test_zero_refresh_interval() {
        let mut config = minimal_config();
        config.cache.refresh_interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_namespace_prefix() {
        let mut config = minimal_config();
        config.bridges[0].republish = RepublishPolicy::Namespace {
            prefix: "/".into(),
            exclude_prefixes: vec![],
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("namespace prefix"));
    }
}

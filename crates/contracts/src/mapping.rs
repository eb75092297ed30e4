//! Mapping / Binding - approved curation lookup entries
//!
//! Both are owned by the authoritative store; the caches hold read-only
//! snapshots refreshed wholesale. At most one active entry per key in a
//! snapshot (last full refresh wins).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::TopicPath;

/// Approved raw-to-curated topic association with its key-rename table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapping {
    /// Raw topic this mapping applies to (snapshot key)
    pub raw_topic: TopicPath,

    /// Target topic on the curated bus
    pub curated_topic: TopicPath,

    /// Key rename table applied recursively to the payload
    #[serde(default)]
    pub key_mapping: HashMap<String, String>,

    /// Store identifier of the approved mapping
    pub mapping_id: String,
}

/// Approved expected-schema association used only for validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    /// Topic this binding applies to (snapshot key)
    pub topic: TopicPath,

    /// Top-level keys the payload must contain (lower bound, not exact)
    #[serde(default)]
    pub expected_schema: BTreeSet<String>,

    /// Store identifier of the approved schema proposal
    pub proposal_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_serde() {
        let json = r#"{
            "raw_topic": "raw/line1/temp",
            "curated_topic": "curated/line1/temperature",
            "key_mapping": {"tmp": "temperature"},
            "mapping_id": "m-1"
        }"#;
        let mapping: Mapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.raw_topic, "raw/line1/temp");
        assert_eq!(mapping.key_mapping.get("tmp").unwrap(), "temperature");
    }

    #[test]
    fn test_binding_defaults() {
        let json = r#"{"topic": "raw/x", "proposal_id": "p-1"}"#;
        let binding: Binding = serde_json::from_str(json).unwrap();
        assert!(binding.expected_schema.is_empty());
    }
}

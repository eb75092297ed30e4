//! Snapshot loaders
//!
//! Adapt the `CurationStore` full-table fetches to the cache crate's
//! `SnapshotLoader` trait, one loader per cache.

use std::collections::HashMap;
use std::sync::Arc;

use cache::SnapshotLoader;
use contracts::{Binding, CurationError, CurationStore, Mapping};

/// Loader of the `raw_topic -> Mapping` snapshot
pub struct MappingLoader<S> {
    store: Arc<S>,
}

impl<S> MappingLoader<S> {
    /// Create a loader over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: CurationStore + Send + Sync> SnapshotLoader for MappingLoader<S> {
    type Entry = Mapping;

    async fn load(&self) -> Result<HashMap<String, Mapping>, CurationError> {
        let mappings = self.store.fetch_mappings().await?;
        Ok(mappings
            .into_iter()
            .map(|m| (m.raw_topic.as_str().to_string(), m))
            .collect())
    }
}

/// Loader of the `topic -> Binding` snapshot
pub struct BindingLoader<S> {
    store: Arc<S>,
}

impl<S> BindingLoader<S> {
    /// Create a loader over the given store
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: CurationStore + Send + Sync> SnapshotLoader for BindingLoader<S> {
    type Entry = Binding;

    async fn load(&self) -> Result<HashMap<String, Binding>, CurationError> {
        let bindings = self.store.fetch_bindings().await?;
        Ok(bindings
            .into_iter()
            .map(|b| (b.topic.as_str().to_string(), b))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::collections::HashMap as StdHashMap;

    #[tokio::test]
    async fn test_mapping_loader_keys_by_raw_topic() {
        let store = Arc::new(MemoryStore::new());
        store.approve_mapping(Mapping {
            raw_topic: "raw/a".into(),
            curated_topic: "curated/a".into(),
            key_mapping: StdHashMap::new(),
            mapping_id: "m-1".into(),
        });

        let loader = MappingLoader::new(store);
        let table = loader.load().await.unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("raw/a"));
    }

    #[tokio::test]
    async fn test_binding_loader_keys_by_topic() {
        let store = Arc::new(MemoryStore::new());
        store.approve_binding(Binding {
            topic: "raw/a".into(),
            expected_schema: Default::default(),
            proposal_id: "p-1".into(),
        });

        let loader = BindingLoader::new(store);
        let table = loader.load().await.unwrap();
        assert!(table.contains_key("raw/a"));
    }
}

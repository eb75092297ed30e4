//! In-memory store
//!
//! Mock implementation for unit tests, supporting injected write and
//! fetch failures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use contracts::{
    Binding, CurationError, CurationStore, LineageRecord, Mapping, MessageRecord, TopicEdge,
    TopicNode,
};

/// In-memory CurationStore with failure injection
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
    fail_fetches: AtomicBool,
}

#[derive(Default)]
struct Inner {
    mappings: HashMap<String, Mapping>,
    bindings: HashMap<String, Binding>,
    nodes: HashSet<TopicNode>,
    edges: HashSet<TopicEdge>,
    records: Vec<MessageRecord>,
    lineage: Vec<LineageRecord>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve (insert or replace) a mapping
    pub fn approve_mapping(&self, mapping: Mapping) {
        self.lock()
            .mappings
            .insert(mapping.raw_topic.as_str().to_string(), mapping);
    }

    /// Approve (insert or replace) a binding
    pub fn approve_binding(&self, binding: Binding) {
        self.lock()
            .bindings
            .insert(binding.topic.as_str().to_string(), binding);
    }

    /// Remove a mapping approval
    pub fn revoke_mapping(&self, raw_topic: &str) {
        self.lock().mappings.remove(raw_topic);
    }

    /// Make subsequent writes fail until cleared
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent fetches fail until cleared
    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Persisted message record count
    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    /// Persisted message records (cloned)
    pub fn records(&self) -> Vec<MessageRecord> {
        self.lock().records.clone()
    }

    /// Persisted lineage rows (cloned)
    pub fn lineage(&self) -> Vec<LineageRecord> {
        self.lock().lineage.clone()
    }

    /// Topic hierarchy node count
    pub fn node_count(&self) -> usize {
        self.lock().nodes.len()
    }

    /// Topic hierarchy edge count
    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_write(&self, operation: &str) -> Result<(), CurationError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CurationError::store_write(operation, "injected write failure"))
        } else {
            Ok(())
        }
    }

    fn check_fetch(&self) -> Result<(), CurationError> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            Err(CurationError::store_query("injected fetch failure"))
        } else {
            Ok(())
        }
    }
}

impl CurationStore for MemoryStore {
    async fn fetch_mappings(&self) -> Result<Vec<Mapping>, CurationError> {
        self.check_fetch()?;
        Ok(self.lock().mappings.values().cloned().collect())
    }

    async fn fetch_bindings(&self) -> Result<Vec<Binding>, CurationError> {
        self.check_fetch()?;
        Ok(self.lock().bindings.values().cloned().collect())
    }

    async fn upsert_topic_nodes(&self, nodes: &[TopicNode]) -> Result<(), CurationError> {
        self.check_write("upsert_topic_nodes")?;
        let mut inner = self.lock();
        for node in nodes {
            inner.nodes.insert(node.clone());
        }
        Ok(())
    }

    async fn upsert_topic_edges(&self, edges: &[TopicEdge]) -> Result<(), CurationError> {
        self.check_write("upsert_topic_edges")?;
        let mut inner = self.lock();
        for edge in edges {
            inner.edges.insert(edge.clone());
        }
        Ok(())
    }

    async fn insert_message_records(&self, records: &[MessageRecord]) -> Result<(), CurationError> {
        self.check_write("insert_message_records")?;
        self.lock().records.extend_from_slice(records);
        Ok(())
    }

    async fn insert_lineage(&self, record: &LineageRecord) -> Result<(), CurationError> {
        self.check_write("insert_lineage")?;
        self.lock().lineage.push(record.clone());
        Ok(())
    }

    async fn purge_message_records_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CurationError> {
        self.check_write("purge_message_records")?;
        let mut inner = self.lock();
        let before = inner.records.len();
        inner.records.retain(|r| r.received_at >= cutoff);
        Ok((before - inner.records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ConformanceStatus;

    fn mapping(raw: &str) -> Mapping {
        Mapping {
            raw_topic: raw.into(),
            curated_topic: format!("curated/{raw}").into(),
            key_mapping: HashMap::new(),
            mapping_id: "m-1".into(),
        }
    }

    #[tokio::test]
    async fn test_approve_and_fetch() {
        let store = MemoryStore::new();
        store.approve_mapping(mapping("raw/a"));
        store.approve_mapping(mapping("raw/a"));

        let mappings = store.fetch_mappings().await.unwrap();
        assert_eq!(mappings.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);

        let record = MessageRecord {
            topic: "raw/a".into(),
            publisher_id: "direct".into(),
            canonical_text: String::new(),
            payload_bytes: 0,
            conformance: ConformanceStatus::Unbound,
            violations: vec![],
            received_at: Utc::now(),
        };
        assert!(store.insert_message_records(&[record.clone()]).await.is_err());

        store.set_fail_writes(false);
        assert!(store.insert_message_records(&[record]).await.is_ok());
        assert_eq!(store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_purge_retains_recent() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = |at| MessageRecord {
            topic: "raw/a".into(),
            publisher_id: "direct".into(),
            canonical_text: String::new(),
            payload_bytes: 0,
            conformance: ConformanceStatus::Unbound,
            violations: vec![],
            received_at: at,
        };
        store
            .insert_message_records(&[
                record(now - chrono::Duration::hours(2)),
                record(now),
            ])
            .await
            .unwrap();

        let purged = store
            .purge_message_records_before(now - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.record_count(), 1);
    }
}

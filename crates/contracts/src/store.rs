//! CurationStore trait - persistent store interface
//!
//! Defines the abstract interface for the authoritative mapping/binding
//! store and the batch writer's grouped upserts. Full-table fetches happen
//! only at cache-refresh time; the hot path never issues point reads.

use chrono::{DateTime, Utc};

use crate::{Binding, CurationError, LineageRecord, Mapping, MessageRecord, TopicEdge, TopicNode};

/// Persistent store trait
///
/// All store backends must implement this trait.
#[trait_variant::make(CurationStore: Send)]
pub trait LocalCurationStore: Sync {
    /// Fetch all approved mappings (cache refresh only)
    async fn fetch_mappings(&self) -> Result<Vec<Mapping>, CurationError>;

    /// Fetch all approved schema bindings (cache refresh only)
    async fn fetch_bindings(&self) -> Result<Vec<Binding>, CurationError>;

    /// Upsert topic hierarchy nodes, deduplicated by the caller
    ///
    /// # Errors
    /// Returns a write error covering the whole group
    async fn upsert_topic_nodes(&self, nodes: &[TopicNode]) -> Result<(), CurationError>;

    /// Upsert parent-child hierarchy edges
    async fn upsert_topic_edges(&self, edges: &[TopicEdge]) -> Result<(), CurationError>;

    /// Bulk-insert message records with conformance status attached
    async fn insert_message_records(&self, records: &[MessageRecord]) -> Result<(), CurationError>;

    /// Insert one lineage row (fire-and-forget path, failures are counted)
    async fn insert_lineage(&self, record: &LineageRecord) -> Result<(), CurationError>;

    /// Delete message records older than the cutoff, returning the count
    async fn purge_message_records_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CurationError>;
}

//! # Store
//!
//! Persistent store backends behind the `CurationStore` trait.
//!
//! Responsibilities:
//! - SQLite-backed store (approved mappings/bindings, topic hierarchy,
//!   message records, lineage) with grouped writes per batch
//! - In-memory store with failure injection for tests
//! - Snapshot loaders adapting the store to the cache crate
//! - Retention job purging aged message records
//!
//! The hot message path never queries the store directly; full-table
//! fetches happen only at cache-refresh time, and the batch worker issues
//! grouped writes.

mod loaders;
mod memory;
mod retention;
mod sqlite;

pub use loaders::{BindingLoader, MappingLoader};
pub use memory::MemoryStore;
pub use retention::RetentionJob;
pub use sqlite::SqliteStore;

//! SnapshotLoader trait - authoritative-store fetch abstraction
//!
//! One loader per cache; the store crate provides implementations that run
//! the full-table queries.

use std::collections::HashMap;

use contracts::CurationError;

/// Full-snapshot loader trait
///
/// Called once at cache start and then on every refresh tick. The loader
/// returns the complete entry table; partial updates do not exist, which
/// is what guarantees "at most one active entry per key" per snapshot.
#[trait_variant::make(SnapshotLoader: Send)]
pub trait LocalSnapshotLoader: Sync {
    /// Entry type held by the cache
    type Entry: Clone + Send + Sync + 'static;

    /// Fetch the complete entry table from the authoritative store
    async fn load(&self) -> Result<HashMap<String, Self::Entry>, CurationError>;
}

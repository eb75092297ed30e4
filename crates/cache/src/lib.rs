//! # Cache
//!
//! Cache-aside snapshot caches for approved mappings and schema bindings.
//!
//! Responsibilities:
//! - Lock-cheap reads against an `Arc` snapshot replaced wholesale
//! - Background refresh on a fixed interval; failed refreshes keep the
//!   previous snapshot
//! - Hit/miss accounting for observability
//!
//! Approval of a mapping or binding is a human-in-the-loop action outside
//! this pipeline; staleness up to one refresh interval is the accepted
//! price for never blocking the hot message path.

mod handle;
mod loader;
mod snapshot;

pub use handle::CacheHandle;
pub use loader::{LocalSnapshotLoader, SnapshotLoader};
pub use snapshot::{CacheStats, SnapshotCache};

use contracts::{Binding, Mapping};

/// Snapshot cache of `raw_topic -> Mapping`
pub type MappingCache = SnapshotCache<Mapping>;

/// Snapshot cache of `topic -> Binding`
pub type BindingCache = SnapshotCache<Binding>;

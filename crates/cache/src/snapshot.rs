//! SnapshotCache - read-mostly table with wholesale snapshot replacement
//!
//! Readers clone an `Arc` to the current snapshot; the single refresh task
//! replaces the `Arc` rather than mutating entries in place, so a reader
//! never observes a half-updated table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Immutable snapshot of the cached table
struct Snapshot<E> {
    entries: HashMap<String, E>,
    last_refresh_at: Option<DateTime<Utc>>,
}

impl<E> Snapshot<E> {
    fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            last_refresh_at: None,
        }
    }
}

/// Read-mostly cache with hit/miss accounting
pub struct SnapshotCache<E> {
    name: String,
    snapshot: RwLock<Arc<Snapshot<E>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    refresh_failures: AtomicU64,
}

impl<E: Clone> SnapshotCache<E> {
    /// Create an empty cache
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            refresh_failures: AtomicU64::new(0),
        }
    }

    /// Cache name (used for logging/metrics)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// O(1) lookup against the current snapshot.
    ///
    /// Never blocks on a refresh: the read lock is held only for the
    /// duration of an `Arc` clone.
    pub fn get(&self, key: &str) -> Option<E> {
        let snapshot = self.current();
        match snapshot.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Replace the snapshot wholesale (refresh task only)
    pub fn install(&self, entries: HashMap<String, E>) {
        let snapshot = Arc::new(Snapshot {
            entries,
            last_refresh_at: Some(Utc::now()),
        });
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
        metrics::gauge!("curator_cache_entries", "cache" => self.name.clone())
            .set(self.len() as f64);
    }

    /// Record a failed refresh (previous snapshot stays authoritative)
    pub fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("curator_cache_refresh_failures_total", "cache" => self.name.clone())
            .increment(1);
    }

    /// Entry count of the current snapshot
    pub fn len(&self) -> usize {
        self.current().entries.len()
    }

    /// Whether the current snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the initial load has completed
    pub fn is_loaded(&self) -> bool {
        self.current().last_refresh_at.is_some()
    }

    /// Observability snapshot
    pub fn stats(&self) -> CacheStats {
        let snapshot = self.current();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            size: snapshot.entries.len(),
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            last_refresh_at: snapshot.last_refresh_at,
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
        }
    }

    fn current(&self) -> Arc<Snapshot<E>> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }
}

/// Snapshot of cache metrics (for reporting)
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub refresh_failures: u64,
}

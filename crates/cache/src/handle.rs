//! CacheHandle - owns the refresh task of one snapshot cache
//!
//! The handle is created by `start`, which performs the initial full load
//! (a failure there is fatal to service startup) and then schedules the
//! recurring refresh. `stop` cancels the task and awaits it.

use std::sync::Arc;
use std::time::Duration;

use contracts::CurationError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::loader::SnapshotLoader;
use crate::snapshot::SnapshotCache;

/// Handle to a running snapshot cache
pub struct CacheHandle<E> {
    cache: Arc<SnapshotCache<E>>,
    task: JoinHandle<()>,
}

impl<E: Clone + Send + Sync + 'static> CacheHandle<E> {
    /// Perform the initial load and start the refresh task.
    ///
    /// # Errors
    /// Returns the initial load error; an empty cache is acceptable, an
    /// unloaded one is not.
    #[instrument(name = "cache_start", skip(loader), fields(cache = %name, interval_secs = interval.as_secs()))]
    pub async fn start<L>(
        name: &str,
        loader: L,
        interval: Duration,
    ) -> Result<Self, CurationError>
    where
        L: SnapshotLoader<Entry = E> + Send + Sync + 'static,
    {
        let cache = Arc::new(SnapshotCache::new(name));

        let entries = loader
            .load()
            .await
            .map_err(|e| CurationError::cache_refresh(name, format!("initial load: {e}")))?;
        info!(cache = %name, entries = entries.len(), "cache initial load complete");
        cache.install(entries);

        let task = tokio::spawn(refresh_loop(Arc::clone(&cache), loader, interval));

        Ok(Self { cache, task })
    }

    /// Shared read handle for consumers
    pub fn cache(&self) -> Arc<SnapshotCache<E>> {
        Arc::clone(&self.cache)
    }

    /// Cancel the refresh task and await its completion
    pub async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
        debug!(cache = %self.cache.name(), "cache refresh task stopped");
    }
}

/// Recurring refresh loop; a failed refresh keeps the previous snapshot
async fn refresh_loop<E, L>(cache: Arc<SnapshotCache<E>>, loader: L, interval: Duration)
where
    E: Clone + Send + Sync + 'static,
    L: SnapshotLoader<Entry = E> + Send + Sync,
{
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);

    loop {
        ticker.tick().await;
        match loader.load().await {
            Ok(entries) => {
                debug!(cache = %cache.name(), entries = entries.len(), "cache refreshed");
                cache.install(entries);
            }
            Err(e) => {
                warn!(cache = %cache.name(), error = %e, "cache refresh failed, serving previous snapshot");
                cache.record_refresh_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Loader over a shared backing table, with injectable failure
    struct TableLoader {
        table: Arc<Mutex<HashMap<String, u32>>>,
        fail: Arc<AtomicBool>,
    }

    impl crate::loader::SnapshotLoader for TableLoader {
        type Entry = u32;

        async fn load(&self) -> Result<HashMap<String, u32>, CurationError> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(CurationError::store_query("injected failure"));
            }
            Ok(self.table.lock().unwrap().clone())
        }
    }

    fn loader(
        table: &Arc<Mutex<HashMap<String, u32>>>,
        fail: &Arc<AtomicBool>,
    ) -> TableLoader {
        TableLoader {
            table: Arc::clone(table),
            fail: Arc::clone(fail),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_bounded_by_refresh_interval() {
        let table = Arc::new(Mutex::new(HashMap::from([("a".to_string(), 1u32)])));
        let fail = Arc::new(AtomicBool::new(false));

        let handle = CacheHandle::start("test", loader(&table, &fail), Duration::from_secs(30))
            .await
            .unwrap();
        let cache = handle.cache();

        assert_eq!(cache.get("a"), Some(1));
        assert!(cache.get("b").is_none());

        // New entry lands in the backing store
        table.lock().unwrap().insert("b".to_string(), 2);

        // Before the interval elapses the old snapshot serves
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(cache.get("b").is_none());

        // Strictly past the interval the new entry is visible
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(cache.get("b"), Some(2));

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let table = Arc::new(Mutex::new(HashMap::from([("a".to_string(), 1u32)])));
        let fail = Arc::new(AtomicBool::new(false));

        let handle = CacheHandle::start("test", loader(&table, &fail), Duration::from_secs(5))
            .await
            .unwrap();
        let cache = handle.cache();

        fail.store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(12)).await;

        assert_eq!(cache.get("a"), Some(1));
        assert!(cache.stats().refresh_failures >= 1);

        // Recovery resumes refreshes
        fail.store(false, Ordering::Relaxed);
        table.lock().unwrap().insert("b".to_string(), 2);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(cache.get("b"), Some(2));

        handle.stop().await;
    }

    #[tokio::test]
    async fn test_initial_load_failure_is_fatal() {
        let table = Arc::new(Mutex::new(HashMap::new()));
        let fail = Arc::new(AtomicBool::new(true));

        let result =
            CacheHandle::start("test", loader(&table, &fail), Duration::from_secs(5)).await;
        assert!(result.is_err());
    }
}

//! TTL-memoised directory listings
//!
//! The cache serves repeated recursive scans of the same directory from
//! memory while the entry is younger than the TTL. Reload passes invalidate
//! explicitly after a sync; a background sweeper evicts entries that simply
//! expired.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::{scan, Result};

/// Default time-to-live for cached listings.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct CacheEntry {
    files: Vec<PathBuf>,
    cached_at: Instant,
}

/// Memoises recursive directory scans with a short TTL and explicit
/// invalidation.
///
/// Cloning is cheap; clones share the same underlying map, so the reload
/// engine, sources, and the health resource can all hold one.
#[derive(Debug, Clone)]
pub struct FileCache {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                entries: Mutex::new(HashMap::new()),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// List regular files under `dir`, recursively.
    ///
    /// Served from cache when `use_cache` is set and the entry is younger
    /// than the TTL; otherwise re-scans and refreshes the entry.
    pub fn list(&self, dir: &Path, use_cache: bool) -> Result<Vec<PathBuf>> {
        if use_cache {
            let entries = self.lock_entries();
            if let Some(entry) = entries.get(dir) {
                if entry.cached_at.elapsed() < self.inner.ttl {
                    return Ok(entry.files.clone());
                }
            }
        }

        let files = scan::list_files(dir)?;
        let mut entries = self.lock_entries();
        entries.insert(
            dir.to_path_buf(),
            CacheEntry {
                files: files.clone(),
                cached_at: Instant::now(),
            },
        );
        Ok(files)
    }

    /// Drop a single entry, or the entire map when `dir` is `None`.
    pub fn invalidate(&self, dir: Option<&Path>) {
        let mut entries = self.lock_entries();
        match dir {
            Some(dir) => {
                entries.remove(dir);
            }
            None => entries.clear(),
        }
    }

    /// Remove all expired entries. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.lock_entries();
        let before = entries.len();
        let ttl = self.inner.ttl;
        entries.retain(|_, entry| entry.cached_at.elapsed() < ttl);
        before - entries.len()
    }

    /// Number of directories currently cached.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the periodic sweeper task. A second call while one is running
    /// is a no-op.
    pub fn start_sweeper(&self, interval: Duration) {
        let mut slot = self.lock_sweeper();
        if slot.is_some() {
            return;
        }
        let cache = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the sweeper
            // only runs after a full interval has passed.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = cache.sweep();
                if swept > 0 {
                    tracing::debug!(swept, "file cache sweep");
                }
            }
        });
        *slot = Some(handle);
    }

    /// Stop the sweeper task. Safe to call when none is running.
    pub fn stop_sweeper(&self) {
        if let Some(handle) = self.lock_sweeper().take() {
            handle.abort();
        }
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, CacheEntry>> {
        self.inner.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_sweeper(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.sweeper.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_list_caches_results() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "x").unwrap();

        let cache = FileCache::new();
        let first = cache.list(temp.path(), true).unwrap();
        assert_eq!(first.len(), 1);

        // A file created after the cached scan is invisible until the entry
        // expires or is invalidated.
        fs::write(temp.path().join("b.yaml"), "y").unwrap();
        let cached = cache.list(temp.path(), true).unwrap();
        assert_eq!(cached.len(), 1);

        let fresh = cache.list(temp.path(), false).unwrap();
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn test_invalidate_single_entry() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "x").unwrap();

        let cache = FileCache::new();
        cache.list(temp.path(), true).unwrap();
        assert_eq!(cache.len(), 1);

        cache.invalidate(Some(temp.path()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("a.yaml"), "x").unwrap();
        fs::write(b.path().join("b.yaml"), "y").unwrap();

        let cache = FileCache::new();
        cache.list(a.path(), true).unwrap();
        cache.list(b.path(), true).unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate(None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_removes_expired() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "x").unwrap();

        let cache = FileCache::with_ttl(Duration::from_millis(0));
        cache.list(temp.path(), true).unwrap();
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_keeps_fresh() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "x").unwrap();

        let cache = FileCache::with_ttl(Duration::from_secs(60));
        cache.list(temp.path(), true).unwrap();
        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_lifecycle_is_idempotent() {
        let cache = FileCache::new();
        cache.start_sweeper(Duration::from_millis(10));
        cache.start_sweeper(Duration::from_millis(10));
        cache.stop_sweeper();
        cache.stop_sweeper();
    }

    #[tokio::test]
    async fn test_sweeper_evicts_in_background() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "x").unwrap();

        let cache = FileCache::with_ttl(Duration::from_millis(5));
        cache.list(temp.path(), true).unwrap();
        cache.start_sweeper(Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_empty());
        cache.stop_sweeper();
    }
}

//! Watcher and poller lifecycles
//!
//! `LocalWatcher` turns filesystem events into debounced per-file change
//! callbacks; `GitPoller` turns remote-head movement into bulk update
//! callbacks. Both are scoped resources: started once, stopped explicitly,
//! safe to stop twice, and they release their OS handles and timers on
//! stop.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{Error, Result};

/// A file must be quiet this long before its change callback fires.
pub const DEBOUNCE_STABILITY: Duration = Duration::from_millis(300);

/// How often the debouncer checks for quiet files.
pub const DEBOUNCE_POLL: Duration = Duration::from_millis(100);

fn is_watchable(path: &Path) -> bool {
    matches!(
        path.extension().and_then(OsStr::to_str),
        Some("yaml") | Some("yml")
    )
}

/// Filesystem watcher for a local source tree.
///
/// Create/modify/delete events for `.yaml`/`.yml` files are debounced per
/// file; bursts inside the stability window collapse into one callback
/// with the absolute file path.
pub struct LocalWatcher {
    running: Arc<AtomicBool>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocalWatcher {
    /// Start watching `watch_root` recursively.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Watch`] when the OS watcher cannot be created
    /// or attached.
    pub fn start<F, Fut>(watch_root: &Path, on_change: F) -> Result<Self>
    where
        F: Fn(PathBuf) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    );
                    if !relevant {
                        return;
                    }
                    for path in event.paths {
                        if is_watchable(&path) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "file watcher error");
                }
            }
        })
        .map_err(|e| Error::watch(format!("cannot create watcher: {e}")))?;

        watcher
            .watch(watch_root, RecursiveMode::Recursive)
            .map_err(|e| Error::watch(format!("cannot watch {}: {e}", watch_root.display())))?;

        tracing::info!(root = ?watch_root, "file watcher started");

        let running = Arc::new(AtomicBool::new(true));
        let running_task = running.clone();
        let task = tokio::spawn(async move {
            let mut pending: HashMap<PathBuf, Instant> = HashMap::new();
            let mut ticker = tokio::time::interval(DEBOUNCE_POLL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !running_task.load(Ordering::SeqCst) {
                    break;
                }
                while let Ok(path) = rx.try_recv() {
                    pending.insert(path, Instant::now());
                }
                let due: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, seen)| seen.elapsed() >= DEBOUNCE_STABILITY)
                    .map(|(path, _)| path.clone())
                    .collect();
                for path in due {
                    pending.remove(&path);
                    tracing::debug!(path = ?path, "file stable, dispatching change");
                    on_change(path).await;
                }
            }
            tracing::debug!("file watcher task exited");
        });

        Ok(Self {
            running,
            watcher: Mutex::new(Some(watcher)),
            task: Mutex::new(Some(task)),
        })
    }

    /// Stop watching. Releases the OS watch and the debounce task; calling
    /// this twice is harmless.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.lock().unwrap_or_else(|e| e.into_inner()).take() {
            drop(watcher);
        }
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }
}

impl Drop for LocalWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodic remote-head poller for a git source.
///
/// Each tick fetches and compares `origin/<branch>` against the last seen
/// hash. The first tick only records. When the hash moves, `on_update`
/// runs; the remembered hash advances only when it reports success, so a
/// failed reload is retried on the next tick.
pub struct GitPoller {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl GitPoller {
    pub fn start<F, Fut>(
        target: PathBuf,
        branch: String,
        interval: Duration,
        on_update: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        let task = tokio::spawn(async move {
            let mut last_seen: Option<String> = None;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval fires immediately; the first poll should wait a full
            // period.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match prompt_git::remote_head(&target, &branch) {
                    Ok(hash) => match &last_seen {
                        None => {
                            tracing::debug!(hash = %hash, "recorded initial remote head");
                            last_seen = Some(hash);
                        }
                        Some(previous) if *previous == hash => {}
                        Some(previous) => {
                            tracing::info!(from = %previous, to = %hash, "remote branch moved");
                            if on_update().await {
                                last_seen = Some(hash);
                            } else {
                                tracing::warn!("update failed, will retry on next poll");
                            }
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "remote poll failed");
                    }
                }
            }
        });

        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop polling. Safe to call twice.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }
}

impl Drop for GitPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

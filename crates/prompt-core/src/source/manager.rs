//! Source manager
//!
//! Owns the prioritised user sources plus the optional system source,
//! drives the initial load, and swaps the active source at runtime for
//! `switch_source`. Watcher and poller lifecycles belong to the server;
//! the manager only says what to watch.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use prompt_fs::FileCache;

use super::{make_source, SourceKind, SourceStrategy};
use crate::config::Config;
use crate::{Error, Result};

pub struct SourceManager {
    sources: Vec<Arc<dyn SourceStrategy>>,
    active: RwLock<Arc<dyn SourceStrategy>>,
    system: Option<Arc<dyn SourceStrategy>>,
    target_dir: PathBuf,
    system_dir: PathBuf,
    git_branch: String,
    git_max_retries: u32,
    cache: FileCache,
}

impl SourceManager {
    /// Build the manager from configuration. Sources are constructed but
    /// not yet synced; call [`SourceManager::initial_load`].
    pub fn from_config(config: &Config, cache: FileCache) -> Result<Self> {
        let sources: Vec<Arc<dyn SourceStrategy>> = config
            .repo_urls
            .iter()
            .map(|url| {
                make_source(url, &config.git_branch, config.git_max_retries, cache.clone())
            })
            .collect::<Result<_>>()?;
        if sources.is_empty() {
            return Err(Error::config("no sources configured"));
        }

        let system = config
            .system_repo_url
            .as_ref()
            .map(|url| make_source(url, &config.git_branch, config.git_max_retries, cache.clone()))
            .transpose()?;

        let active = sources[0].clone();
        Ok(Self {
            sources,
            active: RwLock::new(active),
            system,
            target_dir: config.storage_dir.clone(),
            system_dir: config.system_dir(),
            git_branch: config.git_branch.clone(),
            git_max_retries: config.git_max_retries,
            cache,
        })
    }

    /// Validate and sync user sources in priority order; the first that
    /// succeeds becomes active. Then sync the system source, whose failure
    /// is reported but never fatal.
    ///
    /// # Errors
    ///
    /// [`Error::Load`] aggregating every per-source failure when no user
    /// source loads.
    pub fn initial_load(&self) -> Result<()> {
        let mut failures = Vec::new();
        let mut loaded = false;

        for source in &self.sources {
            if !source.validate() {
                failures.push(format!("{}: failed validation", source.url()));
                continue;
            }
            match source.sync(&self.target_dir) {
                Ok(()) => {
                    tracing::info!(url = %source.url(), kind = %source.kind().as_str(), "active source loaded");
                    *self.write_active() = source.clone();
                    loaded = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(url = %source.url(), error = %e, "source failed to load");
                    failures.push(format!("{}: {e}", source.url()));
                }
            }
        }

        if !loaded {
            return Err(Error::Load { failures });
        }

        self.sync_system();
        Ok(())
    }

    /// Sync the active source into the target directory.
    pub fn sync_active(&self) -> Result<()> {
        let active = self.active();
        active.sync(&self.target_dir)
    }

    /// Sync the system source, if any. Failure is logged, not returned.
    pub fn sync_system(&self) {
        if let Some(system) = &self.system {
            if let Err(e) = system.sync(&self.system_dir) {
                tracing::warn!(url = %system.url(), error = %e, "system source failed, continuing without");
            }
        }
    }

    /// Replace the active source with a new one built from `url`.
    ///
    /// The new source is validated and synced before the swap; failure
    /// leaves the previous active source in place.
    pub fn switch_source(&self, url: &str, branch: Option<&str>) -> Result<()> {
        let branch = branch.unwrap_or(&self.git_branch);
        let source = make_source(url, branch, self.git_max_retries, self.cache.clone())?;
        if !source.validate() {
            return Err(Error::config(format!("source failed validation: {url}")));
        }
        source.sync(&self.target_dir)?;
        tracing::info!(url, branch, "switched active source");
        *self.write_active() = source;
        Ok(())
    }

    pub fn active(&self) -> Arc<dyn SourceStrategy> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn system(&self) -> Option<Arc<dyn SourceStrategy>> {
        self.system.clone()
    }

    pub fn has_system(&self) -> bool {
        self.system.is_some()
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn system_dir(&self) -> &Path {
        &self.system_dir
    }

    pub fn git_branch(&self) -> &str {
        &self.git_branch
    }

    /// Directory the local watcher should observe for the active source.
    pub fn watch_root(&self) -> PathBuf {
        self.active().watch_root(&self.target_dir)
    }

    /// Directory a watcher on the system source would observe, if one is
    /// configured.
    pub fn system_watch_root(&self) -> Option<PathBuf> {
        self.system
            .as_ref()
            .map(|source| source.watch_root(&self.system_dir))
    }

    /// Whether the active source delivers per-file events (local) or bulk
    /// updates (git).
    pub fn active_kind(&self) -> SourceKind {
        self.active().kind()
    }

    fn write_active(&self) -> std::sync::RwLockWriteGuard<'_, Arc<dyn SourceStrategy>> {
        self.active.write().unwrap_or_else(|e| e.into_inner())
    }
}

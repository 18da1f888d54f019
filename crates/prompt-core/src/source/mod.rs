//! Prompt sources
//!
//! A source is where prompt documents come from: a local directory or a
//! git remote. The trait is the seam; the manager owns a prioritised list
//! of sources and drives their lifecycle.

mod git;
mod local;
mod manager;

pub use git::GitSource;
pub use local::LocalSource;
pub use manager::SourceManager;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use prompt_fs::FileCache;

use crate::{Error, Result};

/// Variant tag for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Git,
    Local,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Local => "local",
        }
    }
}

/// Strategy interface over `{LocalSource, GitSource}`.
pub trait SourceStrategy: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Canonical identifier of the source (URL or absolute path).
    fn url(&self) -> &str;

    /// Cheap check: parseable URL or extant directory. No I/O beyond a
    /// stat.
    fn validate(&self) -> bool;

    /// Bring `target` in step with the source.
    fn sync(&self, target: &Path) -> Result<()>;

    /// Directory the change watcher should observe. Local sources watch
    /// the authored tree itself; everything else watches the target.
    fn watch_root(&self, target: &Path) -> PathBuf {
        target.to_path_buf()
    }
}

/// Build the right strategy for `url`.
///
/// # Errors
///
/// Fails with [`Error::Config`] when the URL is rejected by validation.
pub fn make_source(
    url: &str,
    branch: &str,
    max_retries: u32,
    cache: FileCache,
) -> Result<Arc<dyn SourceStrategy>> {
    prompt_fs::validate_source(url).map_err(|e| Error::config(e.to_string()))?;
    if prompt_fs::is_git_url(url) {
        Ok(Arc::new(GitSource::new(url, branch, max_retries, cache)))
    } else {
        Ok(Arc::new(LocalSource::new(url, cache)))
    }
}

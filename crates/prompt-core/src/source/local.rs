//! Local directory source

use std::path::{Path, PathBuf};

use prompt_fs::FileCache;

use super::{SourceKind, SourceStrategy};
use crate::Result;

/// A prompt repository that is a directory on this machine.
pub struct LocalSource {
    path: PathBuf,
    cache: FileCache,
}

impl LocalSource {
    pub fn new(path: impl Into<PathBuf>, cache: FileCache) -> Self {
        Self {
            path: path.into(),
            cache,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `target` is the source directory itself ("direct read
    /// mode"), compared after resolving symlinks.
    fn is_direct(&self, target: &Path) -> bool {
        match (self.path.canonicalize(), target.canonicalize()) {
            (Ok(source), Ok(target)) => source == target,
            _ => false,
        }
    }
}

impl SourceStrategy for LocalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn url(&self) -> &str {
        self.path.to_str().unwrap_or_default()
    }

    fn validate(&self) -> bool {
        self.path.is_absolute() && self.path.is_dir()
    }

    fn sync(&self, target: &Path) -> Result<()> {
        if self.is_direct(target) {
            tracing::debug!(path = ?self.path, "direct read mode, skipping copy");
        } else {
            prompt_fs::mirror_tree(&self.path, target)?;
        }
        self.cache.invalidate(Some(target));
        Ok(())
    }

    fn watch_root(&self, _target: &Path) -> PathBuf {
        self.path.clone()
    }
}

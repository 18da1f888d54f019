//! Git remote source

use std::path::Path;

use prompt_fs::FileCache;

use super::{SourceKind, SourceStrategy};
use crate::Result;

/// A prompt repository reached over git.
pub struct GitSource {
    url: String,
    branch: String,
    max_retries: u32,
    cache: FileCache,
}

impl GitSource {
    pub fn new(
        url: impl Into<String>,
        branch: impl Into<String>,
        max_retries: u32,
        cache: FileCache,
    ) -> Self {
        Self {
            url: url.into(),
            branch: branch.into(),
            max_retries,
            cache,
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

impl SourceStrategy for GitSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Git
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn validate(&self) -> bool {
        prompt_fs::is_git_url(&self.url)
    }

    fn sync(&self, target: &Path) -> Result<()> {
        prompt_git::sync_repo(&self.url, target, &self.branch, self.max_retries)?;
        self.cache.invalidate(Some(target));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_git_urls_only() {
        let cache = FileCache::new();
        assert!(GitSource::new("https://example.com/p.git", "main", 3, cache.clone()).validate());
        assert!(GitSource::new("git@github.com:a/p.git", "main", 3, cache.clone()).validate());
        assert!(!GitSource::new("/local/path", "main", 3, cache).validate());
    }

    #[test]
    fn test_sync_failure_propagates_after_retries() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = GitSource::new(
            "https://invalid.invalid/nope.git",
            "main",
            1,
            FileCache::new(),
        );
        assert!(source.sync(&temp.path().join("checkout")).is_err());
    }
}

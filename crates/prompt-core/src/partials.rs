//! Partial registry
//!
//! Named template fragments loaded from `.hbs` files anywhere under the
//! content roots. The registry is rebuilt from scratch on every reload
//! pass; names collide globally and the last one loaded in a pass wins.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use prompt_fs::FileCache;

use crate::{Error, Result};

/// The set of partials for one reload pass.
#[derive(Debug, Clone, Default)]
pub struct PartialRegistry {
    partials: BTreeMap<String, String>,
}

impl PartialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every existing root for `.hbs` files and load them.
    ///
    /// # Errors
    ///
    /// An unreadable root aborts the rebuild; the caller keeps serving the
    /// previous pass, whose compiled templates hold their own copies.
    pub fn scan(cache: &FileCache, roots: &[&Path]) -> Result<Self> {
        let mut registry = Self::new();
        for root in roots {
            if !root.is_dir() {
                continue;
            }
            let files = cache.list(root, false).map_err(Error::Fs)?;
            for file in files {
                if file.extension().and_then(OsStr::to_str) != Some("hbs") {
                    continue;
                }
                let name = match file.file_stem().and_then(OsStr::to_str) {
                    Some(stem) => stem.to_string(),
                    None => continue,
                };
                match fs::read_to_string(&file) {
                    Ok(source) => {
                        if registry.partials.insert(name.clone(), source).is_some() {
                            tracing::debug!(partial = %name, path = ?file, "partial name collision, later file wins");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(path = ?file, error = %e, "cannot read partial, skipping");
                    }
                }
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.partials.insert(name.into(), source.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.partials.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.partials.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partials.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.partials
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_loads_hbs_by_basename() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("role-expert.hbs"), "You are an expert.");
        write(&temp.path().join("common/header.hbs"), "# Header");
        write(&temp.path().join("common/a.yaml"), "id: a");

        let cache = FileCache::new();
        let registry = PartialRegistry::scan(&cache, &[temp.path()]).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("role-expert"), Some("You are an expert."));
        assert_eq!(registry.get("header"), Some("# Header"));
    }

    #[test]
    fn test_scan_merges_multiple_roots() {
        let main = TempDir::new().unwrap();
        let system = TempDir::new().unwrap();
        write(&main.path().join("a.hbs"), "main a");
        write(&system.path().join("b.hbs"), "system b");

        let cache = FileCache::new();
        let registry =
            PartialRegistry::scan(&cache, &[main.path(), system.path()]).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_later_root_wins_on_collision() {
        let main = TempDir::new().unwrap();
        let system = TempDir::new().unwrap();
        write(&main.path().join("shared.hbs"), "from main");
        write(&system.path().join("shared.hbs"), "from system");

        let cache = FileCache::new();
        let registry =
            PartialRegistry::scan(&cache, &[main.path(), system.path()]).unwrap();
        assert_eq!(registry.get("shared"), Some("from system"));
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let main = TempDir::new().unwrap();
        write(&main.path().join("a.hbs"), "a");

        let cache = FileCache::new();
        let missing = main.path().join("no_system_dir");
        let registry = PartialRegistry::scan(&cache, &[main.path(), &missing]).unwrap();
        assert_eq!(registry.len(), 1);
    }
}

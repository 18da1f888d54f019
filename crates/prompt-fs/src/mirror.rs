//! Local tree mirroring
//!
//! Copies a local prompt repository into the storage directory, skipping
//! tooling directories that never contain prompt documents. Individual copy
//! failures are logged and skipped so one unreadable file cannot abort a
//! whole sync.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Directory basenames (lowercased) never copied into the mirror.
pub const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    ".ds_store",
    ".vscode",
    ".idea",
    "dist",
    "build",
    ".next",
    ".nuxt",
    ".cache",
    "coverage",
    ".nyc_output",
];

fn is_excluded(name: &OsStr) -> bool {
    let lower = name.to_string_lossy().to_lowercase();
    EXCLUDED_DIRS.contains(&lower.as_str())
}

/// Mirror `source` into `target`, including removal of entries that no
/// longer exist in the source.
///
/// # Errors
///
/// Fails only when `source` is not a directory or `target` cannot be
/// created; per-entry failures inside the tree are logged at warn and
/// skipped.
pub fn mirror_tree(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(Error::NotADirectory {
            path: source.to_path_buf(),
        });
    }
    fs::create_dir_all(target).map_err(|e| Error::io(target, e))?;
    copy_dir(source, target);
    prune_dir(source, target);
    Ok(())
}

fn copy_dir(source: &Path, target: &Path) {
    let entries = match fs::read_dir(source) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = ?source, error = %e, "cannot read directory during mirror");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = ?source, error = %e, "unreadable directory entry");
                continue;
            }
        };
        let name = entry.file_name();
        if is_excluded(&name) {
            continue;
        }

        let src = entry.path();
        let dst = target.join(&name);
        // symlink_metadata so links are detected instead of followed
        let file_type = match fs::symlink_metadata(&src) {
            Ok(meta) => meta.file_type(),
            Err(e) => {
                tracing::warn!(path = ?src, error = %e, "cannot stat entry");
                continue;
            }
        };

        if file_type.is_symlink() {
            tracing::warn!(path = ?src, "skipping symlink during mirror");
        } else if file_type.is_dir() {
            if let Err(e) = fs::create_dir_all(&dst) {
                tracing::warn!(path = ?dst, error = %e, "cannot create mirror directory");
                continue;
            }
            copy_dir(&src, &dst);
        } else if file_type.is_file() {
            if let Err(e) = fs::copy(&src, &dst) {
                tracing::warn!(from = ?src, to = ?dst, error = %e, "copy failed");
            }
        } else {
            tracing::warn!(path = ?src, "skipping non-regular file during mirror");
        }
    }
}

/// Remove entries from `target` that have no counterpart in `source`.
/// Excluded names are left alone since they were never copied.
fn prune_dir(source: &Path, target: &Path) {
    let entries = match fs::read_dir(target) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = ?target, error = %e, "cannot read mirror directory during prune");
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        if is_excluded(&name) {
            continue;
        }
        let dst = entry.path();
        let src = source.join(&name);
        let src_exists = fs::symlink_metadata(&src)
            .map(|meta| !meta.file_type().is_symlink())
            .unwrap_or(false);

        if !src_exists {
            let result = if dst.is_dir() {
                fs::remove_dir_all(&dst)
            } else {
                fs::remove_file(&dst)
            };
            if let Err(e) = result {
                tracing::warn!(path = ?dst, error = %e, "cannot prune stale mirror entry");
            }
            continue;
        }
        if dst.is_dir() && src.is_dir() {
            prune_dir(&src, &dst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_mirrors_regular_files() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        touch(&source.path().join("a.yaml"), "id: a");
        touch(&source.path().join("common/b.yaml"), "id: b");

        mirror_tree(source.path(), target.path()).unwrap();

        assert!(target.path().join("a.yaml").is_file());
        assert!(target.path().join("common/b.yaml").is_file());
        assert_eq!(
            fs::read_to_string(target.path().join("common/b.yaml")).unwrap(),
            "id: b"
        );
    }

    #[test]
    fn test_skips_excluded_directories() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        touch(&source.path().join("node_modules/pkg/index.js"), "x");
        touch(&source.path().join(".git/HEAD"), "ref");
        touch(&source.path().join("Dist/out.js"), "x"); // case-insensitive
        touch(&source.path().join("keep.yaml"), "id: keep");

        mirror_tree(source.path(), target.path()).unwrap();

        assert!(!target.path().join("node_modules").exists());
        assert!(!target.path().join(".git").exists());
        assert!(!target.path().join("Dist").exists());
        assert!(target.path().join("keep.yaml").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_skips_symlinks() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        touch(&source.path().join("real.yaml"), "id: real");
        std::os::unix::fs::symlink(
            source.path().join("real.yaml"),
            source.path().join("link.yaml"),
        )
        .unwrap();

        mirror_tree(source.path(), target.path()).unwrap();

        assert!(target.path().join("real.yaml").is_file());
        assert!(!target.path().join("link.yaml").exists());
    }

    #[test]
    fn test_missing_source_is_error() {
        let target = TempDir::new().unwrap();
        let result = mirror_tree(Path::new("/nonexistent/prompts"), target.path());
        assert!(matches!(result, Err(Error::NotADirectory { .. })));
    }

    #[test]
    fn test_mirror_prunes_deleted_files() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        touch(&source.path().join("keep.yaml"), "id: keep");
        touch(&source.path().join("group/drop.yaml"), "id: drop");

        mirror_tree(source.path(), target.path()).unwrap();
        assert!(target.path().join("group/drop.yaml").is_file());

        fs::remove_file(source.path().join("group/drop.yaml")).unwrap();
        mirror_tree(source.path(), target.path()).unwrap();

        assert!(target.path().join("keep.yaml").is_file());
        assert!(!target.path().join("group/drop.yaml").exists());
    }

    #[test]
    fn test_mirror_prunes_deleted_directories() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        touch(&source.path().join("old/a.yaml"), "id: a");

        mirror_tree(source.path(), target.path()).unwrap();
        fs::remove_dir_all(source.path().join("old")).unwrap();
        mirror_tree(source.path(), target.path()).unwrap();

        assert!(!target.path().join("old").exists());
    }
}

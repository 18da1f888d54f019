//! Group computation and filtering
//!
//! A document's group is the first path segment relative to the repository
//! root; files directly under the root belong to the `root` group. The
//! filter decides which groups are loaded for the configured active set.

use std::collections::BTreeSet;
use std::path::Path;

/// Group of files that live directly under the repository root.
pub const ROOT_GROUP: &str = "root";

/// Group served by the system source.
pub const COMMON_GROUP: &str = "common";

/// Compute the group of `file` relative to `root`.
///
/// Files outside `root` (which should not happen in practice) fall back to
/// the root group.
pub fn group_of(root: &Path, file: &Path) -> String {
    let relative = match file.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => return ROOT_GROUP.to_string(),
    };
    let mut components = relative.components();
    let first = components.next();
    match (first, components.next()) {
        // Exactly one component means the file sits directly under root.
        (Some(_), None) | (None, _) => ROOT_GROUP.to_string(),
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
    }
}

/// Decides which groups are loaded.
#[derive(Debug, Clone)]
pub struct GroupFilter {
    active: BTreeSet<String>,
    has_system_source: bool,
}

impl GroupFilter {
    pub fn new(active: impl IntoIterator<Item = String>, has_system_source: bool) -> Self {
        Self {
            active: active.into_iter().collect(),
            has_system_source,
        }
    }

    /// Whether documents in `group` are loaded from a *user* source.
    pub fn allows(&self, group: &str) -> bool {
        if group == ROOT_GROUP {
            return true;
        }
        if group == COMMON_GROUP {
            return self.has_system_source || self.active.contains(COMMON_GROUP);
        }
        self.active.contains(group)
    }

    /// Whether documents in `group` are loaded from the *system* source.
    ///
    /// The system source only ever supplies `common`; everything else in it
    /// is silently ignored.
    pub fn allows_system(&self, group: &str) -> bool {
        group == COMMON_GROUP
    }

    pub fn active_groups(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }
}

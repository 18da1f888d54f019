//! Authoritative runtime state
//!
//! Three indices, mutated only by the reload engine: id to runtime record,
//! file path to id, and id to tool handle. A full reload publishes all
//! three atomically, so concurrent readers see either the old or the new
//! state, never a mix.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Serialize;

use prompt_meta::{PromptRuntime, RuntimeState};

use crate::tools::ToolHandle;

/// Per-state totals for `stats` and the health resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub total: usize,
    pub active: usize,
    pub legacy: usize,
    pub invalid: usize,
    pub disabled: usize,
    pub warning: usize,
}

#[derive(Debug, Default)]
struct StoreInner {
    prompts: HashMap<String, PromptRuntime>,
    by_path: HashMap<PathBuf, String>,
    handles: HashMap<String, ToolHandle>,
}

/// The runtime store. Shared by reference; all mutation goes through the
/// reload engine.
#[derive(Debug, Default)]
pub struct RuntimeStore {
    inner: RwLock<StoreInner>,
}

impl RuntimeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire state in one step.
    pub fn replace_all(
        &self,
        prompts: HashMap<String, PromptRuntime>,
        by_path: HashMap<PathBuf, String>,
        handles: HashMap<String, ToolHandle>,
    ) {
        let mut inner = self.write();
        inner.prompts = prompts;
        inner.by_path = by_path;
        inner.handles = handles;
    }

    /// Insert or update one prompt, with its handle when it is a tool.
    pub fn upsert(&self, runtime: PromptRuntime, handle: Option<ToolHandle>) {
        let mut inner = self.write();
        inner
            .by_path
            .insert(runtime.file_path.clone(), runtime.id.clone());
        match handle {
            Some(handle) => {
                inner.handles.insert(runtime.id.clone(), handle);
            }
            None => {
                inner.handles.remove(&runtime.id);
            }
        }
        inner.prompts.insert(runtime.id.clone(), runtime);
    }

    /// Remove whatever `path` contributed.
    ///
    /// Returns the id it mapped to and, when this path was the
    /// authoritative file for that id, the tool handle that must now be
    /// removed from the registry.
    pub fn remove_by_path(&self, path: &Path) -> Option<(String, Option<ToolHandle>)> {
        let mut inner = self.write();
        let id = inner.by_path.remove(path)?;
        let authoritative = inner
            .prompts
            .get(&id)
            .map(|r| r.file_path == path)
            .unwrap_or(false);
        if authoritative {
            inner.prompts.remove(&id);
            let handle = inner.handles.remove(&id);
            Some((id, handle))
        } else {
            Some((id, None))
        }
    }

    pub fn get(&self, id: &str) -> Option<PromptRuntime> {
        self.read().prompts.get(id).cloned()
    }

    pub fn id_for_path(&self, path: &Path) -> Option<String> {
        self.read().by_path.get(path).cloned()
    }

    pub fn handle(&self, id: &str) -> Option<ToolHandle> {
        self.read().handles.get(id).cloned()
    }

    /// Snapshot of every handle, keyed by id.
    pub fn handles(&self) -> HashMap<String, ToolHandle> {
        self.read().handles.clone()
    }

    /// Snapshot of every runtime record.
    pub fn snapshot(&self) -> Vec<PromptRuntime> {
        let mut all: Vec<PromptRuntime> = self.read().prompts.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Number of prompt ids currently registered as tools.
    pub fn loaded_count(&self) -> usize {
        self.read().handles.len()
    }

    pub fn len(&self) -> usize {
        self.read().prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct groups present, sorted.
    pub fn groups(&self) -> Vec<String> {
        let inner = self.read();
        let mut groups: Vec<String> = inner
            .prompts
            .values()
            .map(|r| r.group.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        groups.sort();
        groups
    }

    pub fn counts(&self) -> StateCounts {
        let inner = self.read();
        let mut counts = StateCounts {
            total: inner.prompts.len(),
            ..StateCounts::default()
        };
        for runtime in inner.prompts.values() {
            match runtime.runtime_state {
                RuntimeState::Active => counts.active += 1,
                RuntimeState::Legacy => counts.legacy += 1,
                RuntimeState::Invalid => counts.invalid += 1,
                RuntimeState::Disabled => counts.disabled += 1,
                RuntimeState::Warning => counts.warning += 1,
            }
        }
        counts
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_meta::{PromptStatus, SourceKind};

    fn runtime(id: &str, state: RuntimeState, path: &str) -> PromptRuntime {
        PromptRuntime {
            id: id.to_string(),
            title: id.to_string(),
            description: None,
            version: None,
            status: PromptStatus::Legacy,
            tags: Vec::new(),
            use_cases: Vec::new(),
            runtime_state: state,
            source: SourceKind::Legacy,
            group: "root".to_string(),
            visibility: None,
            file_path: PathBuf::from(path),
        }
    }

    fn handle(id: &str, serial: u64) -> ToolHandle {
        ToolHandle {
            id: id.to_string(),
            serial,
        }
    }

    #[test]
    fn test_replace_all_swaps_every_index() {
        let store = RuntimeStore::new();
        store.upsert(runtime("old", RuntimeState::Legacy, "/r/old.yaml"), Some(handle("old", 1)));

        let mut prompts = HashMap::new();
        prompts.insert("new".to_string(), runtime("new", RuntimeState::Active, "/r/new.yaml"));
        let mut by_path = HashMap::new();
        by_path.insert(PathBuf::from("/r/new.yaml"), "new".to_string());
        let mut handles = HashMap::new();
        handles.insert("new".to_string(), handle("new", 2));
        store.replace_all(prompts, by_path, handles);

        assert!(store.get("old").is_none());
        assert!(store.handle("old").is_none());
        assert!(store.id_for_path(Path::new("/r/old.yaml")).is_none());
        assert_eq!(store.get("new").unwrap().id, "new");
        assert_eq!(store.loaded_count(), 1);
    }

    #[test]
    fn test_counts_by_state() {
        let store = RuntimeStore::new();
        store.upsert(runtime("a", RuntimeState::Active, "/r/a.yaml"), Some(handle("a", 1)));
        store.upsert(runtime("b", RuntimeState::Legacy, "/r/b.yaml"), Some(handle("b", 2)));
        store.upsert(runtime("c", RuntimeState::Warning, "/r/c.yaml"), None);
        store.upsert(runtime("d", RuntimeState::Disabled, "/r/d.yaml"), None);

        let counts = store.counts();
        assert_eq!(counts.total, 4);
        assert_eq!(counts.active, 1);
        assert_eq!(counts.legacy, 1);
        assert_eq!(counts.warning, 1);
        assert_eq!(counts.disabled, 1);
        assert_eq!(counts.invalid, 0);
        assert_eq!(store.loaded_count(), 2);
    }

    #[test]
    fn test_remove_by_path_authoritative() {
        let store = RuntimeStore::new();
        store.upsert(runtime("a", RuntimeState::Active, "/r/a.yaml"), Some(handle("a", 1)));

        let (id, removed) = store.remove_by_path(Path::new("/r/a.yaml")).unwrap();
        assert_eq!(id, "a");
        assert_eq!(removed, Some(handle("a", 1)));
        assert!(store.get("a").is_none());
        assert_eq!(store.loaded_count(), 0);
    }

    #[test]
    fn test_remove_by_path_shadow_keeps_winner() {
        let store = RuntimeStore::new();
        // Winner lives at one path; a shadow file elsewhere maps to the
        // same id.
        store.upsert(runtime("a", RuntimeState::Active, "/r/win/a.yaml"), Some(handle("a", 1)));
        {
            let mut inner = store.inner.write().unwrap();
            inner
                .by_path
                .insert(PathBuf::from("/r/shadow/a.yaml"), "a".to_string());
        }

        let (id, removed) = store.remove_by_path(Path::new("/r/shadow/a.yaml")).unwrap();
        assert_eq!(id, "a");
        assert!(removed.is_none());
        assert!(store.get("a").is_some());
        assert_eq!(store.loaded_count(), 1);
    }

    #[test]
    fn test_remove_unknown_path() {
        let store = RuntimeStore::new();
        assert!(store.remove_by_path(Path::new("/r/none.yaml")).is_none());
    }

    #[test]
    fn test_groups_sorted_distinct() {
        let store = RuntimeStore::new();
        let mut a = runtime("a", RuntimeState::Active, "/r/x/a.yaml");
        a.group = "x".to_string();
        let mut b = runtime("b", RuntimeState::Active, "/r/common/b.yaml");
        b.group = "common".to_string();
        let mut c = runtime("c", RuntimeState::Active, "/r/x/c.yaml");
        c.group = "x".to_string();
        store.upsert(a, None);
        store.upsert(b, None);
        store.upsert(c, None);

        assert_eq!(store.groups(), ["common", "x"]);
    }
}

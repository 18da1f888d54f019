//! The reload engine
//!
//! Orchestrates a reload: sync, scan, parse, rank, dual-swap register, and
//! atomic state publication. All reloads serialise through one lock;
//! concurrent full-reload requests coalesce into a single pass whose
//! result every caller receives. A prompt id that survives a reload is
//! never absent from the registry for any interval.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use tokio::sync::{broadcast, Mutex as AsyncMutex};

use prompt_fs::FileCache;
use prompt_meta::{
    build_description, group_of, is_prompt_file, parse_prompt_file, rank_candidates,
    ArgSchema, GroupFilter, ParsedPrompt, PromptRuntime, RegistryOverlay, RuntimeState,
};

use crate::config::Language;
use crate::partials::PartialRegistry;
use crate::source::SourceManager;
use crate::store::RuntimeStore;
use crate::template::{build_context, check_template, RenderSet, RenderSetBuilder};
use crate::tools::{RenderedMessage, ToolHandle, ToolHandler, ToolRegistry, ToolSpec};
use crate::{Error, Result};

/// One per-document failure, as a value.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadIssue {
    pub file: String,
    pub message: String,
}

/// Result of a completed reload. Non-empty `errors` is still a success.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReloadReport {
    pub loaded: usize,
    pub errors: Vec<ReloadIssue>,
}

/// Outcome shared with coalesced callers. The error side is a message
/// because the winning call keeps the structured error.
type CoalescedOutcome = std::result::Result<ReloadReport, String>;

struct Candidate {
    parsed: ParsedPrompt,
    from_system: bool,
}

struct EngineInner {
    manager: Arc<SourceManager>,
    registry: Arc<dyn ToolRegistry>,
    store: Arc<RuntimeStore>,
    cache: FileCache,
    filter: GroupFilter,
    language: Language,
    /// Serialises every reload, full and single alike.
    lock: AsyncMutex<()>,
    /// The in-flight full reload, when one is running.
    inflight: StdMutex<Option<broadcast::Sender<CoalescedOutcome>>>,
    /// Partials of the last completed pass; single reloads compile
    /// against these.
    partials: StdMutex<PartialRegistry>,
    registry_enabled: StdMutex<bool>,
}

#[derive(Clone)]
pub struct ReloadEngine {
    inner: Arc<EngineInner>,
}

impl ReloadEngine {
    pub fn new(
        manager: Arc<SourceManager>,
        registry: Arc<dyn ToolRegistry>,
        store: Arc<RuntimeStore>,
        cache: FileCache,
        filter: GroupFilter,
        language: Language,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                manager,
                registry,
                store,
                cache,
                filter,
                language,
                lock: AsyncMutex::new(()),
                inflight: StdMutex::new(None),
                partials: StdMutex::new(PartialRegistry::new()),
                registry_enabled: StdMutex::new(false),
            }),
        }
    }

    pub fn store(&self) -> &RuntimeStore {
        &self.inner.store
    }

    pub fn manager(&self) -> &SourceManager {
        &self.inner.manager
    }

    pub fn cache(&self) -> &FileCache {
        &self.inner.cache
    }

    pub fn language(&self) -> Language {
        self.inner.language
    }

    /// Whether the last pass found a usable registry.yaml.
    pub fn registry_enabled(&self) -> bool {
        *lock_std(&self.inner.registry_enabled)
    }

    /// Wait for any in-flight reload to finish. Used by shutdown.
    pub async fn quiesce(&self) {
        let _guard = self.inner.lock.lock().await;
    }

    /// Run a full reload, or join the one already in flight.
    pub async fn full_reload(&self) -> Result<ReloadReport> {
        let follower_rx = {
            let mut slot = lock_std(&self.inner.inflight);
            match slot.as_ref() {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    *slot = Some(tx);
                    None
                }
            }
        };

        if let Some(mut rx) = follower_rx {
            return match rx.recv().await {
                Ok(Ok(report)) => Ok(report),
                Ok(Err(message)) => Err(Error::Reload { message }),
                Err(_) => Err(Error::Reload {
                    message: "reload result channel closed".to_string(),
                }),
            };
        }

        let result = {
            let _guard = self.inner.lock.lock().await;
            self.rebuild()
        };

        if let Some(tx) = lock_std(&self.inner.inflight).take() {
            let outcome = match &result {
                Ok(report) => Ok(report.clone()),
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(outcome);
        }
        result
    }

    /// React to one changed file from the local watcher.
    pub async fn single_reload(&self, path: &Path) -> Result<()> {
        let _guard = self.inner.lock.lock().await;
        self.single_reload_locked(path)
    }

    /// The full pipeline, caller must hold the reload lock.
    fn rebuild(&self) -> Result<ReloadReport> {
        let inner = &self.inner;

        inner.manager.sync_active()?;
        inner.manager.sync_system();

        let main_root = inner.manager.target_dir().to_path_buf();
        let system_root = inner.manager.system_dir().to_path_buf();
        inner.cache.invalidate(Some(&main_root));
        inner.cache.invalidate(Some(&system_root));

        let mut partial_roots: Vec<&Path> = vec![&main_root];
        if inner.manager.has_system() {
            partial_roots.push(&system_root);
        }
        let partials = PartialRegistry::scan(&inner.cache, &partial_roots)?;

        let overlay = RegistryOverlay::load(&main_root);
        *lock_std(&inner.registry_enabled) = overlay.is_enabled();

        let mut errors = Vec::new();
        let mut candidates = Vec::new();
        self.collect_documents(&main_root, false, &overlay, &mut candidates, &mut errors)?;
        if inner.manager.has_system() {
            self.collect_documents(&system_root, true, &overlay, &mut candidates, &mut errors)?;
        }

        // Compile check before ranking; a broken template drops the
        // candidate to `invalid` but never aborts the pass.
        let mut recorded: Vec<PromptRuntime> = Vec::new();
        let mut eligible: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if !candidate.parsed.runtime.runtime_state.is_tool() {
                recorded.push(candidate.parsed.runtime.clone());
                continue;
            }
            match check_template(&candidate.parsed.document.template) {
                Ok(()) => eligible.push(candidate),
                Err(message) => {
                    errors.push(ReloadIssue {
                        file: candidate.parsed.runtime.file_path.display().to_string(),
                        message: format!("template compile failed: {message}"),
                    });
                    let mut runtime = candidate.parsed.runtime.clone();
                    runtime.runtime_state = RuntimeState::Invalid;
                    recorded.push(runtime);
                }
            }
        }

        // Rank user and system candidates separately; system documents
        // register after user documents and never take a user id.
        let (mut user, mut system): (Vec<Candidate>, Vec<Candidate>) =
            eligible.into_iter().partition(|c| !c.from_system);
        rank_candidates(&mut user, |c| &c.parsed.runtime);
        rank_candidates(&mut system, |c| &c.parsed.runtime);

        let mut seen: HashSet<String> = HashSet::new();
        let mut winners: Vec<Candidate> = Vec::new();
        let mut shadowed: Vec<Candidate> = Vec::new();
        for candidate in user.into_iter().chain(system) {
            let id = candidate.parsed.runtime.id.clone();
            if seen.insert(id.clone()) {
                winners.push(candidate);
            } else {
                tracing::info!(
                    id = %id,
                    path = ?candidate.parsed.runtime.file_path,
                    "duplicate id, lower-priority document shadowed"
                );
                shadowed.push(candidate);
            }
        }

        // One render set per pass; every registered handler captures it.
        let mut builder = RenderSetBuilder::new(&partials);
        let mut registered: Vec<Candidate> = Vec::new();
        for candidate in winners {
            match builder.add_template(
                &candidate.parsed.runtime.id,
                &candidate.parsed.document.template,
            ) {
                Ok(()) => registered.push(candidate),
                Err(message) => {
                    errors.push(ReloadIssue {
                        file: candidate.parsed.runtime.file_path.display().to_string(),
                        message: format!("template compile failed: {message}"),
                    });
                    let mut runtime = candidate.parsed.runtime.clone();
                    runtime.runtime_state = RuntimeState::Invalid;
                    recorded.push(runtime);
                }
            }
        }
        let render_set = builder.finish();

        // Dual swap: register everything new, then sweep the prior
        // handles. A surviving id is re-registered before its old handle
        // goes away, so it is never absent.
        let prior = inner.store.handles();
        let mut new_handles: HashMap<String, ToolHandle> = HashMap::new();
        for candidate in &registered {
            let runtime = &candidate.parsed.runtime;
            let spec = ToolSpec {
                name: runtime.id.clone(),
                description: build_description(&candidate.parsed.document, runtime),
                input_schema: candidate.parsed.schema.to_json_schema(),
            };
            let handler = make_handler(
                render_set.clone(),
                runtime.id.clone(),
                candidate.parsed.schema.clone(),
                inner.language,
            );
            let handle = inner.registry.register(spec, handler);
            new_handles.insert(runtime.id.clone(), handle);
        }
        for (id, handle) in prior {
            inner.registry.remove(&handle);
            if !new_handles.contains_key(&id) {
                tracing::info!(id = %id, "tool unregistered");
            }
        }

        // Publish the new state atomically. Shadowed files keep a path
        // index entry so their deletion is still observable.
        let mut prompts: HashMap<String, PromptRuntime> = HashMap::new();
        let mut by_path: HashMap<PathBuf, String> = HashMap::new();
        for runtime in &recorded {
            by_path.insert(runtime.file_path.clone(), runtime.id.clone());
            prompts.insert(runtime.id.clone(), runtime.clone());
        }
        for candidate in &shadowed {
            let runtime = &candidate.parsed.runtime;
            by_path.insert(runtime.file_path.clone(), runtime.id.clone());
        }
        for candidate in &registered {
            let runtime = &candidate.parsed.runtime;
            by_path.insert(runtime.file_path.clone(), runtime.id.clone());
            prompts.insert(runtime.id.clone(), runtime.clone());
        }
        inner
            .store
            .replace_all(prompts, by_path, new_handles.clone());
        *lock_std(&inner.partials) = partials;

        let report = ReloadReport {
            loaded: registered.len(),
            errors,
        };
        tracing::info!(
            loaded = report.loaded,
            errors = report.errors.len(),
            "reload complete"
        );
        Ok(report)
    }

    fn collect_documents(
        &self,
        root: &Path,
        from_system: bool,
        overlay: &RegistryOverlay,
        out: &mut Vec<Candidate>,
        errors: &mut Vec<ReloadIssue>,
    ) -> Result<()> {
        let inner = &self.inner;
        let files = match inner.cache.list(root, false) {
            Ok(files) => files,
            Err(e) if from_system => {
                tracing::warn!(root = ?root, error = %e, "system directory unreadable, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        for file in files {
            if !is_prompt_file(&file) {
                continue;
            }
            let group = group_of(root, &file);
            let allowed = if from_system {
                inner.filter.allows_system(&group)
            } else {
                inner.filter.allows(&group)
            };
            if !allowed {
                continue;
            }

            match parse_prompt_file(root, &file) {
                Ok(mut parsed) => {
                    for warning in &parsed.warnings {
                        tracing::warn!(file = ?file, "{warning}");
                    }
                    overlay.apply(&mut parsed.runtime);
                    out.push(Candidate {
                        parsed,
                        from_system,
                    });
                }
                Err(e) => {
                    errors.push(ReloadIssue {
                        file: file.display().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Per-file fast path. Anything unusual falls back to a full rebuild
    /// under the already-held lock.
    ///
    /// Watch events carry paths in the watched tree's coordinates; when the
    /// active source mirrors into the storage directory, the event is first
    /// translated there (copying or removing the one file) so that every
    /// index keyed by path stays in one coordinate system.
    fn single_reload_locked(&self, event_path: &Path) -> Result<()> {
        let inner = &self.inner;

        let (root, path, from_system) = self.locate(event_path);
        if !is_prompt_file(&path) {
            return Ok(());
        }

        if !event_path.exists() {
            if path != *event_path {
                let _ = std::fs::remove_file(&path);
                inner.cache.invalidate(Some(&root));
            }
            if let Some((id, handle)) = inner.store.remove_by_path(&path) {
                if let Some(handle) = handle {
                    inner.registry.remove(&handle);
                    tracing::info!(id = %id, "prompt removed with its file");
                }
            }
            return Ok(());
        }

        if path != *event_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = std::fs::copy(event_path, &path) {
                return self.fall_back(event_path, &format!("cannot refresh mirror copy: {e}"));
            }
            inner.cache.invalidate(Some(&root));
        }

        let group = group_of(&root, &path);
        let allowed = if from_system {
            inner.filter.allows_system(&group)
        } else {
            inner.filter.allows(&group)
        };
        if !allowed {
            return Ok(());
        }

        let mut parsed = match parse_prompt_file(&root, &path) {
            Ok(parsed) => parsed,
            Err(e) => return self.fall_back(&path, &e.to_string()),
        };
        for warning in &parsed.warnings {
            tracing::warn!(file = ?path, "{warning}");
        }
        RegistryOverlay::load(inner.manager.target_dir()).apply(&mut parsed.runtime);

        if let Some(existing) = inner.store.get(&parsed.runtime.id) {
            if existing.file_path != path {
                // Conflict: another file already provides this id.
                return self.fall_back(&path, "duplicate id from another file");
            }
        }
        if !parsed.runtime.runtime_state.is_tool() {
            return self.fall_back(&path, "document is no longer tool-eligible");
        }

        let partials = lock_std(&inner.partials).clone();
        let mut builder = RenderSetBuilder::new(&partials);
        if let Err(message) =
            builder.add_template(&parsed.runtime.id, &parsed.document.template)
        {
            return self.fall_back(&path, &message);
        }
        let render_set = builder.finish();

        let spec = ToolSpec {
            name: parsed.runtime.id.clone(),
            description: build_description(&parsed.document, &parsed.runtime),
            input_schema: parsed.schema.to_json_schema(),
        };
        let handler = make_handler(
            render_set,
            parsed.runtime.id.clone(),
            parsed.schema.clone(),
            inner.language,
        );

        // Register first, remove second: the id stays invocable
        // throughout.
        let old = inner.store.handle(&parsed.runtime.id);
        let new = inner.registry.register(spec, handler);
        if let Some(old) = old {
            inner.registry.remove(&old);
        }
        inner.store.upsert(parsed.runtime.clone(), Some(new));
        tracing::info!(id = %parsed.runtime.id, "prompt reloaded in place");
        Ok(())
    }

    /// Map a watch-event path to its content root and content path, and
    /// whether it belongs to the system source.
    fn locate(&self, event_path: &Path) -> (PathBuf, PathBuf, bool) {
        let inner = &self.inner;
        if let Some(system_watch) = inner.manager.system_watch_root() {
            if let Ok(rel) = event_path.strip_prefix(&system_watch) {
                let root = inner.manager.system_dir().to_path_buf();
                let path = root.join(rel);
                return (root, path, true);
            }
        }
        let watch_root = inner.manager.watch_root();
        let root = inner.manager.target_dir().to_path_buf();
        match event_path.strip_prefix(&watch_root) {
            Ok(rel) => {
                let path = root.join(rel);
                (root, path, false)
            }
            Err(_) => (root, event_path.to_path_buf(), false),
        }
    }

    fn fall_back(&self, path: &Path, reason: &str) -> Result<()> {
        tracing::warn!(path = ?path, reason, "single reload falling back to full reload");
        self.rebuild().map(|_| ())
    }
}

fn make_handler(
    render_set: RenderSet,
    id: String,
    schema: ArgSchema,
    language: Language,
) -> ToolHandler {
    Arc::new(move |raw| {
        let args = schema.coerce(&raw)?;
        let ctx = build_context(args, language);
        let text = render_set.render(&id, &ctx)?;
        Ok(RenderedMessage::user(text))
    })
}

fn lock_std<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

//! Shared harness: a full server stack over a throwaway local source.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use prompt_core::{Config, ReloadEngine, RuntimeStore, SourceManager};
use prompt_fs::FileCache;
use prompt_mcp::{DynamicToolRegistry, PromptMcpServer};
use prompt_meta::GroupFilter;

pub struct Harness {
    pub server: PromptMcpServer,
    pub engine: ReloadEngine,
    pub registry: Arc<DynamicToolRegistry>,
    pub source: TempDir,
    /// Kept alive so the storage directory outlives the engine.
    pub _storage: TempDir,
}

impl Harness {
    /// Write a file into the source tree.
    pub fn write(&self, rel: &str, content: &str) {
        write_file(&self.source.path().join(rel), content);
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.source.path().join(rel)).unwrap();
    }

    /// Invoke a protocol request and return the raw response.
    pub async fn request(&self, message: &str) -> String {
        self.server.handle_message(message).await
    }

    pub async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> String {
        let message = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments},
        });
        self.request(&message.to_string()).await
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Build the full stack over a fresh local source containing `files`,
/// with `groups` active, and run the initial reload.
pub async fn harness(files: &[(&str, &str)], groups: &str) -> Harness {
    let source = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    for (rel, content) in files {
        write_file(&source.path().join(rel), content);
    }

    let pairs = [
        ("PROMPT_REPO_URL", source.path().to_string_lossy().into_owned()),
        ("STORAGE_DIR", storage.path().to_string_lossy().into_owned()),
        ("MCP_GROUPS", groups.to_string()),
        ("WATCH_MODE", "true".to_string()),
    ];
    let config = Config::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap();

    let cache = FileCache::new();
    let manager = Arc::new(SourceManager::from_config(&config, cache.clone()).unwrap());
    manager.initial_load().unwrap();

    let registry = Arc::new(DynamicToolRegistry::new());
    let store = Arc::new(RuntimeStore::new());
    let filter = GroupFilter::new(config.groups.clone(), config.has_system_source());
    let engine = ReloadEngine::new(
        manager,
        registry.clone(),
        store,
        cache,
        filter,
        config.language,
    );
    engine.full_reload().await.unwrap();

    let server = PromptMcpServer::new(config, engine.clone(), registry.clone());
    Harness {
        server,
        engine,
        registry,
        source,
        _storage: storage,
    }
}

pub const CODE_REVIEW: &str = r#"id: code-review
title: Code Review
version: 1.0.0
status: stable
tags: [quality]
use_cases: [review]
args:
  code:
    type: string
    description: "Code (required)"
template: "Review: {{code}}"
"#;

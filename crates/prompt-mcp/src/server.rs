//! MCP server
//!
//! JSON-RPC 2.0 over stdio: requests and responses travel on stdout,
//! diagnostics on stderr. The server owns the watcher lifecycles and the
//! shared state the control surface operates on.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use prompt_core::source::SourceKind;
use prompt_core::{Config, GitPoller, LocalWatcher, ReloadEngine};

use crate::builtins::{builtin_tool_definitions, handle_builtin_call};
use crate::protocol::{
    codes, InitializeResult, JsonRpcRequest, JsonRpcResponse, ReadResourceParams,
    ResourcesCapability, ServerCapabilities, ServerInfo, ToolCallParams, ToolCallResult,
    ToolsCapability, PROTOCOL_VERSION,
};
use crate::registry::DynamicToolRegistry;
use crate::resources::{read_resource, resource_definitions};
use crate::{Error, Result};

/// Watcher and poller handles for the running server. Scoped resources:
/// `start` replaces the previous set, `stop` is idempotent.
#[derive(Default)]
pub struct WatchSet {
    local: Mutex<Option<LocalWatcher>>,
    system_local: Mutex<Option<LocalWatcher>>,
    poller: Mutex<Option<GitPoller>>,
    system_poller: Mutex<Option<GitPoller>>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching the active source (and the system source, if any).
    /// Local sources get a filesystem watcher routing per-file events to
    /// `single_reload`; git sources get a remote poller routing bulk
    /// updates to `full_reload`.
    pub fn start(&self, engine: &ReloadEngine, poll_interval: Duration) -> prompt_core::Result<()> {
        self.stop();
        let manager = engine.manager();

        match manager.active_kind() {
            SourceKind::Local => {
                let watch_root = manager.watch_root();
                let engine_cb = engine.clone();
                let watcher = LocalWatcher::start(&watch_root, move |path| {
                    let engine = engine_cb.clone();
                    async move {
                        if let Err(e) = engine.single_reload(&path).await {
                            tracing::error!(path = ?path, error = %e, "single reload failed");
                        }
                    }
                })?;
                *lock(&self.local) = Some(watcher);
            }
            SourceKind::Git => {
                let engine_cb = engine.clone();
                let poller = GitPoller::start(
                    manager.target_dir().to_path_buf(),
                    manager.git_branch().to_string(),
                    poll_interval,
                    move || {
                        let engine = engine_cb.clone();
                        async move { engine.full_reload().await.is_ok() }
                    },
                );
                *lock(&self.poller) = Some(poller);
            }
        }

        if let Some(system) = manager.system() {
            match system.kind() {
                SourceKind::Local => {
                    if let Some(system_root) = manager.system_watch_root() {
                        let engine_cb = engine.clone();
                        let watcher = LocalWatcher::start(&system_root, move |path| {
                            let engine = engine_cb.clone();
                            async move {
                                if let Err(e) = engine.single_reload(&path).await {
                                    tracing::error!(path = ?path, error = %e, "system single reload failed");
                                }
                            }
                        })?;
                        *lock(&self.system_local) = Some(watcher);
                    }
                }
                SourceKind::Git => {
                    let engine_cb = engine.clone();
                    let poller = GitPoller::start(
                        manager.system_dir().to_path_buf(),
                        manager.git_branch().to_string(),
                        poll_interval,
                        move || {
                            let engine = engine_cb.clone();
                            async move { engine.full_reload().await.is_ok() }
                        },
                    );
                    *lock(&self.system_poller) = Some(poller);
                }
            }
        }
        Ok(())
    }

    /// Release every watcher and poller. Safe to call twice.
    pub fn stop(&self) {
        if let Some(watcher) = lock(&self.local).take() {
            watcher.stop();
        }
        if let Some(watcher) = lock(&self.system_local).take() {
            watcher.stop();
        }
        if let Some(poller) = lock(&self.poller).take() {
            poller.stop();
        }
        if let Some(poller) = lock(&self.system_poller).take() {
            poller.stop();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Shared state behind the protocol handlers and the control surface.
pub struct ServerState {
    pub config: Config,
    pub engine: ReloadEngine,
    pub registry: Arc<DynamicToolRegistry>,
    pub watchers: WatchSet,
    pub started_at: Instant,
}

/// The MCP server for the prompt catalogue.
pub struct PromptMcpServer {
    state: Arc<ServerState>,
}

impl PromptMcpServer {
    pub fn new(config: Config, engine: ReloadEngine, registry: Arc<DynamicToolRegistry>) -> Self {
        Self {
            state: Arc::new(ServerState {
                config,
                engine,
                registry,
                watchers: WatchSet::new(),
                started_at: Instant::now(),
            }),
        }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Serve stdio until EOF.
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        tracing::info!("MCP server ready, listening on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_message(&line).await;
            if !response.is_empty() {
                stdout.write_all(response.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        tracing::info!("stdin closed, stopping server");
        Ok(())
    }

    /// Handle one raw JSON-RPC message. Returns the serialized response,
    /// or an empty string for notifications.
    pub async fn handle_message(&self, message: &str) -> String {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                let response = JsonRpcResponse::error(
                    None,
                    codes::PARSE_ERROR,
                    format!("parse error: {e}"),
                );
                return serialize_response(response);
            }
        };

        tracing::debug!(method = %request.method, "request received");

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "initialized" | "notifications/initialized" => return String::new(),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "resources/list" => self.handle_resources_list(request.id),
            "resources/read" => self.handle_resources_read(request.id, request.params),
            _ if request.is_notification() => return String::new(),
            other => JsonRpcResponse::error(
                request.id,
                codes::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        serialize_response(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
                resources: ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "prompt-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => internal_error(id, e.into()),
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        // Built-ins first, then prompt tools in registration order.
        let tools: Vec<Value> = builtin_tool_definitions()
            .into_iter()
            .chain(self.state.registry.list())
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "inputSchema": spec.input_schema,
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("invalid params: {e}"),
                )
            }
        };

        let result = self.dispatch_tool(&params.name, &params.arguments).await;
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => internal_error(id, e.into()),
        }
    }

    /// Tool dispatch: control surface first, then the prompt registry.
    /// Failures become tool-error results, never protocol errors.
    async fn dispatch_tool(&self, name: &str, args: &Value) -> ToolCallResult {
        if let Some(result) = handle_builtin_call(&self.state, name, args).await {
            return match result {
                Ok(value) => match serde_json::to_string_pretty(&value) {
                    Ok(text) => ToolCallResult::text(text),
                    Err(e) => ToolCallResult::error(format!("serialization failed: {e}")),
                },
                Err(e) => ToolCallResult::error(e.to_string()),
            };
        }

        match self.state.registry.invoke(name, args.clone()) {
            Some(Ok(message)) => ToolCallResult::text(message.text),
            Some(Err(message)) => ToolCallResult::error(message),
            None => ToolCallResult::error(format!("unknown tool: {name}")),
        }
    }

    fn handle_resources_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let resources: Vec<Value> = resource_definitions()
            .iter()
            .map(|definition| {
                json!({
                    "uri": definition.uri,
                    "name": definition.name,
                    "description": definition.description,
                    "mimeType": definition.mime_type,
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "resources": resources }))
    }

    fn handle_resources_read(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: ReadResourceParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("invalid params: {e}"),
                )
            }
        };

        match read_resource(&self.state, &params.uri) {
            Ok(content) => JsonRpcResponse::success(
                id,
                json!({
                    "contents": [{
                        "uri": content.uri,
                        "mimeType": content.mime_type,
                        "text": content.text,
                    }]
                }),
            ),
            Err(e) => JsonRpcResponse::error(id, codes::INVALID_PARAMS, e.to_string()),
        }
    }
}

fn serialize_response(response: JsonRpcResponse) -> String {
    serde_json::to_string(&response).unwrap_or_else(|e| {
        // A response built from our own types failing to serialize is a
        // programming error, but the protocol must keep flowing.
        tracing::error!(error = %e, "response serialization failed");
        format!(
            r#"{{"jsonrpc":"2.0","error":{{"code":{},"message":"internal serialization failure"}}}}"#,
            codes::INTERNAL_ERROR
        )
    })
}

fn internal_error(id: Option<Value>, e: Error) -> JsonRpcResponse {
    JsonRpcResponse::error(id, codes::INTERNAL_ERROR, format!("internal error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_core::{Config, Language, ReloadEngine, RuntimeStore, SourceManager};
    use prompt_fs::FileCache;
    use prompt_meta::GroupFilter;
    use std::fs;
    use tempfile::TempDir;

    // Build a server over a real local source tree.
    async fn server_with(files: &[(&str, &str)], groups: &str) -> (PromptMcpServer, TempDir, TempDir) {
        let source = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = source.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }

        let pairs = [
            ("PROMPT_REPO_URL", source.path().to_string_lossy().into_owned()),
            ("STORAGE_DIR", storage.path().to_string_lossy().into_owned()),
            ("MCP_GROUPS", groups.to_string()),
        ];
        let config = Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap();

        let cache = FileCache::new();
        let manager =
            Arc::new(SourceManager::from_config(&config, cache.clone()).unwrap());
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
            Language::En,
        );
        engine.full_reload().await.unwrap();

        (
            PromptMcpServer::new(config, engine, registry),
            source,
            storage,
        )
    }

    const CODE_REVIEW: &str = r#"id: code-review
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

    #[tokio::test]
    async fn test_initialize_handshake() {
        let (server, _s, _t) = server_with(&[], "").await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#,
            )
            .await;
        assert!(response.contains("prompt-mcp"));
        assert!(response.contains("protocolVersion"));
        assert!(response.contains("listChanged"));
    }

    #[tokio::test]
    async fn test_initialized_notification_gets_no_response() {
        let (server, _s, _t) = server_with(&[], "").await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_tools_list_includes_builtins_and_prompts() {
        let (server, _s, _t) =
            server_with(&[("common/code-review.yaml", CODE_REVIEW)], "common").await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#)
            .await;
        for builtin in ["reload", "stats", "list", "inspect", "switch_source"] {
            assert!(response.contains(builtin), "{builtin} missing from listing");
        }
        assert!(response.contains("code-review"));
        assert!(response.contains("Triggers") || response.contains("Code Review"));
    }

    #[tokio::test]
    async fn test_prompt_tool_invocation_renders() {
        let (server, _s, _t) =
            server_with(&[("common/code-review.yaml", CODE_REVIEW)], "common").await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"code-review","arguments":{"code":"x=1"}}}"#,
            )
            .await;
        assert!(response.contains("Review: x=1"));
        assert!(!response.contains("is_error"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_tool_error_result() {
        let (server, _s, _t) = server_with(&[], "").await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            )
            .await;
        assert!(response.contains("\"result\""));
        assert!(response.contains("is_error"));
        assert!(response.contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_stats_tool_counts_dynamically() {
        let (server, _s, _t) =
            server_with(&[("common/code-review.yaml", CODE_REVIEW)], "common").await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"stats","arguments":{}}}"#,
            )
            .await;
        assert!(response.contains("\\\"basic\\\": 5"));
        assert!(response.contains("\\\"prompt\\\": 1"));
        assert!(response.contains("\\\"total\\\": 6"));
    }

    #[tokio::test]
    async fn test_inspect_missing_id_reports_not_found() {
        let (server, _s, _t) = server_with(&[], "").await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"inspect","arguments":{"id":"ghost"}}}"#,
            )
            .await;
        assert!(response.contains("is_error"));
        assert!(response.contains("not found: ghost"));
    }

    #[tokio::test]
    async fn test_list_tool_filters_by_tag() {
        let (server, _s, _t) = server_with(
            &[
                ("common/code-review.yaml", CODE_REVIEW),
                ("common/other.yaml", "id: other\ntitle: Other\ntemplate: o\n"),
            ],
            "common",
        )
        .await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"list","arguments":{"tag":"quality"}}}"#,
            )
            .await;
        assert!(response.contains("code-review"));
        assert!(!response.contains("\\\"other\\\""));
    }

    #[tokio::test]
    async fn test_health_resource_read() {
        let (server, _s, _t) =
            server_with(&[("common/code-review.yaml", CODE_REVIEW)], "common").await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":8,"method":"resources/read","params":{"uri":"system://health"}}"#,
            )
            .await;
        assert!(response.contains("system://health"));
        assert!(response.contains("uptime_ms"));
        assert!(response.contains("loaded_count"));
    }

    #[tokio::test]
    async fn test_unknown_resource_is_error() {
        let (server, _s, _t) = server_with(&[], "").await;
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":9,"method":"resources/read","params":{"uri":"system://nope"}}"#,
            )
            .await;
        assert!(response.contains("error"));
        assert!(response.contains("-32602"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (server, _s, _t) = server_with(&[], "").await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":10,"method":"bogus/method","params":{}}"#)
            .await;
        assert!(response.contains("-32601"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let (server, _s, _t) = server_with(&[], "").await;
        let response = server.handle_message(r#"{"broken"#).await;
        assert!(response.contains("-32700"));
    }

    #[tokio::test]
    async fn test_reload_tool_roundtrip() {
        let (server, source, _t) = server_with(&[], "common").await;
        fs::create_dir_all(source.path().join("common")).unwrap();
        fs::write(
            source.path().join("common/late.yaml"),
            "id: late\ntitle: Late\ntemplate: l\n",
        )
        .unwrap();

        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":11,"method":"tools/call","params":{"name":"reload","arguments":{}}}"#,
            )
            .await;
        assert!(response.contains("\\\"loaded\\\": 1"));

        let call = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":12,"method":"tools/call","params":{"name":"late","arguments":{}}}"#,
            )
            .await;
        assert!(call.contains("\"text\":\"l\""));
        assert!(!call.contains("is_error"));
    }
}

//! Control surface tools
//!
//! A fixed set of built-in tools registered once at startup and never
//! reloaded: `reload`, `stats`, `list`, `inspect`, `switch_source`. They
//! bypass group filtering, always return a structured response, and convey
//! their errors inside the payload.

use serde::Deserialize;
use serde_json::{json, Value};

use prompt_core::ToolSpec;
use prompt_meta::PromptRuntime;

use crate::server::ServerState;
use crate::{Error, Result};

/// Definitions of every built-in tool. `stats` counts these, so the list
/// is the single source of truth for the basic-tool count.
pub fn builtin_tool_definitions() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "reload".to_string(),
            description: "Re-sync every source and rebuild the prompt tool set".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSpec {
            name: "stats".to_string(),
            description: "Prompt counts by runtime state, plus tool counts".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSpec {
            name: "list".to_string(),
            description: "List prompts, optionally filtered by status, group, tag, or runtime state".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "description": "Filter by authored status (stable, draft, deprecated, legacy)"
                    },
                    "group": {
                        "type": "string",
                        "description": "Filter by group"
                    },
                    "tag": {
                        "type": "string",
                        "description": "Filter by tag"
                    },
                    "runtime_state": {
                        "type": "string",
                        "description": "Filter by runtime state (active, legacy, invalid, disabled, warning)"
                    }
                }
            }),
        },
        ToolSpec {
            name: "inspect".to_string(),
            description: "Full runtime record for one prompt id".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Prompt id"
                    }
                },
                "required": ["id"]
            }),
        },
        ToolSpec {
            name: "switch_source".to_string(),
            description: "Replace the active prompt source and reload".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Git URL or absolute local path"
                    },
                    "branch": {
                        "type": "string",
                        "description": "Branch for git sources"
                    }
                },
                "required": ["url"]
            }),
        },
    ]
}

/// Dispatch a built-in call. `None` means the name is not a built-in and
/// the caller should consult the prompt registry.
pub async fn handle_builtin_call(
    state: &ServerState,
    name: &str,
    args: &Value,
) -> Option<Result<Value>> {
    let result = match name {
        "reload" => reload(state).await,
        "stats" => stats(state),
        "list" => list(state, args),
        "inspect" => inspect(state, args),
        "switch_source" => switch_source(state, args).await,
        _ => return None,
    };
    Some(result)
}

async fn reload(state: &ServerState) -> Result<Value> {
    let report = state.engine.full_reload().await.map_err(Error::Core)?;
    Ok(serde_json::to_value(report)?)
}

fn stats(state: &ServerState) -> Result<Value> {
    let counts = state.engine.store().counts();
    let basic = builtin_tool_definitions().len();
    let prompt = state.registry.len();
    Ok(json!({
        "total": counts.total,
        "active": counts.active,
        "legacy": counts.legacy,
        "invalid": counts.invalid,
        "disabled": counts.disabled,
        "warning": counts.warning,
        "tools": {
            "basic": basic,
            "prompt": prompt,
            "total": basic + prompt,
        }
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ListFilters {
    status: Option<String>,
    group: Option<String>,
    tag: Option<String>,
    runtime_state: Option<String>,
}

fn list(state: &ServerState, args: &Value) -> Result<Value> {
    let filters: ListFilters = match args {
        Value::Null => ListFilters::default(),
        other => serde_json::from_value(other.clone())
            .map_err(|e| Error::invalid_arguments(e.to_string()))?,
    };

    let prompts: Vec<Value> = state
        .engine
        .store()
        .snapshot()
        .into_iter()
        .filter(|runtime| {
            filters
                .status
                .as_deref()
                .is_none_or(|s| runtime.status.as_str() == s)
                && filters
                    .group
                    .as_deref()
                    .is_none_or(|g| runtime.group == g)
                && filters
                    .tag
                    .as_deref()
                    .is_none_or(|t| runtime.tags.iter().any(|tag| tag == t))
                && filters
                    .runtime_state
                    .as_deref()
                    .is_none_or(|s| runtime.runtime_state.as_str() == s)
        })
        .map(|runtime| projection(&runtime))
        .collect();

    Ok(json!({
        "total": prompts.len(),
        "prompts": prompts,
    }))
}

fn projection(runtime: &PromptRuntime) -> Value {
    json!({
        "id": runtime.id,
        "title": runtime.title,
        "version": runtime.version.as_ref().map(|v| v.to_string()),
        "status": runtime.status,
        "runtime_state": runtime.runtime_state,
        "source": runtime.source,
        "tags": runtime.tags,
        "use_cases": runtime.use_cases,
        "group": runtime.group,
        "visibility": runtime.visibility,
    })
}

fn inspect(state: &ServerState, args: &Value) -> Result<Value> {
    #[derive(Deserialize)]
    struct Params {
        id: String,
    }
    let params: Params = serde_json::from_value(args.clone())
        .map_err(|e| Error::invalid_arguments(e.to_string()))?;

    match state.engine.store().get(&params.id) {
        Some(runtime) => Ok(serde_json::to_value(&runtime)?),
        None => Err(Error::NotFound { id: params.id }),
    }
}

async fn switch_source(state: &ServerState, args: &Value) -> Result<Value> {
    #[derive(Deserialize)]
    struct Params {
        url: String,
        branch: Option<String>,
    }
    let params: Params = serde_json::from_value(args.clone())
        .map_err(|e| Error::invalid_arguments(e.to_string()))?;

    state
        .engine
        .manager()
        .switch_source(&params.url, params.branch.as_deref())
        .map_err(Error::Core)?;

    // The watch targets changed with the source.
    if state.config.watch_mode {
        if let Err(e) = state
            .watchers
            .start(&state.engine, state.config.git_polling_interval)
        {
            tracing::warn!(error = %e, "could not restart watchers after source switch");
        }
    }

    let report = state.engine.full_reload().await.map_err(Error::Core)?;
    Ok(json!({ "loaded": report.loaded }))
}

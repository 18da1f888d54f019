//! MCP resources
//!
//! One read-only resource: `system://health`, a JSON snapshot of the git
//! state, prompt counts, registry overlay, cache, and process vitals.

use serde::Serialize;
use serde_json::{json, Value};

use crate::server::ServerState;
use crate::{Error, Result};

pub const HEALTH_URI: &str = "system://health";

/// Resource definition for the protocol listing.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Content returned from a resource read.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

pub fn resource_definitions() -> Vec<ResourceDefinition> {
    vec![ResourceDefinition {
        uri: HEALTH_URI.to_string(),
        name: "Server Health".to_string(),
        description: "Source, prompt, registry, cache, and process state".to_string(),
        mime_type: "application/json".to_string(),
    }]
}

/// Read one resource by URI.
///
/// # Errors
///
/// [`Error::ResourceNotFound`] for unknown URIs.
pub fn read_resource(state: &ServerState, uri: &str) -> Result<ResourceContent> {
    match uri {
        HEALTH_URI => Ok(ResourceContent {
            uri: HEALTH_URI.to_string(),
            mime_type: "application/json".to_string(),
            text: serde_json::to_string_pretty(&build_health(state))?,
        }),
        other => Err(Error::ResourceNotFound {
            uri: other.to_string(),
        }),
    }
}

/// Assemble the health snapshot.
pub fn build_health(state: &ServerState) -> Value {
    let manager = state.engine.manager();
    let store = state.engine.store();
    let counts = store.counts();
    let head_commit = prompt_git::head_commit(manager.target_dir()).ok();
    let registry_enabled = state.engine.registry_enabled();

    json!({
        "git": {
            "repo_url": manager.active().url(),
            "repo_path": manager.target_dir().display().to_string(),
            "head_commit": head_commit,
        },
        "prompts": {
            "total": counts.total,
            "active": counts.active,
            "legacy": counts.legacy,
            "invalid": counts.invalid,
            "disabled": counts.disabled,
            "loaded_count": store.loaded_count(),
            "groups": store.groups(),
        },
        "registry": {
            "enabled": registry_enabled,
            "source": if registry_enabled { "registry.yaml" } else { "none" },
        },
        "cache": {
            "size": state.engine.cache().len(),
            "cleanup_interval": state
                .config
                .cache_cleanup_interval
                .map(|interval| interval.as_millis() as u64),
        },
        "system": {
            "uptime_ms": state.started_at.elapsed().as_millis() as u64,
            "memory": {
                "rss": rss_bytes(),
            },
        },
    })
}

/// Resident set size in bytes, best effort. Zero when the platform gives
/// no cheap answer.
fn rss_bytes() -> u64 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(statm) = std::fs::read_to_string("/proc/self/statm") {
            if let Some(rss_pages) = statm
                .split_whitespace()
                .nth(1)
                .and_then(|field| field.parse::<u64>().ok())
            {
                return rss_pages * 4096;
            }
        }
    }
    0
}

//! The registry.yaml overlay
//!
//! An optional `registry.yaml` at the repository root is the operator's
//! correction channel: a matching entry forces `source = registry`, turns
//! `deprecated: true` into `disabled`, and otherwise coerces the state to
//! `active` — the only path that upgrades a `warning` prompt. A missing or
//! unparseable file is treated as absent and never fails a load.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::classify::{PromptRuntime, RuntimeState, SourceKind, Visibility};

/// File name looked up at the repository root.
pub const REGISTRY_FILE: &str = "registry.yaml";

/// One entry of the registry document.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub id: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub deprecated: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    prompts: Vec<RegistryEntry>,
}

/// Loaded overlay, possibly empty when no usable registry.yaml exists.
#[derive(Debug, Clone, Default)]
pub struct RegistryOverlay {
    entries: HashMap<String, RegistryEntry>,
    enabled: bool,
}

impl RegistryOverlay {
    /// Load the overlay from `<root>/registry.yaml`.
    ///
    /// Missing, unreadable, or ill-formed files all yield a disabled
    /// overlay; the latter two log at warn.
    pub fn load(root: &Path) -> Self {
        let path = root.join(REGISTRY_FILE);
        if !path.exists() {
            return Self::default();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "cannot read registry.yaml, treating as absent");
                return Self::default();
            }
        };

        match serde_yaml::from_str::<RegistryFile>(&content) {
            Ok(file) => {
                let entries = file
                    .prompts
                    .into_iter()
                    .map(|entry| (entry.id.clone(), entry))
                    .collect();
                Self {
                    entries,
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "ill-formed registry.yaml, treating as absent");
                Self::default()
            }
        }
    }

    /// Whether a usable registry.yaml was loaded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    /// Apply the overlay to a classified runtime.
    ///
    /// Precedence is registry > metadata > legacy, but only for `source`,
    /// `runtime_state`, `group`, and `visibility`.
    pub fn apply(&self, runtime: &mut PromptRuntime) {
        let Some(entry) = self.entries.get(&runtime.id) else {
            return;
        };

        runtime.source = SourceKind::Registry;
        runtime.runtime_state = if entry.deprecated {
            RuntimeState::Disabled
        } else {
            RuntimeState::Active
        };
        if let Some(group) = &entry.group {
            runtime.group = group.clone();
        }
        if let Some(visibility) = entry.visibility {
            runtime.visibility = Some(visibility);
        }
    }
}

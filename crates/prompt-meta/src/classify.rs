//! Status, source, and runtime-state classification
//!
//! Metadata prompts validate their block strictly (semver version, status
//! enum, string arrays); a valid block yields `active`, an invalid one
//! demotes to `warning`. Documents without metadata are `legacy`. The
//! registry overlay runs afterwards and may override what is derived here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::document::PromptDocument;

/// Authored lifecycle status of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStatus {
    Stable,
    Draft,
    Deprecated,
    /// No metadata block; pre-metadata authoring style.
    Legacy,
}

impl PromptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Draft => "draft",
            Self::Deprecated => "deprecated",
            Self::Legacy => "legacy",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "stable" => Some(Self::Stable),
            "draft" => Some(Self::Draft),
            "deprecated" => Some(Self::Deprecated),
            _ => None,
        }
    }
}

/// Where the authoritative classification of a prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Registry,
    Embedded,
    Legacy,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Embedded => "embedded",
            Self::Legacy => "legacy",
        }
    }
}

/// Operational state of a prompt inside the running server.
///
/// Only `active` and `legacy` prompts are registered as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeState {
    Active,
    Legacy,
    Invalid,
    Disabled,
    Warning,
}

impl RuntimeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Legacy => "legacy",
            Self::Invalid => "invalid",
            Self::Disabled => "disabled",
            Self::Warning => "warning",
        }
    }

    /// Whether this state is exposed as an invocable tool.
    pub fn is_tool(&self) -> bool {
        matches!(self, Self::Active | Self::Legacy)
    }
}

/// Registry-controlled exposure marker. Recorded and reported, not
/// enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Internal,
}

/// Everything the server knows about one prompt id at runtime.
#[derive(Debug, Clone, Serialize)]
pub struct PromptRuntime {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<semver::Version>,
    pub status: PromptStatus,
    pub tags: Vec<String>,
    pub use_cases: Vec<String>,
    pub runtime_state: RuntimeState,
    pub source: SourceKind,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    pub file_path: PathBuf,
}

/// Derive status, version, tags, use-cases, and the base runtime state from
/// a document's metadata block.
///
/// Returns the runtime skeleton plus human-readable warnings explaining any
/// demotion.
pub fn classify(doc: &PromptDocument, group: &str, file_path: PathBuf) -> (PromptRuntime, Vec<String>) {
    let mut warnings = Vec::new();

    let mut version = None;
    let mut status = PromptStatus::Legacy;
    let mut source = SourceKind::Legacy;
    let mut runtime_state = RuntimeState::Legacy;

    if doc.has_metadata() {
        source = SourceKind::Embedded;

        match scalar_string(&doc.version) {
            Some(raw) => match semver::Version::parse(&raw) {
                Ok(v) => version = Some(v),
                Err(e) => warnings.push(format!("invalid version '{raw}': {e}")),
            },
            None => warnings.push("version is not a string".to_string()),
        }

        match scalar_string(&doc.status) {
            Some(raw) => match PromptStatus::parse(&raw) {
                Some(s) => status = s,
                None => warnings.push(format!(
                    "invalid status '{raw}' (expected draft, stable, or deprecated)"
                )),
            },
            None => warnings.push("status is not a string".to_string()),
        }

        runtime_state = if warnings.is_empty() {
            RuntimeState::Active
        } else {
            RuntimeState::Warning
        };
    }

    let tags = string_array(&doc.tags, "tags", &mut warnings);
    let use_cases = string_array(&doc.use_cases, "use_cases", &mut warnings);

    // Array problems demote a metadata prompt too, but never a legacy one.
    if source == SourceKind::Embedded && !warnings.is_empty() {
        runtime_state = RuntimeState::Warning;
    }

    let runtime = PromptRuntime {
        id: doc.id.clone(),
        title: doc.title.clone(),
        description: doc.description.clone(),
        version,
        status,
        tags,
        use_cases,
        runtime_state,
        source,
        group: group.to_string(),
        visibility: None,
        file_path,
    };
    (runtime, warnings)
}

fn scalar_string(value: &Option<serde_yaml::Value>) -> Option<String> {
    match value {
        Some(serde_yaml::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn string_array(
    value: &Option<serde_yaml::Value>,
    field: &str,
    warnings: &mut Vec<String>,
) -> Vec<String> {
    match value {
        None | Some(serde_yaml::Value::Null) => Vec::new(),
        Some(serde_yaml::Value::Sequence(seq)) => {
            let mut out = Vec::with_capacity(seq.len());
            for item in seq {
                match item {
                    serde_yaml::Value::String(s) => out.push(s.clone()),
                    other => {
                        warnings.push(format!("{field} contains a non-string entry: {other:?}"));
                    }
                }
            }
            out
        }
        Some(other) => {
            warnings.push(format!("{field} is not an array: {other:?}"));
            Vec::new()
        }
    }
}

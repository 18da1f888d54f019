//! Serde model of the on-disk prompt document
//!
//! The structural fields (`id`, `title`, `template`, `args`, ...) are typed
//! strictly; the optional metadata block (`version`, `status`, `tags`,
//! `use_cases`) is deserialised as raw YAML values on purpose, so that a
//! present-but-ill-formed metadata block classifies the prompt as `warning`
//! instead of failing the whole parse.

use std::collections::BTreeMap;

use serde::Deserialize;

/// A prompt document as authored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub triggers: Option<Triggers>,
    #[serde(default)]
    pub rules: Vec<String>,
    /// BTreeMap keeps the generated argument schema deterministic.
    #[serde(default)]
    pub args: BTreeMap<String, ArgSpec>,
    pub template: String,

    // Metadata block, validated leniently in `classify`.
    #[serde(default)]
    pub version: Option<serde_yaml::Value>,
    #[serde(default)]
    pub status: Option<serde_yaml::Value>,
    #[serde(default)]
    pub tags: Option<serde_yaml::Value>,
    #[serde(default)]
    pub use_cases: Option<serde_yaml::Value>,
    #[serde(default)]
    pub dependencies: Option<Dependencies>,
}

/// Trigger keywords that help an agent decide when to use the prompt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Triggers {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Declared dependencies of the template body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub partials: Vec<String>,
}

/// One entry of the `args` mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct ArgSpec {
    #[serde(rename = "type")]
    pub arg_type: crate::args::ArgType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub required: Option<bool>,
}

impl PromptDocument {
    /// A document is a *metadata prompt* iff both `version` and `status`
    /// are present and non-empty, even if ill-formed.
    pub fn has_metadata(&self) -> bool {
        fn present(value: &Option<serde_yaml::Value>) -> bool {
            match value {
                None => false,
                Some(serde_yaml::Value::Null) => false,
                Some(serde_yaml::Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            }
        }
        present(&self.version) && present(&self.status)
    }

    /// Declared partial names, empty when no dependency block exists.
    pub fn declared_partials(&self) -> &[String] {
        self.dependencies
            .as_ref()
            .map(|d| d.partials.as_slice())
            .unwrap_or(&[])
    }

    /// Trigger patterns, empty when no trigger block exists.
    pub fn trigger_patterns(&self) -> &[String] {
        self.triggers
            .as_ref()
            .map(|t| t.patterns.as_slice())
            .unwrap_or(&[])
    }
}

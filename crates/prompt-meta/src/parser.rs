//! Prompt file loading: filter, parse, validate, classify
//!
//! The pipeline for one file: extension/basename filter, YAML parse (parse
//! errors and schema violations are distinct failures), structure
//! validation with field paths, metadata classification, and the
//! partial-dependency check. Compilation of the template body is the
//! engine's job; this module never touches the template engine.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use crate::args::ArgSchema;
use crate::classify::{classify, PromptRuntime, RuntimeState};
use crate::document::PromptDocument;
use crate::groups::group_of;
use crate::partial_refs::extract_partial_refs;
use crate::{Error, Result};

/// Basenames that are YAML but never prompt documents.
pub const EXCLUDED_FILES: &[&str] = &[
    "registry.yaml",
    "pnpm-lock.yaml",
    "yarn.lock",
    "package-lock.json",
    "package.json",
    "composer.lock",
    "go.sum",
    "requirements.txt",
    "poetry.lock",
    "pom.xml",
    "build.gradle",
];

/// Whether `path` can be a prompt document at all.
pub fn is_prompt_file(path: &Path) -> bool {
    let has_yaml_ext = matches!(
        path.extension().and_then(OsStr::to_str),
        Some("yaml") | Some("yml")
    );
    if !has_yaml_ext {
        return false;
    }
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    !EXCLUDED_FILES.contains(&basename.as_str())
}

/// A successfully parsed and classified prompt document.
#[derive(Debug, Clone)]
pub struct ParsedPrompt {
    pub runtime: PromptRuntime,
    pub document: PromptDocument,
    pub schema: ArgSchema,
    pub partial_refs: Vec<String>,
    /// Non-fatal findings (metadata problems, partial mismatches).
    pub warnings: Vec<String>,
}

/// Parse one prompt file under `root`.
///
/// # Errors
///
/// - [`Error::Io`] when the file cannot be read
/// - [`Error::Parse`] when the YAML is not well-formed
/// - [`Error::Schema`] when the structure violates the document schema
pub fn parse_prompt_file(root: &Path, path: &Path) -> Result<ParsedPrompt> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_prompt_source(root, path, &content)
}

/// Parse prompt source already read from `path`.
pub fn parse_prompt_source(root: &Path, path: &Path, content: &str) -> Result<ParsedPrompt> {
    // Two-stage parse separates "not YAML" from "not a prompt document".
    let value: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let doc: PromptDocument = serde_yaml::from_value(value).map_err(|e| Error::Schema {
        path: path.to_path_buf(),
        fields: vec![e.to_string()],
    })?;

    let mut violations = Vec::new();
    if doc.id.trim().is_empty() {
        violations.push("id: must be non-empty".to_string());
    }
    if doc.title.trim().is_empty() {
        violations.push("title: must be non-empty".to_string());
    }
    if doc.template.trim().is_empty() {
        violations.push("template: must be non-empty".to_string());
    }
    for (index, pattern) in doc.trigger_patterns().iter().enumerate() {
        if pattern.trim().is_empty() {
            violations.push(format!("triggers.patterns[{index}]: must be non-empty"));
        }
    }
    if !violations.is_empty() {
        return Err(Error::Schema {
            path: path.to_path_buf(),
            fields: violations,
        });
    }

    let group = group_of(root, path);
    let (mut runtime, mut warnings) = classify(&doc, &group, path.to_path_buf());

    // Partial-dependency check. Undeclared use demotes an active prompt;
    // declared-but-unused only warns.
    let partial_refs = extract_partial_refs(&doc.template);
    let declared = doc.declared_partials();
    let undeclared: Vec<&str> = partial_refs
        .iter()
        .filter(|name| !declared.contains(name))
        .map(String::as_str)
        .collect();
    if !undeclared.is_empty() {
        warnings.push(format!(
            "template references undeclared partial(s): {}",
            undeclared.join(", ")
        ));
        if runtime.runtime_state == RuntimeState::Active {
            runtime.runtime_state = RuntimeState::Warning;
        }
    }
    for name in declared {
        if !partial_refs.contains(name) {
            warnings.push(format!("declared partial '{name}' is never used"));
        }
    }

    let schema = ArgSchema::from_document(&doc.args);

    Ok(ParsedPrompt {
        runtime,
        document: doc,
        schema,
        partial_refs,
        warnings,
    })
}

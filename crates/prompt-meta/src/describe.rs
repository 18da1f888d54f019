//! Tool description assembly
//!
//! Clients pick among prompts by reading tool descriptions, so the
//! structured blocks of the document (triggers, rules, tags, use-cases)
//! are folded into the description text.

use crate::classify::PromptRuntime;
use crate::document::PromptDocument;

/// Build the description string advertised for a prompt tool.
pub fn build_description(doc: &PromptDocument, runtime: &PromptRuntime) -> String {
    let mut sections = Vec::new();

    let lead = doc
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(doc.title.as_str());
    sections.push(lead.to_string());

    let patterns = doc.trigger_patterns();
    if !patterns.is_empty() {
        sections.push(format!("Triggers: {}", patterns.join(", ")));
    }
    if !doc.rules.is_empty() {
        sections.push(format!("Rules: {}", doc.rules.join(" | ")));
    }
    if !runtime.tags.is_empty() {
        sections.push(format!("Tags: {}", runtime.tags.join(", ")));
    }
    if !runtime.use_cases.is_empty() {
        sections.push(format!("Use cases: {}", runtime.use_cases.join(", ")));
    }

    sections.join("\n")
}

//! Partial-reference extraction
//!
//! Finds the set of partial names a template body references with the
//! `{{> name }}` form, so undeclared usage can demote a prompt before the
//! template ever renders.

use std::sync::OnceLock;

use regex::Regex;

fn partial_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{>\s*([A-Za-z0-9_-]+)").unwrap_or_else(|e| {
            // The pattern is a literal; a failure here is a programming error.
            panic!("invalid partial-reference pattern: {e}")
        })
    })
}

/// Referenced partial names, deduplicated, in order of first appearance.
pub fn extract_partial_refs(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in partial_re().captures_iter(template) {
        if let Some(name) = cap.get(1) {
            let name = name.as_str().to_string();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
    }
    seen
}

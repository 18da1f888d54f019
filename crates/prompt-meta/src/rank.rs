//! Priority ranking
//!
//! Candidates eligible to be tools are totally ordered by status, version,
//! source kind, and finally id. When two files provide the same id, only
//! the ranking winner is registered; the ordering is also the registration
//! order, so an unchanged tree always registers identically.

use std::cmp::Ordering;

use crate::classify::{PromptRuntime, PromptStatus, SourceKind};

/// Higher wins. stable > draft > deprecated > legacy.
pub fn status_weight(status: PromptStatus) -> u8 {
    match status {
        PromptStatus::Stable => 4,
        PromptStatus::Draft => 3,
        PromptStatus::Deprecated => 2,
        PromptStatus::Legacy => 1,
    }
}

/// Higher wins. registry > embedded > legacy.
pub fn source_weight(source: SourceKind) -> u8 {
    match source {
        SourceKind::Registry => 3,
        SourceKind::Embedded => 2,
        SourceKind::Legacy => 1,
    }
}

fn version_key(runtime: &PromptRuntime) -> (u64, u64, u64) {
    runtime
        .version
        .as_ref()
        .map(|v| (v.major, v.minor, v.patch))
        .unwrap_or((0, 0, 0))
}

/// Total priority order: `Less` means `a` ranks ahead of `b`.
pub fn compare_priority(a: &PromptRuntime, b: &PromptRuntime) -> Ordering {
    status_weight(b.status)
        .cmp(&status_weight(a.status))
        .then_with(|| version_key(b).cmp(&version_key(a)))
        .then_with(|| source_weight(b.source).cmp(&source_weight(a.source)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Stable-sort arbitrary carriers by the priority of their runtime.
pub fn rank_candidates<T>(items: &mut [T], runtime_of: impl Fn(&T) -> &PromptRuntime) {
    items.sort_by(|a, b| compare_priority(runtime_of(a), runtime_of(b)));
}

//! End-to-end scenarios through the protocol server

use serde_json::json;

use prompt_meta::RuntimeState;

use crate::common::{harness, CODE_REVIEW};

#[tokio::test]
async fn scenario_active_metadata_prompt() {
    let h = harness(&[("common/code-review.yaml", CODE_REVIEW)], "common").await;

    let runtime = h.engine.store().get("code-review").unwrap();
    assert_eq!(runtime.runtime_state, RuntimeState::Active);
    assert_eq!(runtime.source, prompt_meta::SourceKind::Embedded);

    let response = h.call_tool("code-review", json!({"code": "x=1"})).await;
    assert!(response.contains("Review: x=1"));
    assert!(!response.contains("is_error"));
}

#[tokio::test]
async fn scenario_legacy_prompt_promoted_by_registry() {
    let h = harness(
        &[
            ("common/foo.yaml", "id: foo\ntitle: Foo\ntemplate: hi\n"),
            (
                "registry.yaml",
                "prompts:\n  - id: foo\n    group: g1\n    visibility: private\n    deprecated: false\n",
            ),
        ],
        "common",
    )
    .await;

    let runtime = h.engine.store().get("foo").unwrap();
    assert_eq!(runtime.runtime_state, RuntimeState::Active);
    assert_eq!(runtime.source, prompt_meta::SourceKind::Registry);
    assert_eq!(runtime.group, "g1");
    assert_eq!(runtime.visibility, Some(prompt_meta::Visibility::Private));
    assert!(h.registry.contains("foo"));
}

#[tokio::test]
async fn scenario_deprecation_disables() {
    let h = harness(
        &[
            ("common/foo.yaml", "id: foo\ntitle: Foo\ntemplate: hi\n"),
            ("registry.yaml", "prompts:\n  - id: foo\n    deprecated: true\n"),
        ],
        "common",
    )
    .await;

    let runtime = h.engine.store().get("foo").unwrap();
    assert_eq!(runtime.runtime_state, RuntimeState::Disabled);
    assert!(!h.registry.contains("foo"));

    let response = h.call_tool("foo", json!({})).await;
    assert!(response.contains("unknown tool"));
}

#[tokio::test]
async fn scenario_duplicate_id_priority() {
    let h = harness(
        &[
            (
                "common/x.yaml",
                "id: x\ntitle: X draft\nversion: 1.0.0\nstatus: draft\ntemplate: from draft\n",
            ),
            (
                "laravel/x.yaml",
                "id: x\ntitle: X stable\nversion: 1.0.1\nstatus: stable\ntemplate: from stable\n",
            ),
        ],
        "common,laravel",
    )
    .await;

    assert_eq!(h.registry.len(), 1);
    let runtime = h.engine.store().get("x").unwrap();
    assert_eq!(runtime.title, "X stable");

    let response = h.call_tool("x", json!({})).await;
    assert!(response.contains("from stable"));
}

#[tokio::test]
async fn scenario_undeclared_partial_warning() {
    let h = harness(
        &[(
            "common/a.yaml",
            "id: a\ntitle: A\nversion: 1.0.0\nstatus: stable\ndependencies:\n  partials: []\ntemplate: \"{{> role-expert }} go\"\n",
        )],
        "common",
    )
    .await;

    let runtime = h.engine.store().get("a").unwrap();
    assert_eq!(runtime.runtime_state, RuntimeState::Warning);
    assert!(!h.registry.contains("a"));

    let stats = h.call_tool("stats", json!({})).await;
    assert!(stats.contains("\\\"warning\\\": 1"));
}

#[tokio::test]
async fn empty_repository_loads_cleanly() {
    let h = harness(&[], "").await;
    let report = h.engine.full_reload().await.unwrap();
    assert_eq!(report.loaded, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn malformed_registry_is_treated_as_absent() {
    let h = harness(
        &[
            ("common/foo.yaml", "id: foo\ntitle: Foo\ntemplate: hi\n"),
            ("registry.yaml", "prompts: [broken: [yaml"),
        ],
        "common",
    )
    .await;

    // The legacy prompt loads as if no registry existed.
    let runtime = h.engine.store().get("foo").unwrap();
    assert_eq!(runtime.runtime_state, RuntimeState::Legacy);
    assert_eq!(runtime.source, prompt_meta::SourceKind::Legacy);
    assert!(h.registry.contains("foo"));
    assert!(!h.engine.registry_enabled());
}

#[tokio::test]
async fn reload_tool_reports_loaded_and_errors() {
    let h = harness(
        &[
            ("good.yaml", "id: good\ntitle: Good\ntemplate: ok\n"),
            ("bad.yaml", "id: [unterminated\n"),
        ],
        "",
    )
    .await;

    let response = h.call_tool("reload", json!({})).await;
    assert!(response.contains("\\\"loaded\\\": 1"));
    assert!(response.contains("bad.yaml"));
}

#[tokio::test]
async fn switch_source_swaps_catalogue() {
    let h = harness(&[("first.yaml", "id: first\ntitle: First\ntemplate: f\n")], "").await;
    assert!(h.registry.contains("first"));

    let next = tempfile::TempDir::new().unwrap();
    crate::common::write_file(
        &next.path().join("second.yaml"),
        "id: second\ntitle: Second\ntemplate: s\n",
    );

    let response = h
        .call_tool(
            "switch_source",
            json!({"url": next.path().to_string_lossy()}),
        )
        .await;
    assert!(response.contains("\\\"loaded\\\": 1"));
    assert!(h.registry.contains("second"));
    assert!(!h.registry.contains("first"));
}

#[tokio::test]
async fn switch_source_rejects_invalid_url() {
    let h = harness(&[("a.yaml", "id: a\ntitle: A\ntemplate: x\n")], "").await;

    let response = h
        .call_tool("switch_source", json!({"url": "relative/path"}))
        .await;
    assert!(response.contains("is_error"));
    // The previous catalogue is untouched.
    assert!(h.registry.contains("a"));
}

#[tokio::test]
async fn two_reloads_produce_identical_state() {
    let h = harness(
        &[
            ("common/code-review.yaml", CODE_REVIEW),
            ("common/legacy.yaml", "id: legacy\ntitle: Legacy\ntemplate: l\n"),
            ("registry.yaml", "prompts:\n  - id: legacy\n    group: g2\n"),
        ],
        "common",
    )
    .await;

    h.engine.full_reload().await.unwrap();
    let first = serde_json::to_string(&h.engine.store().snapshot()).unwrap();
    h.engine.full_reload().await.unwrap();
    let second = serde_json::to_string(&h.engine.store().snapshot()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn handle_index_matches_tool_states() {
    // Invariant: after a reload the handle index holds exactly the ids
    // whose runtime state is active or legacy.
    let h = harness(
        &[
            ("common/code-review.yaml", CODE_REVIEW),
            ("common/legacy.yaml", "id: legacy\ntitle: L\ntemplate: l\n"),
            (
                "common/warned.yaml",
                "id: warned\ntitle: W\nversion: 1.0.0\nstatus: stable\ntemplate: \"{{> ghost }}\"\n",
            ),
            ("registry.yaml", "prompts:\n  - id: retired\n    deprecated: true\n"),
            ("common/retired.yaml", "id: retired\ntitle: Retired\ntemplate: r\n"),
        ],
        "common",
    )
    .await;

    for runtime in h.engine.store().snapshot() {
        let has_handle = h.engine.store().handle(&runtime.id).is_some();
        assert_eq!(
            has_handle,
            runtime.runtime_state.is_tool(),
            "id {} state {:?}",
            runtime.id,
            runtime.runtime_state
        );
        assert_eq!(has_handle, h.registry.contains(&runtime.id));
    }
}

#[tokio::test]
async fn deleted_file_drops_its_tool() {
    let h = harness(&[("common/code-review.yaml", CODE_REVIEW)], "common").await;
    assert!(h.registry.contains("code-review"));

    h.remove("common/code-review.yaml");
    h.engine
        .single_reload(&h.source.path().join("common/code-review.yaml"))
        .await
        .unwrap();

    assert!(h.engine.store().get("code-review").is_none());
    assert!(!h.registry.contains("code-review"));
}

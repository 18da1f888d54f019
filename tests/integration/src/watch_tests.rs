//! Hot-reload through the real watcher stack

use std::time::Duration;

use serde_json::json;

use crate::common::{harness, CODE_REVIEW};

/// Scenario: with watch mode on, an edit to a prompt file lands in the
/// running server without any interval during which the tool is missing.
#[tokio::test(flavor = "multi_thread")]
async fn edit_hot_reloads_without_unregistering() {
    let h = harness(&[("common/code-review.yaml", CODE_REVIEW)], "common").await;
    h.server
        .state()
        .watchers
        .start(&h.engine, Duration::from_secs(3600))
        .unwrap();

    let updated = CODE_REVIEW.replace("title: Code Review", "title: Deep Code Review");
    h.write("common/code-review.yaml", &updated);

    // Wait out the debounce window while the tool stays invocable.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        assert!(h.registry.contains("code-review"), "tool vanished mid-reload");
        let title = h
            .engine
            .store()
            .get("code-review")
            .map(|runtime| runtime.title);
        if title.as_deref() == Some("Deep Code Review") {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "watcher never delivered the edit"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let response = h.call_tool("code-review", json!({"code": "y"})).await;
    assert!(response.contains("Review: y"));

    h.server.state().watchers.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn created_file_appears_via_watcher() {
    let h = harness(&[], "common").await;
    h.server
        .state()
        .watchers
        .start(&h.engine, Duration::from_secs(3600))
        .unwrap();

    h.write(
        "common/newborn.yaml",
        "id: newborn\ntitle: Newborn\ntemplate: hello\n",
    );

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !h.registry.contains("newborn") {
        assert!(
            tokio::time::Instant::now() < deadline,
            "watcher never delivered the new file"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let response = h.call_tool("newborn", json!({})).await;
    assert!(response.contains("hello"));

    h.server.state().watchers.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn watcher_stop_is_idempotent_through_the_server() {
    let h = harness(&[], "").await;
    h.server
        .state()
        .watchers
        .start(&h.engine, Duration::from_secs(3600))
        .unwrap();
    h.server.state().watchers.stop();
    h.server.state().watchers.stop();
}

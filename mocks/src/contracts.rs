//! Contract test suites for validating trait implementations.
//!
//! Any `TaskStore`/`ClaimStore`/... implementation — in-memory or
//! SQLite-backed — should pass these to be considered compliant with
//! the trait's contract. Generic over the trait so the same suite runs
//! against both backends.

use chrono::Utc;
use scrum_core::models::{ClaimOutcome, NewTask, Priority, TaskPatch, TaskStatus};
use scrum_core::store::{ClaimStore, TaskStore};

/// Exercise the basic create/get/update/list/delete lifecycle any
/// `TaskStore` implementation must support.
pub async fn test_task_store_contract<S: TaskStore>(store: &S) {
    let new_task = NewTask {
        title: "Contract task".to_string(),
        description: Some("created by the contract suite".to_string()),
        priority: Priority::High,
        assigned_agent: None,
        due_date: None,
        labels: Default::default(),
        story_points: None,
    };

    let created = store.create(new_task.clone()).await.expect("create should succeed");
    assert_eq!(created.title, new_task.title, "create should preserve title");
    assert_eq!(created.status, TaskStatus::Backlog, "new task should start in Backlog");

    let fetched = store.get(&created.id).await.expect("get should succeed");
    assert_eq!(fetched.as_ref().map(|t| &t.id), Some(&created.id));

    let updated = store
        .update(
            &created.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .expect("update should succeed");
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert!(updated.started_at.is_some(), "entering InProgress should stamp started_at");

    let all = store.list_all().await.expect("list_all should succeed");
    assert!(all.iter().any(|t| t.id == created.id));

    store.delete(&created.id).await.expect("delete should succeed");
    assert!(store.get(&created.id).await.unwrap().is_none(), "deleted task should no longer be gettable");
}

/// Getting a task that never existed returns `Ok(None)`, not an error.
pub async fn test_task_store_get_missing_is_none<S: TaskStore>(store: &S) {
    assert!(store.get("definitely-not-a-real-id").await.unwrap().is_none());
}

/// Claiming an unheld file succeeds; claiming it again from a different
/// agent before expiry reports a conflict, not an error (§4.3).
pub async fn test_claim_store_conflict_contract<S: ClaimStore>(store: &S) {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::seconds(300);

    let first = store
        .create("agent-a", vec!["src/lib.rs".to_string()], expires_at, now)
        .await
        .expect("first claim should succeed");
    assert!(matches!(first, ClaimOutcome::Ok(_)));

    let second = store
        .create("agent-b", vec!["src/lib.rs".to_string()], expires_at, now)
        .await
        .expect("conflicting claim should not error");
    match second {
        ClaimOutcome::Conflict { conflicts_with } => assert_eq!(conflicts_with, vec!["agent-a".to_string()]),
        ClaimOutcome::Ok(_) => panic!("expected a conflict, got Ok"),
    }
}

/// Once a claim has expired, the same file can be claimed by someone
/// else without a conflict (§4.3).
pub async fn test_claim_store_expiry_releases_contention<S: ClaimStore>(store: &S) {
    let now = Utc::now();
    let soon = now + chrono::Duration::seconds(1);

    store
        .create("agent-a", vec!["src/lib.rs".to_string()], soon, now)
        .await
        .unwrap();

    let later = now + chrono::Duration::seconds(2);
    let outcome = store
        .create("agent-b", vec!["src/lib.rs".to_string()], later + chrono::Duration::seconds(300), later)
        .await
        .unwrap();
    assert!(matches!(outcome, ClaimOutcome::Ok(_)), "expired claim should not block a new one");
}

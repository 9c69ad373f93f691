//! End-to-end scenarios against the composed `Facade`, backed by the
//! in-memory stores from `mocks`. Mirrors the literal S1-S8 walkthroughs
//! and the testable properties they're drawn from.

use std::sync::Arc;

use mocks::{InMemoryAgentStore, InMemoryChangelogStore, InMemoryClaimStore, InMemoryEvidenceStore, InMemoryIntentStore, InMemoryTaskStore, VirtualClock};
use scrum_core::error::ScrumError;
use scrum_core::events::EventBus;
use scrum_core::facade::Facade;
use scrum_core::models::{ChangeType, ClaimOutcome, NewChangelogEntry, NewEvidence, NewIntent, NewTask, Priority, TaskPatch, TaskStatus, UpdateOptions};

fn new_facade() -> (Facade, Arc<VirtualClock>) {
    let tasks = Arc::new(InMemoryTaskStore::new());
    let clock = Arc::new(VirtualClock::at_now());
    let facade = Facade::new(
        tasks.clone(),
        Arc::new(InMemoryIntentStore::new()),
        Arc::new(InMemoryClaimStore::new()),
        Arc::new(InMemoryEvidenceStore::new()),
        Arc::new(InMemoryChangelogStore::new()),
        Arc::new(InMemoryAgentStore::new(tasks)),
        clock.clone(),
        Arc::new(EventBus::new()),
    );
    (facade, clock)
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        priority: Priority::Medium,
        assigned_agent: None,
        due_date: None,
        labels: Default::default(),
        story_points: None,
    }
}

/// S1 — happy path: intent -> claim -> changelog -> evidence -> release -> done.
#[tokio::test]
async fn s1_happy_path() {
    let (facade, _clock) = new_facade();

    let task = facade.create_task(new_task("Fix login")).await.unwrap();

    facade
        .post_intent(NewIntent {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            files: vec!["src/auth.ts".to_string()],
            boundaries: None,
            acceptance_criteria: "tests pass".to_string(),
        })
        .await
        .unwrap();

    let outcome = facade
        .claim_files("A", vec!["src/auth.ts".to_string()], 900, 5, 3600)
        .await
        .unwrap();
    assert!(matches!(outcome, ClaimOutcome::Ok(_)));

    facade
        .append_changelog(NewChangelogEntry {
            task_id: Some(task.id.clone()),
            agent_id: "A".to_string(),
            file_path: "src/auth.ts".to_string(),
            change_type: ChangeType::Modify,
            summary: "x".to_string(),
            diff_snippet: None,
            commit_hash: None,
        })
        .await
        .unwrap();

    facade
        .attach_evidence(NewEvidence {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            command: "test cmd".to_string(),
            output: "ok".to_string(),
        })
        .await
        .unwrap();

    facade.release_claim("A", None).await.unwrap();

    let done = facade
        .update_task(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
            UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(done.task.status, TaskStatus::Done);

    let history = facade
        .query_changelog(scrum_core::models::ChangelogFilter {
            task_id: Some(task.id.clone()),
            change_type: Some(ChangeType::TaskCompleted),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 1, "exactly one task_completed entry");
}

/// S2 — conflict: B has intent on "f" too, but A holds the claim first.
#[tokio::test]
async fn s2_conflict_reports_holder_without_writing() {
    let (facade, _clock) = new_facade();
    let task = facade.create_task(new_task("Shared file")).await.unwrap();

    for agent in ["A", "B"] {
        facade
            .post_intent(NewIntent {
                task_id: task.id.clone(),
                agent_id: agent.to_string(),
                files: vec!["f".to_string()],
                boundaries: None,
                acceptance_criteria: "n/a".to_string(),
            })
            .await
            .unwrap();
    }

    let a_outcome = facade.claim_files("A", vec!["f".to_string()], 60, 5, 3600).await.unwrap();
    assert!(matches!(a_outcome, ClaimOutcome::Ok(_)));

    let b_outcome = facade.claim_files("B", vec!["f".to_string()], 60, 5, 3600).await.unwrap();
    match b_outcome {
        ClaimOutcome::Conflict { conflicts_with } => assert_eq!(conflicts_with, vec!["A".to_string()]),
        ClaimOutcome::Ok(_) => panic!("expected a conflict"),
    }

    let active = facade.list_active_claims().await.unwrap();
    assert_eq!(active.len(), 1, "no row should be written for B");
}

/// S3 — expiry: once A's claim lapses, B can claim the same file.
#[tokio::test]
async fn s3_expired_claim_releases_contention() {
    let (facade, clock) = new_facade();
    let task = facade.create_task(new_task("Expiring file")).await.unwrap();

    for agent in ["A", "B"] {
        facade
            .post_intent(NewIntent {
                task_id: task.id.clone(),
                agent_id: agent.to_string(),
                files: vec!["f".to_string()],
                boundaries: None,
                acceptance_criteria: "n/a".to_string(),
            })
            .await
            .unwrap();
    }

    facade.claim_files("A", vec!["f".to_string()], 5, 5, 3600).await.unwrap();
    clock.advance_secs(10);

    let outcome = facade.claim_files("B", vec!["f".to_string()], 60, 5, 3600).await.unwrap();
    assert!(matches!(outcome, ClaimOutcome::Ok(_)));
}

/// S4 — scope violation: A modifies an undeclared file and release is rejected.
#[tokio::test]
async fn s4_scope_violation_blocks_release() {
    let (facade, _clock) = new_facade();
    let task = facade.create_task(new_task("Scope test")).await.unwrap();

    facade
        .post_intent(NewIntent {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            files: vec!["x.ts".to_string()],
            boundaries: None,
            acceptance_criteria: "n/a".to_string(),
        })
        .await
        .unwrap();
    facade.claim_files("A", vec!["x.ts".to_string()], 900, 5, 3600).await.unwrap();

    facade
        .append_changelog(NewChangelogEntry {
            task_id: Some(task.id.clone()),
            agent_id: "A".to_string(),
            file_path: "y.ts".to_string(),
            change_type: ChangeType::Modify,
            summary: "oops".to_string(),
            diff_snippet: None,
            commit_hash: None,
        })
        .await
        .unwrap();

    facade
        .attach_evidence(NewEvidence {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            command: "test".to_string(),
            output: "ok".to_string(),
        })
        .await
        .unwrap();

    let result = facade.release_claim("A", None).await;
    match result {
        Err(ScrumError::Precondition(scrum_core::error::PreconditionKind::ComplianceFailed { undeclared })) => {
            assert_eq!(undeclared, vec!["y.ts".to_string()]);
        }
        other => panic!("expected COMPLIANCE_FAILED, got {other:?}"),
    }

    let active = facade.list_active_claims().await.unwrap();
    assert_eq!(active.len(), 1, "claim should remain held");
}

/// S5 — boundary violation: A modifies a file under a declared boundary.
#[tokio::test]
async fn s5_boundary_violation_blocks_release() {
    let (facade, _clock) = new_facade();
    let task = facade.create_task(new_task("Boundary test")).await.unwrap();

    facade
        .post_intent(NewIntent {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            files: vec!["a.ts".to_string()],
            boundaries: Some("src/secrets/".to_string()),
            acceptance_criteria: "n/a".to_string(),
        })
        .await
        .unwrap();
    facade.claim_files("A", vec!["a.ts".to_string()], 900, 5, 3600).await.unwrap();

    facade
        .append_changelog(NewChangelogEntry {
            task_id: Some(task.id.clone()),
            agent_id: "A".to_string(),
            file_path: "src/secrets/k.ts".to_string(),
            change_type: ChangeType::Modify,
            summary: "leaked".to_string(),
            diff_snippet: None,
            commit_hash: None,
        })
        .await
        .unwrap();
    facade
        .attach_evidence(NewEvidence {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            command: "test".to_string(),
            output: "ok".to_string(),
        })
        .await
        .unwrap();

    let result = facade.release_claim("A", None).await;
    assert!(matches!(
        result,
        Err(ScrumError::Precondition(scrum_core::error::PreconditionKind::BoundaryViolation { .. }))
    ));
}

/// S6 — dependency gate: T2 cannot go in_progress until T1 is done.
#[tokio::test]
async fn s6_dependency_gate() {
    let (facade, _clock) = new_facade();
    let t1 = facade.create_task(new_task("Prerequisite")).await.unwrap();
    let t2 = facade.create_task(new_task("Dependent")).await.unwrap();

    facade.add_dependency(&t2.id, &t1.id).await.unwrap();

    let result = facade
        .update_task(
            &t2.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            UpdateOptions::default(),
        )
        .await;
    assert!(matches!(
        result,
        Err(ScrumError::Precondition(scrum_core::error::PreconditionKind::DependencyBlocked { .. }))
    ));

    facade
        .update_task(
            &t1.id,
            TaskPatch {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
            UpdateOptions::default(),
        )
        .await
        .unwrap();

    let ready = facade
        .update_task(
            &t2.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            UpdateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(ready.task.status, TaskStatus::InProgress);
}

/// S7 — cycle rejection.
#[tokio::test]
async fn s7_cycle_rejected() {
    let (facade, _clock) = new_facade();
    let t1 = facade.create_task(new_task("T1")).await.unwrap();
    let t2 = facade.create_task(new_task("T2")).await.unwrap();

    facade.add_dependency(&t1.id, &t2.id).await.unwrap();
    let result = facade.add_dependency(&t2.id, &t1.id).await;
    assert!(matches!(
        result,
        Err(ScrumError::Precondition(scrum_core::error::PreconditionKind::Cycle))
    ));
}

/// S8 — WIP limit.
#[tokio::test]
async fn s8_wip_limit_exceeded() {
    let (facade, _clock) = new_facade();
    facade.set_wip_limit(TaskStatus::InProgress, 1).await.unwrap();

    let t1 = facade.create_task(new_task("First")).await.unwrap();
    facade
        .update_task(
            &t1.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            UpdateOptions::default(),
        )
        .await
        .unwrap();

    let t2 = facade.create_task(new_task("Second")).await.unwrap();
    let result = facade
        .update_task(
            &t2.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            UpdateOptions::default(),
        )
        .await;
    assert!(matches!(
        result,
        Err(ScrumError::Precondition(scrum_core::error::PreconditionKind::WipExceeded { .. }))
    ));
}

/// Testable property: releasing already-released claims is a no-op
/// returning without error (not a crash or a conflict).
#[tokio::test]
async fn release_with_no_claims_held_but_evidence_present_is_a_noop() {
    let (facade, _clock) = new_facade();
    let task = facade.create_task(new_task("No claims")).await.unwrap();

    facade
        .post_intent(NewIntent {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            files: vec!["a.rs".to_string()],
            boundaries: None,
            acceptance_criteria: "n/a".to_string(),
        })
        .await
        .unwrap();
    facade
        .attach_evidence(NewEvidence {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            command: "test".to_string(),
            output: "ok".to_string(),
        })
        .await
        .unwrap();

    facade.release_claim("A", None).await.unwrap();
    facade.release_claim("A", None).await.unwrap();
}

/// Testable property: release without any attached evidence is rejected.
#[tokio::test]
async fn release_without_evidence_is_rejected() {
    let (facade, _clock) = new_facade();
    let task = facade.create_task(new_task("No evidence")).await.unwrap();
    facade
        .post_intent(NewIntent {
            task_id: task.id.clone(),
            agent_id: "A".to_string(),
            files: vec!["a.rs".to_string()],
            boundaries: None,
            acceptance_criteria: "n/a".to_string(),
        })
        .await
        .unwrap();
    facade.claim_files("A", vec!["a.rs".to_string()], 900, 5, 3600).await.unwrap();

    let result = facade.release_claim("A", None).await;
    assert!(matches!(
        result,
        Err(ScrumError::Precondition(scrum_core::error::PreconditionKind::NoEvidence))
    ));
}

/// Testable property: claiming files without a matching intent is rejected.
#[tokio::test]
async fn claim_without_intent_is_rejected() {
    let (facade, _clock) = new_facade();
    let _task = facade.create_task(new_task("No intent")).await.unwrap();
    let result = facade.claim_files("A", vec!["a.rs".to_string()], 900, 5, 3600).await;
    assert!(matches!(
        result,
        Err(ScrumError::Precondition(scrum_core::error::PreconditionKind::NoIntent { .. }))
    ));
}

/// Testable property: extending a claim that does not exist returns 0 rows extended.
#[tokio::test]
async fn extend_nonexistent_claim_returns_none() {
    let (facade, _clock) = new_facade();
    let result = facade.extend_claims("ghost-agent", 300, None).await.unwrap();
    assert!(result.is_none());
}

/// Testable property: with `enforceDependencies = false`, an unready task
/// still moves into `in_progress`, but the caller gets a warning instead
/// of silence.
#[tokio::test]
async fn unenforced_dependency_gate_warns_instead_of_blocking() {
    let (facade, _clock) = new_facade();
    let t1 = facade.create_task(new_task("Prerequisite")).await.unwrap();
    let t2 = facade.create_task(new_task("Dependent")).await.unwrap();
    facade.add_dependency(&t2.id, &t1.id).await.unwrap();

    let result = facade
        .update_task(
            &t2.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            UpdateOptions {
                enforce_dependencies: false,
                enforce_wip_limits: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.task.status, TaskStatus::InProgress);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains(&t1.id));
}

/// Testable property: with `enforceWipLimits = false`, exceeding the
/// limit still moves the task, with a warning.
#[tokio::test]
async fn unenforced_wip_limit_warns_instead_of_blocking() {
    let (facade, _clock) = new_facade();
    facade.set_wip_limit(TaskStatus::InProgress, 1).await.unwrap();

    let t1 = facade.create_task(new_task("First")).await.unwrap();
    facade
        .update_task(
            &t1.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            UpdateOptions::default(),
        )
        .await
        .unwrap();

    let t2 = facade.create_task(new_task("Second")).await.unwrap();
    let result = facade
        .update_task(
            &t2.id,
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            UpdateOptions {
                enforce_dependencies: true,
                enforce_wip_limits: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.task.status, TaskStatus::InProgress);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("WIP limit exceeded"));
}

/// Testable property: registering an agent and sending its heartbeat
/// each publish their named event (§4.8 `agent.registered`/`agent.heartbeat`).
#[tokio::test]
async fn agent_register_and_heartbeat_publish_events() {
    let (facade, _clock) = new_facade();
    let mut events = facade.events.subscribe();

    facade.register_agent("agent-a", vec![], None).await.unwrap();
    facade.heartbeat("agent-a").await.unwrap();

    let first = events.recv().await.unwrap();
    assert!(matches!(first, scrum_core::events::Event::AgentRegistered { agent_id } if agent_id == "agent-a"));
    let second = events.recv().await.unwrap();
    assert!(matches!(second, scrum_core::events::Event::AgentHeartbeat { agent_id } if agent_id == "agent-a"));
}

//! Custom assertion helpers for testing.
//!
//! Specialized assertions for task state, compliance reports, and the
//! precondition-kind error taxonomy, so scenario tests read as a
//! sequence of claims instead of a wall of `assert_eq!`.

use scrum_core::compliance::ComplianceReport;
use scrum_core::error::{PreconditionKind, ScrumError};
use scrum_core::models::{Task, TaskStatus};

/// Assert a task is in the expected status, with a message naming both
/// the task id and the mismatch.
pub fn assert_task_status(task: &Task, expected: TaskStatus) {
    assert_eq!(
        task.status, expected,
        "task '{}' expected status {expected:?}, got {:?}",
        task.id, task.status
    );
}

/// Assert a task list contains a task with the given id.
pub fn assert_contains_task(tasks: &[Task], id: &str) {
    assert!(
        tasks.iter().any(|t| t.id == id),
        "expected to find task '{}' in task list, but it wasn't found. Available ids: {:?}",
        id,
        tasks.iter().map(|t| &t.id).collect::<Vec<_>>()
    );
}

/// Assert a compliance report is compliant (`score >= threshold`).
pub fn assert_compliant(report: &ComplianceReport) {
    assert!(
        report.compliant,
        "expected agent '{}' to be compliant on task '{}', score was {} ({:?})",
        report.agent_id, report.task_id, report.score, report
    );
}

/// Assert a compliance report permits completing the task (§4.6
/// `canComplete`), distinct from `compliant` (the score threshold).
pub fn assert_can_complete(report: &ComplianceReport) {
    assert!(
        report.can_complete,
        "expected agent '{}' to be able to complete task '{}', but canComplete was false ({:?})",
        report.agent_id, report.task_id, report
    );
}

/// Assert a `Result` failed with the given precondition kind, ignoring
/// the kind's payload (e.g. which files were undeclared).
pub fn assert_precondition<T: std::fmt::Debug>(result: &Result<T, ScrumError>, expected: &str) {
    match result {
        Err(ScrumError::Precondition(kind)) => {
            let code = ScrumError::Precondition(kind.clone()).kind_code();
            assert_eq!(code, expected, "expected precondition {expected}, got {code}");
        }
        other => panic!("expected a precondition error ({expected}), got {other:?}"),
    }
}

/// Assert a `Result` failed with `NOT_FOUND`.
pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, ScrumError>) {
    match result {
        Err(err) if err.is_not_found() => {}
        other => panic!("expected a NOT_FOUND error, got {other:?}"),
    }
}

/// Assert a dependency-blocked precondition names `task_id` among the
/// blocking tasks.
pub fn assert_blocked_by(err: &ScrumError, task_id: &str) {
    match err {
        ScrumError::Precondition(PreconditionKind::DependencyBlocked { blocking_task_ids }) => {
            assert!(
                blocking_task_ids.iter().any(|t| t == task_id),
                "expected '{task_id}' among blocking tasks, got {blocking_task_ids:?}"
            );
        }
        other => panic!("expected DependencyBlocked naming '{task_id}', got {other:?}"),
    }
}

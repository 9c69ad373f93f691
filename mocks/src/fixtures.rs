//! Standard test fixtures for consistent testing.
//!
//! Pre-built `Task`/`Intent`/`Evidence` data covering common scenarios,
//! so tests read as "given these fixtures" rather than reconstructing
//! the same boilerplate every time.

use chrono::Utc;
use scrum_core::models::{NewEvidence, NewIntent, NewTask, Priority, Task, TaskStatus};

use crate::builders::NewTaskBuilder;

/// A plain backlog task with sensible defaults.
pub fn create_new_task() -> NewTask {
    NewTaskBuilder::new().with_title("Implement the login flow").build()
}

/// A `NewTask` with a specific title, for tests asserting on identity.
pub fn create_new_task_with_title(title: &str) -> NewTask {
    NewTaskBuilder::new().with_title(title).build()
}

/// A fully-populated `Task` as it would look once persisted, useful for
/// seeding an `InMemoryTaskStore::with_tasks`.
pub fn create_test_task(id: &str, status: TaskStatus) -> Task {
    let now = Utc::now();
    Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: Some("A fixture task".to_string()),
        status,
        priority: Priority::Medium,
        assigned_agent: None,
        due_date: None,
        labels: Default::default(),
        story_points: None,
        created_at: now,
        started_at: if status == TaskStatus::InProgress { Some(now) } else { None },
        completed_at: if status == TaskStatus::Done { Some(now) } else { None },
        updated_at: now,
    }
}

/// One task per board column, for board-projection tests.
pub fn create_tasks_in_all_statuses() -> Vec<Task> {
    TaskStatus::BOARD_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, status)| create_test_task(&format!("t{i}"), *status))
        .collect()
}

/// A `NewIntent` declaring a single file, the common case in scenario
/// tests (§4.2).
pub fn create_new_intent(task_id: &str, agent_id: &str, file: &str) -> NewIntent {
    NewIntent {
        task_id: task_id.to_string(),
        agent_id: agent_id.to_string(),
        files: vec![file.to_string()],
        boundaries: None,
        acceptance_criteria: "The change compiles and existing tests pass".to_string(),
    }
}

/// Evidence of a passing test run, the common case for the compliance
/// "has evidence" bucket (§4.4, §4.6).
pub fn create_passing_evidence(task_id: &str, agent_id: &str) -> NewEvidence {
    NewEvidence {
        task_id: task_id.to_string(),
        agent_id: agent_id.to_string(),
        command: "cargo test".to_string(),
        output: "test result: ok. 12 passed; 0 failed".to_string(),
    }
}

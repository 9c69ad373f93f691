//! Random test data generators, using `fake` for realistic strings and
//! `proptest` for property-based strategies over domain types.

use chrono::Utc;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use proptest::prelude::*;
use rand::Rng;
use scrum_core::models::{NewTask, Priority, Task, TaskStatus};

/// Generate a realistic agent id (e.g. "rust-architect").
pub fn generate_agent_id() -> String {
    let agents = [
        "rust-architect",
        "database-engineer",
        "protocol-specialist",
        "integration-lead",
        "testing-expert",
        "documentation-specialist",
        "security-auditor",
        "performance-optimizer",
    ];
    agents[rand::thread_rng().gen_range(0..agents.len())].to_string()
}

/// Generate a realistic task title.
pub fn generate_task_title() -> String {
    Sentence(3..8).fake()
}

/// Generate a realistic task description.
pub fn generate_task_description() -> String {
    Paragraph(2..5).fake()
}

/// Generate a realistic source file path, the kind an intent or
/// changelog entry would name.
pub fn generate_file_path() -> String {
    let dirs = ["src", "src/handlers", "src/models", "tests", "src/db"];
    let exts = ["rs", "sql", "toml"];
    let dir = dirs[rand::thread_rng().gen_range(0..dirs.len())];
    let ext = exts[rand::thread_rng().gen_range(0..exts.len())];
    let name: u32 = (1..9999).fake();
    format!("{dir}/file_{name}.{ext}")
}

/// Generate a random `NewTask` with realistic data.
pub fn generate_new_task() -> NewTask {
    NewTask {
        title: generate_task_title(),
        description: Some(generate_task_description()),
        priority: generate_random_priority(),
        assigned_agent: None,
        due_date: None,
        labels: Default::default(),
        story_points: None,
    }
}

/// Generate a random `Task` as if freshly created.
pub fn generate_random_task(id: &str) -> Task {
    let now = Utc::now();
    Task {
        id: id.to_string(),
        title: generate_task_title(),
        description: Some(generate_task_description()),
        status: TaskStatus::Backlog,
        priority: generate_random_priority(),
        assigned_agent: None,
        due_date: None,
        labels: Default::default(),
        story_points: None,
        created_at: now,
        started_at: None,
        completed_at: None,
        updated_at: now,
    }
}

fn generate_random_priority() -> Priority {
    let priorities = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];
    priorities[rand::thread_rng().gen_range(0..priorities.len())]
}

/// A `proptest` strategy producing every `TaskStatus` board column.
pub fn arb_task_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Backlog),
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Review),
        Just(TaskStatus::Done),
        Just(TaskStatus::Cancelled),
    ]
}

/// A `proptest` strategy producing every `Priority`.
pub fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

/// A `proptest` strategy for plausible file paths, used to fuzz the
/// boundary matcher and intent/claim file-set logic.
pub fn arb_file_path() -> impl Strategy<Value = String> {
    "[a-z]{2,8}(/[a-z]{2,8}){0,3}\\.(rs|ts|sql)".prop_map(|s| s)
}

//! Builder pattern implementations for easy test data construction.
//!
//! Provides fluent builders for `NewTask`, `TaskPatch`, `NewIntent`,
//! `NewEvidence`, and `TaskFilter`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use scrum_core::models::{NewEvidence, NewIntent, NewTask, Priority, TaskFilter, TaskPatch, TaskStatus};

/// Builder for constructing `NewTask` instances in tests.
pub struct NewTaskBuilder {
    task: NewTask,
}

impl Default for NewTaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewTaskBuilder {
    pub fn new() -> Self {
        Self {
            task: NewTask {
                title: "Test task".to_string(),
                description: None,
                priority: Priority::Medium,
                assigned_agent: None,
                due_date: None,
                labels: BTreeSet::new(),
                story_points: None,
            },
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.task.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.task.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_assigned_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.task.assigned_agent = Some(agent_id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.task.labels.insert(label.into());
        self
    }

    pub fn with_story_points(mut self, points: f64) -> Self {
        self.task.story_points = Some(points);
        self
    }

    pub fn build(self) -> NewTask {
        self.task
    }
}

/// Builder for constructing `TaskPatch` instances in tests.
#[derive(Default)]
pub struct TaskPatchBuilder {
    patch: TaskPatch,
}

impl TaskPatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.patch.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.patch.priority = Some(priority);
        self
    }

    pub fn with_assigned_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.patch.assigned_agent = Some(Some(agent_id.into()));
        self
    }

    pub fn unassign(mut self) -> Self {
        self.patch.assigned_agent = Some(None);
        self
    }

    pub fn build(self) -> TaskPatch {
        self.patch
    }
}

/// Builder for constructing `NewIntent` instances in tests.
pub struct NewIntentBuilder {
    intent: NewIntent,
}

impl NewIntentBuilder {
    pub fn new(task_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            intent: NewIntent {
                task_id: task_id.into(),
                agent_id: agent_id.into(),
                files: Vec::new(),
                boundaries: None,
                acceptance_criteria: "Tests pass and the feature works as described".to_string(),
            },
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.intent.files.push(file.into());
        self
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.intent.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_boundaries(mut self, boundaries: impl Into<String>) -> Self {
        self.intent.boundaries = Some(boundaries.into());
        self
    }

    pub fn with_acceptance_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.intent.acceptance_criteria = criteria.into();
        self
    }

    pub fn build(self) -> NewIntent {
        self.intent
    }
}

/// Builder for constructing `NewEvidence` instances in tests.
pub struct NewEvidenceBuilder {
    evidence: NewEvidence,
}

impl NewEvidenceBuilder {
    pub fn new(task_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            evidence: NewEvidence {
                task_id: task_id.into(),
                agent_id: agent_id.into(),
                command: "cargo test".to_string(),
                output: "test result: ok".to_string(),
            },
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.evidence.command = command.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.evidence.output = output.into();
        self
    }

    pub fn build(self) -> NewEvidence {
        self.evidence
    }
}

/// Builder for constructing `TaskFilter` instances in tests.
#[derive(Default)]
pub struct TaskFilterBuilder {
    filter: TaskFilter,
}

impl TaskFilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assigned_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.filter.assigned_agent = Some(agent_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.filter.status = Some(status);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.filter.labels.push(label.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.filter.limit = Some(limit);
        self
    }

    pub fn build(self) -> TaskFilter {
        self.filter
    }
}

/// A fixed due date far enough in the future to never trip date-based
/// logic in a test by accident.
pub fn far_future_due_date() -> DateTime<Utc> {
    Utc::now() + chrono::Duration::days(365)
}

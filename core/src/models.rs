use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A unit of work tracked on the kanban board.
///
/// Timestamps `started_at`/`completed_at` are set the first time the task
/// ever enters `InProgress`/`Done` respectively, and are never cleared by a
/// later transition away from those states — they record history, not
/// current state.
///
/// # Examples
///
/// ```rust
/// use scrum_core::models::{Task, TaskStatus, Priority};
/// use chrono::Utc;
///
/// let task = Task {
///     id: "t_1".to_string(),
///     title: "Fix login".to_string(),
///     description: None,
///     status: TaskStatus::Backlog,
///     priority: Priority::Medium,
///     assigned_agent: None,
///     due_date: None,
///     labels: Default::default(),
///     story_points: None,
///     created_at: Utc::now(),
///     started_at: None,
///     completed_at: None,
///     updated_at: Utc::now(),
/// };
/// assert_eq!(task.status, TaskStatus::Backlog);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assigned_agent: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub labels: BTreeSet<String>,
    pub story_points: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Kanban board column. Status transitions are unrestricted at the data
/// layer except for the gates enforced by the facade (dependency
/// readiness, WIP limits — see `dependency` and `facade`).
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Review,
    Done,
    Cancelled,
}

impl TaskStatus {
    /// The five non-cancelled buckets shown on the board, in display order.
    pub const BOARD_COLUMNS: [TaskStatus; 5] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Input to `TaskStore::create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub assigned_agent: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    pub story_points: Option<f64>,
}

fn default_priority() -> Priority {
    Priority::Medium
}

/// Partial update for `TaskStore::update`. Every field absent means
/// "unchanged"; `status` going through here triggers the facade's
/// dependency/WIP gates and changelog emission (see `facade`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_agent: Option<Option<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub labels: Option<BTreeSet<String>>,
    pub story_points: Option<Option<f64>>,
}

/// Options controlling the status-change gates in `updateTask` (§4.1).
#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    pub enforce_dependencies: bool,
    pub enforce_wip_limits: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            enforce_dependencies: true,
            enforce_wip_limits: true,
        }
    }
}

/// Result of `updateTask`: the updated task plus any warnings produced by
/// a gate that was *not* enforced (§4.1 — an unenforced dependency/WIP
/// violation is surfaced as a warning rather than blocking the write).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateResult {
    #[serde(flatten)]
    pub task: Task,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub assigned_agent: Option<String>,
    pub status: Option<TaskStatus>,
    pub labels: Vec<String>,
    pub limit: Option<u32>,
}

/// A kanban board projection: the five non-cancelled buckets, each sorted
/// by priority descending then `created_at` ascending.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub backlog: Vec<Task>,
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub review: Vec<Task>,
    pub done: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub task_id: String,
    pub agent_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub id: String,
    pub task_id: String,
    pub description: String,
    pub blocking_task_id: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub agent_id: String,
}

/// A `depends_on` edge: `task_id` depends on `depends_on_task_id`. Unique
/// per pair; the set of edges must remain a DAG (see `dependency`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependency {
    pub id: String,
    pub task_id: String,
    pub depends_on_task_id: String,
    pub created_at: DateTime<Utc>,
}

/// An agent's declaration of the files it plans to touch, the boundaries
/// it promises not to touch, and its acceptance criteria. Immutable once
/// created — there is no update operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub id: String,
    pub task_id: String,
    pub agent_id: String,
    pub files: Vec<String>,
    pub boundaries: Option<String>,
    pub acceptance_criteria: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewIntent {
    pub task_id: String,
    pub agent_id: String,
    pub files: Vec<String>,
    pub boundaries: Option<String>,
    pub acceptance_criteria: String,
}

/// A single `(agent_id, file_path)` claim row as stored. Callers see the
/// aggregated `AgentClaim` view (`ClaimStore::list_active`,
/// `ClaimStore::get_for_agent`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRow {
    pub agent_id: String,
    pub file_path: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated view of one agent's held claims, as surfaced to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentClaim {
    pub agent_id: String,
    pub files: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of `ClaimStore::create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ClaimOutcome {
    Ok(AgentClaim),
    Conflict { conflicts_with: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: String,
    pub task_id: String,
    pub agent_id: String,
    pub command: String,
    pub output: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewEvidence {
    pub task_id: String,
    pub agent_id: String,
    pub command: String,
    pub output: String,
}

/// Closed vocabulary of changelog entry kinds (§3). File-scoped kinds use
/// the real file path for `ChangelogEntry::file_path`; lifecycle kinds use
/// the synthetic `task:<taskId>` path (see `changelog::synthetic_path`).
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Create,
    Modify,
    Delete,
    TaskCreated,
    TaskStatusChange,
    TaskAssigned,
    TaskPriorityChange,
    TaskCompleted,
    BlockerAdded,
    BlockerResolved,
    DependencyAdded,
    DependencyRemoved,
    CommentAdded,
}

impl ChangeType {
    /// File-mutation kinds count toward an agent's "modified" set in
    /// compliance checks (§4.6); lifecycle kinds do not.
    pub fn is_file_change(self) -> bool {
        matches!(self, ChangeType::Create | ChangeType::Modify | ChangeType::Delete)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: String,
    pub task_id: Option<String>,
    pub agent_id: String,
    pub file_path: String,
    pub change_type: ChangeType,
    pub summary: String,
    pub diff_snippet: Option<String>,
    pub commit_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewChangelogEntry {
    pub task_id: Option<String>,
    pub agent_id: String,
    pub file_path: String,
    pub change_type: ChangeType,
    pub summary: String,
    pub diff_snippet: Option<String>,
    pub commit_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogFilter {
    pub file_path: Option<String>,
    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub change_type: Option<ChangeType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub query: Option<String>,
    pub limit: Option<u32>,
}

/// Agent registry row. `status` is a derivation, not stored state — see
/// `agents::derive_status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub agent_id: String,
    pub capabilities: Vec<String>,
    pub metadata: Option<serde_json::Value>,
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
    pub status: AgentStatus,
}

#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Idle,
    Offline,
}

/// Upper bound on the number of non-cancelled tasks in a given status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WipLimit {
    pub status: TaskStatus,
    pub max_tasks: u32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_columns_exclude_cancelled() {
        assert!(!TaskStatus::BOARD_COLUMNS.contains(&TaskStatus::Cancelled));
        assert_eq!(TaskStatus::BOARD_COLUMNS.len(), 5);
    }

    #[test]
    fn change_type_file_vs_lifecycle() {
        assert!(ChangeType::Modify.is_file_change());
        assert!(ChangeType::Create.is_file_change());
        assert!(!ChangeType::TaskStatusChange.is_file_change());
        assert!(!ChangeType::CommentAdded.is_file_change());
    }

    #[test]
    fn default_update_options_enforce_everything() {
        let opts = UpdateOptions::default();
        assert!(opts.enforce_dependencies);
        assert!(opts.enforce_wip_limits);
    }
}

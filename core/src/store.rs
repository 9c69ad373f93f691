use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Agent, AgentClaim, Board, ChangelogEntry, ChangelogFilter, ClaimOutcome, Evidence, NewChangelogEntry,
    NewEvidence, NewIntent, NewTask, Intent, Task, TaskDependency, TaskFilter, TaskPatch, WipLimit,
};

/// Persistence boundary for tasks and the kanban board. Implementations
/// must be thread-safe and support concurrent access (mirrors the
/// teacher's `TaskRepository`).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a new task.
    ///
    /// # Errors
    /// Returns `ScrumError::Validation` if the task data is invalid.
    async fn create(&self, task: NewTask) -> Result<Task>;

    /// Apply a partial update. `None` fields are left unchanged.
    ///
    /// # Errors
    /// Returns `ScrumError::NotFound` if the task doesn't exist.
    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task>;

    async fn get(&self, id: &str) -> Result<Option<Task>>;

    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>>;

    /// List all tasks, ignoring filters, for board/dependency/WIP
    /// computations that need the full population.
    async fn list_all(&self) -> Result<Vec<Task>>;

    /// Project the five non-cancelled buckets into a `Board` (§4.1).
    async fn board(&self) -> Result<Board> {
        let tasks = self.list_all().await?;
        Ok(crate::board::project(tasks))
    }

    async fn delete(&self, id: &str) -> Result<()>;

    async fn add_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<TaskDependency>;

    async fn remove_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<()>;

    async fn list_dependencies(&self) -> Result<Vec<TaskDependency>>;

    async fn get_wip_limit(&self, status: crate::models::TaskStatus) -> Result<Option<WipLimit>>;

    async fn set_wip_limit(&self, status: crate::models::TaskStatus, max_tasks: u32) -> Result<WipLimit>;

    async fn list_wip_limits(&self) -> Result<Vec<WipLimit>>;

    async fn add_comment(&self, task_id: &str, agent_id: &str, content: &str) -> Result<crate::models::Comment>;

    async fn list_comments(&self, task_id: &str) -> Result<Vec<crate::models::Comment>>;

    async fn add_blocker(
        &self,
        task_id: &str,
        agent_id: &str,
        description: &str,
        blocking_task_id: Option<&str>,
    ) -> Result<crate::models::Blocker>;

    async fn resolve_blocker(&self, blocker_id: &str) -> Result<crate::models::Blocker>;

    async fn list_blockers(&self, task_id: &str) -> Result<Vec<crate::models::Blocker>>;

    async fn health_check(&self) -> Result<()>;
}

/// Persistence boundary for intents, which are immutable once posted
/// (§4.2) — no `update`.
#[async_trait]
pub trait IntentStore: Send + Sync {
    async fn create(&self, intent: NewIntent) -> Result<Intent>;

    async fn list_for_task(&self, task_id: &str) -> Result<Vec<Intent>>;

    async fn list_for_agent(&self, agent_id: &str) -> Result<Vec<Intent>>;

    /// All files declared across every intent ever posted for `task_id`,
    /// used by `compliance` to compute the undeclared-files gap.
    async fn declared_files(&self, task_id: &str) -> Result<Vec<String>> {
        Ok(self
            .list_for_task(task_id)
            .await?
            .into_iter()
            .flat_map(|i| i.files)
            .collect())
    }
}

/// Persistence boundary for TTL-scoped file claims (§4.3). Claims do not
/// expire in storage; every read filters against `now` so `release` and
/// expiry checks never race a background sweep.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Attempt to claim `files` for `agent_id` until `expires_at`.
    /// Returns `ClaimOutcome::Conflict` (not an `Err`) when another agent
    /// already holds one of the files with a non-expired claim (§4.3).
    async fn create(
        &self,
        agent_id: &str,
        files: Vec<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome>;

    async fn release(&self, agent_id: &str, files: Option<Vec<String>>) -> Result<()>;

    /// Atomically set `expires_at = new_expiry` on the rows selected by
    /// `(agent_id, files)` (all of the agent's rows if `files` is `None`).
    /// Returns the number of rows extended (§4.3 `extendClaims`).
    async fn extend(&self, agent_id: &str, files: Option<Vec<String>>, new_expiry: DateTime<Utc>) -> Result<usize>;

    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<AgentClaim>>;

    async fn get_for_agent(&self, agent_id: &str, now: DateTime<Utc>) -> Result<Option<AgentClaim>>;
}

#[async_trait]
pub trait EvidenceStore: Send + Sync {
    async fn create(&self, evidence: NewEvidence) -> Result<Evidence>;

    async fn list_for_task(&self, task_id: &str) -> Result<Vec<Evidence>>;

    async fn list_for_agent(&self, task_id: &str, agent_id: &str) -> Result<Vec<Evidence>>;

    /// Newest-first evidence across every task, for `listAllEvidence` (§4.4).
    async fn list_all(&self, limit: u32) -> Result<Vec<Evidence>>;

    /// Distinct task ids `agent_id` has attached evidence to, used by the
    /// release precondition (§4.3) and `hasEvidenceForTask` (§4.4).
    async fn task_ids_for_agent(&self, agent_id: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ChangelogStore: Send + Sync {
    async fn append(&self, entry: NewChangelogEntry) -> Result<ChangelogEntry>;

    async fn query(&self, filter: ChangelogFilter) -> Result<Vec<ChangelogEntry>>;

    /// File-mutation entries (`create`/`modify`/`delete`) for `task_id`
    /// attributed to `agent_id`, used by `compliance` to compute the
    /// modified-files set.
    async fn modified_files(&self, task_id: &str, agent_id: &str) -> Result<Vec<String>> {
        let entries = self
            .query(ChangelogFilter {
                task_id: Some(task_id.to_string()),
                agent_id: Some(agent_id.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.change_type.is_file_change())
            .map(|e| e.file_path)
            .collect())
    }
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn register(&self, agent_id: &str, capabilities: Vec<String>, metadata: Option<serde_json::Value>) -> Result<Agent>;

    async fn heartbeat(&self, agent_id: &str, now: DateTime<Utc>) -> Result<Agent>;

    async fn get(&self, agent_id: &str) -> Result<Option<Agent>>;

    async fn list(&self) -> Result<Vec<Agent>>;
}

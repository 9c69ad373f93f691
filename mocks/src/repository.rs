//! In-memory implementations of every `scrum_core::store` trait.
//!
//! Mirrors the teacher's `MockTaskRepository`: thread-safe concurrent
//! access, error injection for failure testing, and call-history
//! tracking for verification, but one struct per entity family instead
//! of one repository for a single `Task` type.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use scrum_core::error::{Result, ScrumError};
use scrum_core::ids;
use scrum_core::models::{
    Agent, AgentClaim, Blocker, ChangelogEntry, ChangelogFilter, ClaimOutcome, ClaimRow, Comment,
    Evidence, Intent, NewChangelogEntry, NewEvidence, NewIntent, NewTask, Task, TaskDependency,
    TaskFilter, TaskPatch, TaskStatus, WipLimit,
};
use scrum_core::store::{AgentStore, ChangelogStore, ClaimStore, EvidenceStore, IntentStore, TaskStore};

use crate::support::TestSupport;

/// In-memory `TaskStore`, including dependencies, WIP limits, comments,
/// and blockers — everything `TaskStore` owns (§3).
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
    dependencies: Mutex<Vec<TaskDependency>>,
    wip_limits: Mutex<HashMap<TaskStatus, WipLimit>>,
    comments: Mutex<HashMap<String, Vec<Comment>>>,
    blockers: Mutex<HashMap<String, Vec<Blocker>>>,
    support: TestSupport,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let store = Self::new();
        let mut map = store.tasks.lock();
        for task in tasks {
            map.insert(task.id.clone(), task);
        }
        drop(map);
        store
    }

    pub fn inject_error(&self, error: ScrumError) {
        self.support.inject_error(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.support.call_history()
    }

    pub fn assert_called(&self, method: &str) {
        self.support.assert_called(method);
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: NewTask) -> Result<Task> {
        self.support.record_call_with_params("create", &task.title);
        self.support.check_error_injection()?;

        let id = ids::generate("task");
        let now = Utc::now();
        let new_task = Task {
            id: id.clone(),
            title: task.title,
            description: task.description,
            status: TaskStatus::Backlog,
            priority: task.priority,
            assigned_agent: task.assigned_agent,
            due_date: task.due_date,
            labels: task.labels,
            story_points: task.story_points,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        };
        self.tasks.lock().insert(id, new_task.clone());
        Ok(new_task)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        self.support.record_call_with_params("update", id);
        self.support.check_error_injection()?;

        let mut tasks = self.tasks.lock();
        let task = tasks.get_mut(id).ok_or_else(|| ScrumError::not_found("task", id))?;

        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(status) = patch.status {
            if status == TaskStatus::InProgress && task.started_at.is_none() {
                task.started_at = Some(Utc::now());
            }
            if status == TaskStatus::Done && task.completed_at.is_none() {
                task.completed_at = Some(Utc::now());
            }
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(assigned_agent) = patch.assigned_agent {
            task.assigned_agent = assigned_agent;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(labels) = patch.labels {
            task.labels = labels;
        }
        if let Some(story_points) = patch.story_points {
            task.story_points = story_points;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>> {
        self.support.record_call_with_params("get", id);
        self.support.check_error_injection()?;
        Ok(self.tasks.lock().get(id).cloned())
    }

    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        self.support.record_call("list");
        self.support.check_error_injection()?;

        let tasks = self.tasks.lock();
        let mut result: Vec<Task> = tasks
            .values()
            .filter(|t| {
                if let Some(ref agent) = filter.assigned_agent {
                    if t.assigned_agent.as_deref() != Some(agent.as_str()) {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if t.status != status {
                        return false;
                    }
                }
                if !filter.labels.is_empty() && !filter.labels.iter().any(|l| t.labels.contains(l)) {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            result.truncate(limit as usize);
        }
        Ok(result)
    }

    async fn list_all(&self) -> Result<Vec<Task>> {
        self.support.record_call("list_all");
        self.support.check_error_injection()?;
        Ok(self.tasks.lock().values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.support.record_call_with_params("delete", id);
        self.support.check_error_injection()?;
        let removed = self.tasks.lock().remove(id).map(|_| ());
        if removed.is_none() {
            return Err(ScrumError::not_found("task", id));
        }
        // blockers pointing at the deleted task have no FK/cascade, so
        // clear the dangling reference (§3).
        for blockers in self.blockers.lock().values_mut() {
            for blocker in blockers.iter_mut() {
                if blocker.blocking_task_id.as_deref() == Some(id) {
                    blocker.blocking_task_id = None;
                }
            }
        }
        Ok(())
    }

    async fn add_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<TaskDependency> {
        self.support.record_call_with_params("add_dependency", &format!("{task_id}->{depends_on_task_id}"));
        self.support.check_error_injection()?;

        let edge = TaskDependency {
            id: ids::generate("dep"),
            task_id: task_id.to_string(),
            depends_on_task_id: depends_on_task_id.to_string(),
            created_at: Utc::now(),
        };
        self.dependencies.lock().push(edge.clone());
        Ok(edge)
    }

    async fn remove_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<()> {
        self.support.record_call_with_params("remove_dependency", &format!("{task_id}->{depends_on_task_id}"));
        self.support.check_error_injection()?;

        self.dependencies
            .lock()
            .retain(|e| !(e.task_id == task_id && e.depends_on_task_id == depends_on_task_id));
        Ok(())
    }

    async fn list_dependencies(&self) -> Result<Vec<TaskDependency>> {
        self.support.record_call("list_dependencies");
        self.support.check_error_injection()?;
        Ok(self.dependencies.lock().clone())
    }

    async fn get_wip_limit(&self, status: TaskStatus) -> Result<Option<WipLimit>> {
        self.support.record_call("get_wip_limit");
        self.support.check_error_injection()?;
        Ok(self.wip_limits.lock().get(&status).cloned())
    }

    async fn set_wip_limit(&self, status: TaskStatus, max_tasks: u32) -> Result<WipLimit> {
        self.support.record_call("set_wip_limit");
        self.support.check_error_injection()?;

        let limit = WipLimit {
            status,
            max_tasks,
            updated_at: Utc::now(),
        };
        self.wip_limits.lock().insert(status, limit.clone());
        Ok(limit)
    }

    async fn list_wip_limits(&self) -> Result<Vec<WipLimit>> {
        self.support.record_call("list_wip_limits");
        self.support.check_error_injection()?;
        Ok(self.wip_limits.lock().values().cloned().collect())
    }

    async fn add_comment(&self, task_id: &str, agent_id: &str, content: &str) -> Result<Comment> {
        self.support.record_call_with_params("add_comment", task_id);
        self.support.check_error_injection()?;

        let comment = Comment {
            id: ids::generate("comment"),
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };
        self.comments.lock().entry(task_id.to_string()).or_default().push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
        self.support.record_call("list_comments");
        self.support.check_error_injection()?;
        Ok(self.comments.lock().get(task_id).cloned().unwrap_or_default())
    }

    async fn add_blocker(
        &self,
        task_id: &str,
        agent_id: &str,
        description: &str,
        blocking_task_id: Option<&str>,
    ) -> Result<Blocker> {
        self.support.record_call_with_params("add_blocker", task_id);
        self.support.check_error_injection()?;

        let blocker = Blocker {
            id: ids::generate("blocker"),
            task_id: task_id.to_string(),
            description: description.to_string(),
            blocking_task_id: blocking_task_id.map(|s| s.to_string()),
            resolved_at: None,
            created_at: Utc::now(),
            agent_id: agent_id.to_string(),
        };
        self.blockers.lock().entry(task_id.to_string()).or_default().push(blocker.clone());
        Ok(blocker)
    }

    async fn resolve_blocker(&self, blocker_id: &str) -> Result<Blocker> {
        self.support.record_call_with_params("resolve_blocker", blocker_id);
        self.support.check_error_injection()?;

        let mut blockers = self.blockers.lock();
        for list in blockers.values_mut() {
            if let Some(blocker) = list.iter_mut().find(|b| b.id == blocker_id) {
                if blocker.resolved_at.is_none() {
                    blocker.resolved_at = Some(Utc::now());
                }
                return Ok(blocker.clone());
            }
        }
        Err(ScrumError::not_found("blocker", blocker_id))
    }

    async fn list_blockers(&self, task_id: &str) -> Result<Vec<Blocker>> {
        self.support.record_call("list_blockers");
        self.support.check_error_injection()?;
        Ok(self.blockers.lock().get(task_id).cloned().unwrap_or_default())
    }

    async fn health_check(&self) -> Result<()> {
        self.support.record_call("health_check");
        self.support.check_error_injection()
    }
}

/// In-memory `IntentStore`. Intents are append-only (§4.2).
#[derive(Default)]
pub struct InMemoryIntentStore {
    intents: Mutex<Vec<Intent>>,
    support: TestSupport,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: ScrumError) {
        self.support.inject_error(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.support.call_history()
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn create(&self, intent: NewIntent) -> Result<Intent> {
        self.support.record_call_with_params("create", &intent.task_id);
        self.support.check_error_injection()?;

        let intent = Intent {
            id: ids::generate("intent"),
            task_id: intent.task_id,
            agent_id: intent.agent_id,
            files: intent.files,
            boundaries: intent.boundaries,
            acceptance_criteria: intent.acceptance_criteria,
            created_at: Utc::now(),
        };
        self.intents.lock().push(intent.clone());
        Ok(intent)
    }

    async fn list_for_task(&self, task_id: &str) -> Result<Vec<Intent>> {
        self.support.record_call("list_for_task");
        self.support.check_error_injection()?;
        Ok(self.intents.lock().iter().filter(|i| i.task_id == task_id).cloned().collect())
    }

    async fn list_for_agent(&self, agent_id: &str) -> Result<Vec<Intent>> {
        self.support.record_call("list_for_agent");
        self.support.check_error_injection()?;
        Ok(self.intents.lock().iter().filter(|i| i.agent_id == agent_id).cloned().collect())
    }
}

/// In-memory `ClaimStore`. Stored as individual `(agent_id, file_path)`
/// rows, matching the SQLite schema's grain, not the aggregated
/// `AgentClaim` view callers see (§4.3).
#[derive(Default)]
pub struct InMemoryClaimStore {
    rows: Mutex<Vec<ClaimRow>>,
    support: TestSupport,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: ScrumError) {
        self.support.inject_error(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.support.call_history()
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn create(
        &self,
        agent_id: &str,
        files: Vec<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        self.support.record_call_with_params("create", agent_id);
        self.support.check_error_injection()?;

        let mut rows = self.rows.lock();
        let mut conflicts: Vec<String> = rows
            .iter()
            .filter(|r| r.expires_at > now && r.agent_id != agent_id && files.contains(&r.file_path))
            .map(|r| r.agent_id.clone())
            .collect();
        if !conflicts.is_empty() {
            conflicts.sort();
            conflicts.dedup();
            return Ok(ClaimOutcome::Conflict {
                conflicts_with: conflicts,
            });
        }

        for file in &files {
            rows.retain(|r| !(r.agent_id == agent_id && r.file_path == *file));
            rows.push(ClaimRow {
                agent_id: agent_id.to_string(),
                file_path: file.clone(),
                expires_at,
                created_at: now,
            });
        }

        Ok(ClaimOutcome::Ok(AgentClaim {
            agent_id: agent_id.to_string(),
            files,
            expires_at,
            created_at: now,
        }))
    }

    async fn release(&self, agent_id: &str, files: Option<Vec<String>>) -> Result<()> {
        self.support.record_call_with_params("release", agent_id);
        self.support.check_error_injection()?;

        let mut rows = self.rows.lock();
        match files {
            Some(files) => rows.retain(|r| !(r.agent_id == agent_id && files.contains(&r.file_path))),
            None => rows.retain(|r| r.agent_id != agent_id),
        }
        Ok(())
    }

    async fn extend(&self, agent_id: &str, files: Option<Vec<String>>, new_expiry: DateTime<Utc>) -> Result<usize> {
        self.support.record_call_with_params("extend", agent_id);
        self.support.check_error_injection()?;

        let mut rows = self.rows.lock();
        let mut count = 0;
        for row in rows.iter_mut() {
            if row.agent_id != agent_id {
                continue;
            }
            if let Some(files) = &files {
                if !files.contains(&row.file_path) {
                    continue;
                }
            }
            row.expires_at = new_expiry;
            count += 1;
        }
        Ok(count)
    }

    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<AgentClaim>> {
        self.support.record_call("list_active");
        self.support.check_error_injection()?;
        Ok(aggregate(self.rows.lock().iter().filter(|r| r.expires_at > now)))
    }

    async fn get_for_agent(&self, agent_id: &str, now: DateTime<Utc>) -> Result<Option<AgentClaim>> {
        self.support.record_call_with_params("get_for_agent", agent_id);
        self.support.check_error_injection()?;
        Ok(aggregate(self.rows.lock().iter().filter(|r| r.agent_id == agent_id && r.expires_at > now))
            .into_iter()
            .next())
    }
}

/// Collapse `ClaimRow`s into one `AgentClaim` per agent, taking the
/// latest `expires_at`/`created_at` across that agent's rows.
fn aggregate<'a>(rows: impl Iterator<Item = &'a ClaimRow>) -> Vec<AgentClaim> {
    let mut by_agent: HashMap<String, AgentClaim> = HashMap::new();
    for row in rows {
        let entry = by_agent.entry(row.agent_id.clone()).or_insert_with(|| AgentClaim {
            agent_id: row.agent_id.clone(),
            files: Vec::new(),
            expires_at: row.expires_at,
            created_at: row.created_at,
        });
        entry.files.push(row.file_path.clone());
        entry.expires_at = entry.expires_at.max(row.expires_at);
    }
    by_agent.into_values().collect()
}

/// In-memory `EvidenceStore`.
#[derive(Default)]
pub struct InMemoryEvidenceStore {
    evidence: Mutex<Vec<Evidence>>,
    support: TestSupport,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: ScrumError) {
        self.support.inject_error(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.support.call_history()
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn create(&self, evidence: NewEvidence) -> Result<Evidence> {
        self.support.record_call_with_params("create", &evidence.task_id);
        self.support.check_error_injection()?;

        let evidence = Evidence {
            id: ids::generate("evidence"),
            task_id: evidence.task_id,
            agent_id: evidence.agent_id,
            command: evidence.command,
            output: evidence.output,
            created_at: Utc::now(),
        };
        self.evidence.lock().push(evidence.clone());
        Ok(evidence)
    }

    async fn list_for_task(&self, task_id: &str) -> Result<Vec<Evidence>> {
        self.support.record_call("list_for_task");
        self.support.check_error_injection()?;
        Ok(self.evidence.lock().iter().filter(|e| e.task_id == task_id).cloned().collect())
    }

    async fn list_for_agent(&self, task_id: &str, agent_id: &str) -> Result<Vec<Evidence>> {
        self.support.record_call("list_for_agent");
        self.support.check_error_injection()?;
        Ok(self
            .evidence
            .lock()
            .iter()
            .filter(|e| e.task_id == task_id && e.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<Evidence>> {
        self.support.record_call("list_all");
        self.support.check_error_injection()?;
        let mut all = self.evidence.lock().clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn task_ids_for_agent(&self, agent_id: &str) -> Result<Vec<String>> {
        self.support.record_call_with_params("task_ids_for_agent", agent_id);
        self.support.check_error_injection()?;
        let mut ids: Vec<String> = self
            .evidence
            .lock()
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .map(|e| e.task_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

/// In-memory `ChangelogStore`. Append-only (§3).
#[derive(Default)]
pub struct InMemoryChangelogStore {
    entries: Mutex<Vec<ChangelogEntry>>,
    support: TestSupport,
}

impl InMemoryChangelogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_error(&self, error: ScrumError) {
        self.support.inject_error(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.support.call_history()
    }
}

#[async_trait]
impl ChangelogStore for InMemoryChangelogStore {
    async fn append(&self, entry: NewChangelogEntry) -> Result<ChangelogEntry> {
        self.support.record_call("append");
        self.support.check_error_injection()?;

        let entry = ChangelogEntry {
            id: ids::generate("change"),
            task_id: entry.task_id,
            agent_id: entry.agent_id,
            file_path: entry.file_path,
            change_type: entry.change_type,
            summary: entry.summary,
            diff_snippet: entry.diff_snippet,
            commit_hash: entry.commit_hash,
            created_at: Utc::now(),
        };
        self.entries.lock().push(entry.clone());
        Ok(entry)
    }

    async fn query(&self, filter: ChangelogFilter) -> Result<Vec<ChangelogEntry>> {
        self.support.record_call("query");
        self.support.check_error_injection()?;

        let entries = self.entries.lock();
        let mut result: Vec<ChangelogEntry> = entries
            .iter()
            .filter(|e| {
                if let Some(ref file_path) = filter.file_path {
                    if !e.file_path.contains(file_path.as_str()) {
                        return false;
                    }
                }
                if let Some(ref agent_id) = filter.agent_id {
                    if &e.agent_id != agent_id {
                        return false;
                    }
                }
                if let Some(ref task_id) = filter.task_id {
                    if e.task_id.as_deref() != Some(task_id.as_str()) {
                        return false;
                    }
                }
                if let Some(change_type) = filter.change_type {
                    if e.change_type != change_type {
                        return false;
                    }
                }
                if let Some(since) = filter.since {
                    if e.created_at < since {
                        return false;
                    }
                }
                if let Some(until) = filter.until {
                    if e.created_at > until {
                        return false;
                    }
                }
                if let Some(ref query) = filter.query {
                    if !e.summary.contains(query.as_str()) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            result.truncate(limit as usize);
        }
        Ok(result)
    }
}

/// In-memory `AgentStore`. Status is derived the same way as the SQLite
/// backend: offline past the heartbeat threshold, else active/idle by
/// whether the agent has an `in_progress` task (§3).
pub struct InMemoryAgentStore {
    agents: Mutex<HashMap<String, (Vec<String>, Option<serde_json::Value>, DateTime<Utc>, DateTime<Utc>)>>,
    tasks: Arc<InMemoryTaskStore>,
    support: TestSupport,
}

const OFFLINE_AFTER_SECS: i64 = 300;

impl InMemoryAgentStore {
    pub fn new(tasks: Arc<InMemoryTaskStore>) -> Self {
        Self {
            agents: Mutex::new(HashMap::new()),
            tasks,
            support: TestSupport::new(),
        }
    }

    pub fn inject_error(&self, error: ScrumError) {
        self.support.inject_error(error);
    }

    pub fn call_history(&self) -> Vec<String> {
        self.support.call_history()
    }

    async fn derive_status(&self, agent_id: &str, last_heartbeat: DateTime<Utc>) -> scrum_core::models::AgentStatus {
        use scrum_core::models::AgentStatus;
        let age = Utc::now().signed_duration_since(last_heartbeat).num_seconds();
        if age > OFFLINE_AFTER_SECS {
            return AgentStatus::Offline;
        }
        let has_in_progress = self
            .tasks
            .list_all()
            .await
            .unwrap_or_default()
            .iter()
            .any(|t| t.assigned_agent.as_deref() == Some(agent_id) && t.status == TaskStatus::InProgress);
        if has_in_progress {
            AgentStatus::Active
        } else {
            AgentStatus::Idle
        }
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn register(&self, agent_id: &str, capabilities: Vec<String>, metadata: Option<serde_json::Value>) -> Result<Agent> {
        self.support.record_call_with_params("register", agent_id);
        self.support.check_error_injection()?;

        let now = Utc::now();
        let mut agents = self.agents.lock();
        let registered_at = agents.get(agent_id).map(|(_, _, _, r)| *r).unwrap_or(now);
        agents.insert(agent_id.to_string(), (capabilities.clone(), metadata.clone(), now, registered_at));
        drop(agents);

        let status = self.derive_status(agent_id, now).await;
        Ok(Agent {
            agent_id: agent_id.to_string(),
            capabilities,
            metadata,
            last_heartbeat: now,
            registered_at,
            status,
        })
    }

    async fn heartbeat(&self, agent_id: &str, now: DateTime<Utc>) -> Result<Agent> {
        self.support.record_call_with_params("heartbeat", agent_id);
        self.support.check_error_injection()?;

        let mut agents = self.agents.lock();
        let entry = agents
            .get_mut(agent_id)
            .ok_or_else(|| ScrumError::not_found("agent", agent_id))?;
        entry.2 = now;
        let (capabilities, metadata, last_heartbeat, registered_at) = entry.clone();
        drop(agents);

        let status = self.derive_status(agent_id, last_heartbeat).await;
        Ok(Agent {
            agent_id: agent_id.to_string(),
            capabilities,
            metadata,
            last_heartbeat,
            registered_at,
            status,
        })
    }

    async fn get(&self, agent_id: &str) -> Result<Option<Agent>> {
        self.support.record_call_with_params("get", agent_id);
        self.support.check_error_injection()?;

        let agents = self.agents.lock();
        let Some((capabilities, metadata, last_heartbeat, registered_at)) = agents.get(agent_id).cloned() else {
            return Ok(None);
        };
        drop(agents);

        let status = self.derive_status(agent_id, last_heartbeat).await;
        Ok(Some(Agent {
            agent_id: agent_id.to_string(),
            capabilities,
            metadata,
            last_heartbeat,
            registered_at,
            status,
        }))
    }

    async fn list(&self) -> Result<Vec<Agent>> {
        self.support.record_call("list");
        self.support.check_error_injection()?;

        let snapshot: Vec<(String, Vec<String>, Option<serde_json::Value>, DateTime<Utc>, DateTime<Utc>)> = self
            .agents
            .lock()
            .iter()
            .map(|(id, (caps, meta, hb, reg))| (id.clone(), caps.clone(), meta.clone(), *hb, *reg))
            .collect();

        let mut result = Vec::with_capacity(snapshot.len());
        for (agent_id, capabilities, metadata, last_heartbeat, registered_at) in snapshot {
            let status = self.derive_status(&agent_id, last_heartbeat).await;
            result.push(Agent {
                agent_id,
                capabilities,
                metadata,
                last_heartbeat,
                registered_at,
                status,
            });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_task_starts_in_backlog() {
        let store = InMemoryTaskStore::new();
        let task = store
            .create(NewTask {
                title: "Design the API".to_string(),
                description: None,
                priority: scrum_core::models::Priority::Medium,
                assigned_agent: None,
                due_date: None,
                labels: Default::default(),
                story_points: None,
            })
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Backlog);
        store.assert_called("create");
    }

    #[tokio::test]
    async fn error_injection_short_circuits_next_call() {
        let store = InMemoryTaskStore::new();
        store.inject_error(ScrumError::not_found("task", "nope"));
        let result = store.get("nope").await;
        assert!(result.is_err());
        let result = store.get("nope").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn claim_conflict_detected_for_overlapping_file() {
        let store = InMemoryClaimStore::new();
        let now = Utc::now();
        let expires = now + chrono::Duration::seconds(300);
        store.create("agent-a", vec!["src/a.rs".to_string()], expires, now).await.unwrap();
        let outcome = store.create("agent-b", vec!["src/a.rs".to_string()], expires, now).await.unwrap();
        assert!(matches!(outcome, ClaimOutcome::Conflict { .. }));
    }

    #[tokio::test]
    async fn agent_is_active_only_while_in_progress_task_assigned() {
        let tasks = Arc::new(InMemoryTaskStore::new());
        let agents = InMemoryAgentStore::new(tasks.clone());
        agents.register("agent-a", vec![], None).await.unwrap();
        let agent = agents.get("agent-a").await.unwrap().unwrap();
        assert_eq!(agent.status, scrum_core::models::AgentStatus::Idle);

        let task = tasks
            .create(NewTask {
                title: "Do the thing".to_string(),
                description: None,
                priority: scrum_core::models::Priority::Medium,
                assigned_agent: Some("agent-a".to_string()),
                due_date: None,
                labels: Default::default(),
                story_points: None,
            })
            .await
            .unwrap();
        tasks
            .update(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let agent = agents.get("agent-a").await.unwrap().unwrap();
        assert_eq!(agent.status, scrum_core::models::AgentStatus::Active);
    }

    #[tokio::test]
    async fn deleting_a_blocking_task_clears_the_dangling_reference() {
        let store = InMemoryTaskStore::new();
        let blocked = store
            .create(NewTask {
                title: "blocked".to_string(),
                description: None,
                priority: scrum_core::models::Priority::Medium,
                assigned_agent: None,
                due_date: None,
                labels: Default::default(),
                story_points: None,
            })
            .await
            .unwrap();
        let blocking = store
            .create(NewTask {
                title: "blocking".to_string(),
                description: None,
                priority: scrum_core::models::Priority::Medium,
                assigned_agent: None,
                due_date: None,
                labels: Default::default(),
                story_points: None,
            })
            .await
            .unwrap();

        let blocker = store
            .add_blocker(&blocked.id, "agent-a", "waiting on the other task", Some(&blocking.id))
            .await
            .unwrap();
        assert_eq!(blocker.blocking_task_id.as_deref(), Some(blocking.id.as_str()));

        store.delete(&blocking.id).await.unwrap();

        let blockers = store.list_blockers(&blocked.id).await.unwrap();
        assert_eq!(blockers.len(), 1);
        assert_eq!(blockers[0].blocking_task_id, None);
    }
}

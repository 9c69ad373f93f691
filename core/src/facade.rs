//! The composing facade: the single entry point that wires task storage,
//! intents, claims, evidence, the changelog, compliance scoring, the
//! dependency graph and WIP limits, and the event bus together behind the
//! intent -> claim -> evidence -> release discipline (§4.9, §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::boundary::Boundaries;
use crate::clock::Clock;
use crate::compliance::{self, ComplianceInputs, ComplianceReport};
use crate::dependency;
use crate::error::{PreconditionKind, Result, ScrumError};
use crate::events::{Event, EventBus};
use crate::ids;
use crate::models::{
    Agent, AgentClaim, Blocker, Board, ChangelogEntry, ChangelogFilter, ClaimOutcome, Comment, Evidence, Intent,
    NewChangelogEntry, NewEvidence, NewIntent, NewTask, Task, TaskDependency, TaskFilter, TaskPatch, TaskStatus,
    TaskUpdateResult, UpdateOptions, WipLimit,
};
use crate::store::{AgentStore, ChangelogStore, ClaimStore, EvidenceStore, IntentStore, TaskStore};
use crate::validation::Validator;

/// Default wall-clock budget for a single facade call (§5); callers can
/// override via [`Facade::with_deadline`].
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Default bound on `Evidence::output` (§3, §6 `output_clip_bytes`).
pub const DEFAULT_OUTPUT_CLIP_BYTES: usize = 64 * 1024;

/// Everything the facade needs, composed behind trait objects so the
/// concrete storage backend (SQLite today, mocks in tests) is swappable
/// without touching this module.
pub struct Facade {
    pub tasks: Arc<dyn TaskStore>,
    pub intents: Arc<dyn IntentStore>,
    pub claims: Arc<dyn ClaimStore>,
    pub evidence: Arc<dyn EvidenceStore>,
    pub changelog: Arc<dyn ChangelogStore>,
    pub agents: Arc<dyn AgentStore>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<EventBus>,
    deadline: Duration,
    output_clip_bytes: usize,
}

impl Facade {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        intents: Arc<dyn IntentStore>,
        claims: Arc<dyn ClaimStore>,
        evidence: Arc<dyn EvidenceStore>,
        changelog: Arc<dyn ChangelogStore>,
        agents: Arc<dyn AgentStore>,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            tasks,
            intents,
            claims,
            evidence,
            changelog,
            agents,
            clock,
            events,
            deadline: DEFAULT_DEADLINE,
            output_clip_bytes: DEFAULT_OUTPUT_CLIP_BYTES,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_output_clip_bytes(mut self, clip_bytes: usize) -> Self {
        self.output_clip_bytes = clip_bytes;
        self
    }

    async fn bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(ScrumError::DeadlineExceeded),
        }
    }

    pub async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        self.bounded(async {
            Validator::validate_title(&new_task.title)?;
            let task = self.tasks.create(new_task).await?;
            self.events.publish(Event::TaskCreated {
                task_id: task.id.clone(),
            });
            self.changelog
                .append(NewChangelogEntry {
                    task_id: Some(task.id.clone()),
                    agent_id: "system".to_string(),
                    file_path: synthetic_path(&task.id),
                    change_type: crate::models::ChangeType::TaskCreated,
                    summary: format!("task created: {}", task.title),
                    diff_snippet: None,
                    commit_hash: None,
                })
                .await?;
            Ok(task)
        })
        .await
    }

    pub fn get_task<'a>(&'a self, id: &'a str) -> impl std::future::Future<Output = Result<Option<Task>>> + 'a {
        self.tasks.get(id)
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        self.bounded(self.tasks.list(filter)).await
    }

    /// Project the five non-cancelled buckets, optionally filtered by
    /// assigned agent and/or labels (§4.1 `getBoard`).
    pub async fn board(&self, assigned_agent: Option<&str>, labels: &[String]) -> Result<Board> {
        self.bounded(async {
            if assigned_agent.is_none() && labels.is_empty() {
                return self.tasks.board().await;
            }
            let mut tasks = self.tasks.list_all().await?;
            if let Some(agent) = assigned_agent {
                tasks.retain(|t| t.assigned_agent.as_deref() == Some(agent));
            }
            if !labels.is_empty() {
                tasks.retain(|t| labels.iter().any(|l| t.labels.contains(l)));
            }
            Ok(crate::board::project(tasks))
        })
        .await
    }

    /// Update a task, gating any status change behind dependency readiness,
    /// WIP limits, and (for a transition into `Done`) compliance for every
    /// agent that has touched the task (§4.1, §4.6).
    pub async fn update_task(&self, id: &str, patch: TaskPatch, options: UpdateOptions) -> Result<TaskUpdateResult> {
        self.bounded(async {
            let current = self
                .tasks
                .get(id)
                .await?
                .ok_or_else(|| ScrumError::not_found("task", id))?;

            let mut warnings = Vec::new();

            if let Some(new_status) = patch.status {
                if new_status != current.status {
                    if new_status == TaskStatus::InProgress {
                        match self.check_dependency_readiness(id).await {
                            Ok(()) => {}
                            Err(ScrumError::Precondition(PreconditionKind::DependencyBlocked { blocking_task_ids }))
                                if !options.enforce_dependencies =>
                            {
                                warnings.push(format!(
                                    "dependency not satisfied, blocking tasks: {}",
                                    blocking_task_ids.join(", ")
                                ));
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    match self.check_wip_limit(new_status, id).await {
                        Ok(()) => {}
                        Err(ScrumError::Precondition(PreconditionKind::WipExceeded { status, limit, current: wip_current }))
                            if !options.enforce_wip_limits =>
                        {
                            warnings.push(format!(
                                "WIP limit exceeded for status {status} (limit {limit}, current {wip_current})"
                            ));
                        }
                        Err(e) => return Err(e),
                    }
                    if new_status == TaskStatus::Done {
                        self.check_completion_compliance(id).await?;
                    }
                }
            }

            let from_status = current.status;
            let from_agent = current.assigned_agent.clone();
            let from_priority = current.priority;
            let updated = self.tasks.update(id, patch.clone()).await?;

            if let Some(new_status) = patch.status {
                if new_status != from_status {
                    self.events.publish(Event::TaskStatusChanged {
                        task_id: id.to_string(),
                        from: from_status.to_string(),
                        to: new_status.to_string(),
                    });
                    self.changelog
                        .append(NewChangelogEntry {
                            task_id: Some(id.to_string()),
                            agent_id: "system".to_string(),
                            file_path: synthetic_path(id),
                            change_type: crate::models::ChangeType::TaskStatusChange,
                            summary: format!("status: {from_status} -> {new_status}"),
                            diff_snippet: None,
                            commit_hash: None,
                        })
                        .await?;

                    if new_status == TaskStatus::Done {
                        self.changelog
                            .append(NewChangelogEntry {
                                task_id: Some(id.to_string()),
                                agent_id: "system".to_string(),
                                file_path: synthetic_path(id),
                                change_type: crate::models::ChangeType::TaskCompleted,
                                summary: "task completed".to_string(),
                                diff_snippet: None,
                                commit_hash: None,
                            })
                            .await?;
                    }
                }
            }

            if let Some(new_agent) = &patch.assigned_agent {
                if *new_agent != from_agent {
                    self.events.publish(Event::TaskAssigned {
                        task_id: id.to_string(),
                        agent_id: new_agent.clone().unwrap_or_default(),
                    });
                    self.changelog
                        .append(NewChangelogEntry {
                            task_id: Some(id.to_string()),
                            agent_id: "system".to_string(),
                            file_path: synthetic_path(id),
                            change_type: crate::models::ChangeType::TaskAssigned,
                            summary: format!("assigned to {}", new_agent.clone().unwrap_or_else(|| "<none>".to_string())),
                            diff_snippet: None,
                            commit_hash: None,
                        })
                        .await?;
                }
            }

            if let Some(new_priority) = patch.priority {
                if new_priority != from_priority {
                    self.changelog
                        .append(NewChangelogEntry {
                            task_id: Some(id.to_string()),
                            agent_id: "system".to_string(),
                            file_path: synthetic_path(id),
                            change_type: crate::models::ChangeType::TaskPriorityChange,
                            summary: format!("priority: {from_priority:?} -> {new_priority:?}"),
                            diff_snippet: None,
                            commit_hash: None,
                        })
                        .await?;
                }
            }

            self.events.publish(Event::TaskUpdated { task_id: id.to_string() });

            Ok(TaskUpdateResult { task: updated, warnings })
        })
        .await
    }

    async fn check_dependency_readiness(&self, task_id: &str) -> Result<()> {
        let edges = self.tasks.list_dependencies().await?;
        let all_tasks = self.tasks.list_all().await?;
        let by_id: HashMap<String, Task> = all_tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        let blocking = dependency::blocking_tasks(task_id, &edges, &by_id);
        if !blocking.is_empty() {
            return Err(ScrumError::Precondition(PreconditionKind::DependencyBlocked {
                blocking_task_ids: blocking,
            }));
        }
        Ok(())
    }

    async fn check_wip_limit(&self, status: TaskStatus, excluding_task_id: &str) -> Result<()> {
        let limit = self.tasks.get_wip_limit(status).await?;
        let all_tasks = self.tasks.list_all().await?;
        let current = all_tasks
            .iter()
            .filter(|t| t.status == status && t.id != excluding_task_id)
            .count() as u32;
        dependency::check_wip_limit(status, limit.as_ref(), current)
    }

    pub async fn add_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<TaskDependency> {
        self.bounded(async {
            let edges = self.tasks.list_dependencies().await?;
            dependency::validate_new_edge(task_id, depends_on_task_id, &edges)?;
            let edge = self.tasks.add_dependency(task_id, depends_on_task_id).await?;
            self.changelog
                .append(NewChangelogEntry {
                    task_id: Some(task_id.to_string()),
                    agent_id: "system".to_string(),
                    file_path: synthetic_path(task_id),
                    change_type: crate::models::ChangeType::DependencyAdded,
                    summary: format!("depends on {depends_on_task_id}"),
                    diff_snippet: None,
                    commit_hash: None,
                })
                .await?;
            Ok(edge)
        })
        .await
    }

    pub async fn remove_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<()> {
        self.bounded(async {
            self.tasks.remove_dependency(task_id, depends_on_task_id).await?;
            self.changelog
                .append(NewChangelogEntry {
                    task_id: Some(task_id.to_string()),
                    agent_id: "system".to_string(),
                    file_path: synthetic_path(task_id),
                    change_type: crate::models::ChangeType::DependencyRemoved,
                    summary: format!("no longer depends on {depends_on_task_id}"),
                    diff_snippet: None,
                    commit_hash: None,
                })
                .await?;
            Ok(())
        })
        .await
    }

    /// `(ready, blockingTasks)` for `task_id` (§4.1 `isTaskReady`).
    pub async fn is_task_ready(&self, task_id: &str) -> Result<(bool, Vec<String>)> {
        self.bounded(async {
            let edges = self.tasks.list_dependencies().await?;
            let all_tasks = self.tasks.list_all().await?;
            let by_id: HashMap<String, Task> = all_tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
            let blocking = dependency::blocking_tasks(task_id, &edges, &by_id);
            Ok((blocking.is_empty(), blocking))
        })
        .await
    }

    pub async fn set_wip_limit(&self, status: TaskStatus, max_tasks: u32) -> Result<WipLimit> {
        self.bounded(self.tasks.set_wip_limit(status, max_tasks)).await
    }

    pub async fn get_wip_limit(&self, status: TaskStatus) -> Result<Option<WipLimit>> {
        self.bounded(self.tasks.get_wip_limit(status)).await
    }

    pub async fn list_wip_limits(&self) -> Result<Vec<WipLimit>> {
        self.bounded(self.tasks.list_wip_limits()).await
    }

    pub async fn add_comment(&self, task_id: &str, agent_id: &str, content: &str) -> Result<Comment> {
        self.bounded(async {
            Validator::validate_agent_id(agent_id)?;
            Validator::validate_comment_content(content)?;
            let comment = self.tasks.add_comment(task_id, agent_id, content).await?;
            self.changelog
                .append(NewChangelogEntry {
                    task_id: Some(task_id.to_string()),
                    agent_id: agent_id.to_string(),
                    file_path: synthetic_path(task_id),
                    change_type: crate::models::ChangeType::CommentAdded,
                    summary: "comment added".to_string(),
                    diff_snippet: None,
                    commit_hash: None,
                })
                .await?;
            Ok(comment)
        })
        .await
    }

    pub async fn list_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
        self.bounded(self.tasks.list_comments(task_id)).await
    }

    pub async fn add_blocker(
        &self,
        task_id: &str,
        agent_id: &str,
        description: &str,
        blocking_task_id: Option<&str>,
    ) -> Result<Blocker> {
        self.bounded(async {
            if let Some(blocking_id) = blocking_task_id {
                self.tasks
                    .get(blocking_id)
                    .await?
                    .ok_or_else(|| ScrumError::not_found("task", blocking_id))?;
            }
            let blocker = self.tasks.add_blocker(task_id, agent_id, description, blocking_task_id).await?;
            self.changelog
                .append(NewChangelogEntry {
                    task_id: Some(task_id.to_string()),
                    agent_id: agent_id.to_string(),
                    file_path: synthetic_path(task_id),
                    change_type: crate::models::ChangeType::BlockerAdded,
                    summary: description.to_string(),
                    diff_snippet: None,
                    commit_hash: None,
                })
                .await?;
            Ok(blocker)
        })
        .await
    }

    /// Resolving an already-resolved blocker is a no-op that returns the
    /// current record (§4.1).
    pub async fn resolve_blocker(&self, blocker_id: &str) -> Result<Blocker> {
        self.bounded(async {
            let blocker = self.tasks.resolve_blocker(blocker_id).await?;
            self.changelog
                .append(NewChangelogEntry {
                    task_id: Some(blocker.task_id.clone()),
                    agent_id: blocker.agent_id.clone(),
                    file_path: synthetic_path(&blocker.task_id),
                    change_type: crate::models::ChangeType::BlockerResolved,
                    summary: format!("blocker resolved: {}", blocker.description),
                    diff_snippet: None,
                    commit_hash: None,
                })
                .await?;
            Ok(blocker)
        })
        .await
    }

    pub async fn list_blockers(&self, task_id: &str) -> Result<Vec<Blocker>> {
        self.bounded(self.tasks.list_blockers(task_id)).await
    }

    pub async fn post_intent(&self, new_intent: NewIntent) -> Result<Intent> {
        self.bounded(async {
            Validator::validate_agent_id(&new_intent.agent_id)?;
            Validator::validate_intent_files(&new_intent.files)?;
            Validator::validate_acceptance_criteria(&new_intent.acceptance_criteria)?;
            let intent = self.intents.create(new_intent).await?;
            self.events.publish(Event::IntentPosted {
                task_id: intent.task_id.clone(),
                agent_id: intent.agent_id.clone(),
            });
            Ok(intent)
        })
        .await
    }

    /// Whether `agent_id` has declared intent covering every file in
    /// `files`, unioned across *all* of that agent's intents on *any* task
    /// (§4.2; this is the pre-claim guard in §4.3, and is intentionally
    /// not scoped to one task — see the open question in §9).
    pub async fn has_intent_for_files(&self, agent_id: &str, files: &[String]) -> Result<(bool, Vec<String>)> {
        self.bounded(async {
            let intents = self.intents.list_for_agent(agent_id).await?;
            let declared: std::collections::HashSet<String> =
                intents.into_iter().flat_map(|i| i.files).collect();
            let missing: Vec<String> = files.iter().filter(|f| !declared.contains(*f)).cloned().collect();
            Ok((missing.is_empty(), missing))
        })
        .await
    }

    /// Claim `files` for `agent_id`, clamping the requested TTL into
    /// `[min_ttl, max_ttl]` seconds (§4.3). Returns `ClaimOutcome::Conflict`
    /// rather than an error when another agent already holds an overlapping,
    /// unexpired claim. Order of checks: input validation -> intent guard ->
    /// conflict detection -> write (§4.9).
    pub async fn claim_files(
        &self,
        agent_id: &str,
        files: Vec<String>,
        requested_ttl_secs: u64,
        min_ttl_secs: u64,
        max_ttl_secs: u64,
    ) -> Result<ClaimOutcome> {
        self.bounded(async {
            Validator::validate_agent_id(agent_id)?;
            let (has_intent, missing_files) = self.has_intent_for_files(agent_id, &files).await?;
            if !has_intent {
                return Err(ScrumError::Precondition(PreconditionKind::NoIntent { missing_files }));
            }
            let ttl = Validator::clamp_ttl_seconds(requested_ttl_secs, min_ttl_secs, max_ttl_secs);
            let now = self.clock.now();
            let expires_at = now + chrono::Duration::seconds(ttl as i64);
            let outcome = self.claims.create(agent_id, files.clone(), expires_at, now).await?;
            match &outcome {
                ClaimOutcome::Ok(_) => {
                    self.events.publish(Event::ClaimCreated {
                        agent_id: agent_id.to_string(),
                        files,
                    });
                }
                ClaimOutcome::Conflict { conflicts_with } => {
                    self.events.publish(Event::ClaimConflict {
                        agent_id: agent_id.to_string(),
                        conflicts_with: conflicts_with.clone(),
                    });
                }
            }
            Ok(outcome)
        })
        .await
    }

    /// Release claims held by `agent_id`. Order of checks: evidence
    /// existence -> compliance per evidence task -> write (§4.3, §4.9).
    /// Rejects without releasing anything if the agent has never attached
    /// evidence, or if compliance fails for any task it has evidence on.
    pub async fn release_claim(&self, agent_id: &str, files: Option<Vec<String>>) -> Result<()> {
        self.bounded(async {
            let evidenced_task_ids = self.evidence.task_ids_for_agent(agent_id).await?;
            if evidenced_task_ids.is_empty() {
                return Err(ScrumError::Precondition(PreconditionKind::NoEvidence));
            }

            for task_id in &evidenced_task_ids {
                let report = self.compute_compliance(task_id, agent_id).await?;
                if !report.boundary_violations.is_empty() {
                    return Err(ScrumError::Precondition(PreconditionKind::BoundaryViolation {
                        violations: report.boundary_violations,
                    }));
                }
                if !report.files_match {
                    return Err(ScrumError::Precondition(PreconditionKind::ComplianceFailed {
                        undeclared: report.undeclared_files,
                    }));
                }
            }

            self.claims.release(agent_id, files.clone()).await?;
            self.events.publish(Event::ClaimReleased {
                agent_id: agent_id.to_string(),
                files: files.unwrap_or_default(),
            });
            Ok(())
        })
        .await
    }

    pub async fn list_active_claims(&self) -> Result<Vec<AgentClaim>> {
        let now = self.clock.now();
        self.bounded(self.claims.list_active(now)).await
    }

    /// Pre-flight for a caller weighing whether to call `claimFiles`: which
    /// of `files` are currently held by someone else, and by whom (§6
    /// `claims.overlapCheck`). Read-only; writes nothing.
    pub async fn overlap_check(&self, files: &[String]) -> Result<Vec<(String, String)>> {
        let active = self.list_active_claims().await?;
        Ok(active
            .into_iter()
            .flat_map(|claim| {
                claim
                    .files
                    .into_iter()
                    .filter(|f| files.contains(f))
                    .map(move |f| (f, claim.agent_id.clone()))
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    /// Extend claims held by `agent_id` by `additional_secs`, clamped into
    /// `[30, 3600]`. Returns the number of rows extended and the new
    /// expiry, or `None` if `agent_id` holds no matching claims (§4.3).
    pub async fn extend_claims(
        &self,
        agent_id: &str,
        additional_secs: u64,
        files: Option<Vec<String>>,
    ) -> Result<Option<(usize, chrono::DateTime<chrono::Utc>)>> {
        self.bounded(async {
            let clamped = additional_secs.clamp(30, 3600);
            let now = self.clock.now();
            let new_expiry = now + chrono::Duration::seconds(clamped as i64);
            let count = self.claims.extend(agent_id, files, new_expiry).await?;
            if count == 0 {
                return Ok(None);
            }
            self.events.publish(Event::ClaimExtended {
                agent_id: agent_id.to_string(),
                expires_at: new_expiry.to_rfc3339(),
            });
            Ok(Some((count, new_expiry)))
        })
        .await
    }

    pub async fn attach_evidence(&self, mut new_evidence: NewEvidence) -> Result<Evidence> {
        self.bounded(async {
            Validator::validate_agent_id(&new_evidence.agent_id)?;
            Validator::validate_command(&new_evidence.command)?;
            self.tasks
                .get(&new_evidence.task_id)
                .await?
                .ok_or_else(|| ScrumError::not_found("task", &new_evidence.task_id))?;
            clip_to_byte_boundary(&mut new_evidence.output, self.output_clip_bytes);
            let evidence = self.evidence.create(new_evidence).await?;
            self.events.publish(Event::EvidenceAttached {
                task_id: evidence.task_id.clone(),
                agent_id: evidence.agent_id.clone(),
            });
            Ok(evidence)
        })
        .await
    }

    /// Newest-first evidence for one task (§4.4).
    pub async fn list_evidence(&self, task_id: &str) -> Result<Vec<Evidence>> {
        self.bounded(async {
            let mut rows = self.evidence.list_for_task(task_id).await?;
            rows.reverse();
            Ok(rows)
        })
        .await
    }

    /// Newest-first evidence across every task, bounded by `limit` (§4.4).
    pub async fn list_all_evidence(&self, limit: u32) -> Result<Vec<Evidence>> {
        self.bounded(self.evidence.list_all(limit)).await
    }

    /// `{hasEvidence, taskIds}` for `agent_id` (§4.4).
    pub async fn has_evidence_for_task(&self, agent_id: &str) -> Result<(bool, Vec<String>)> {
        self.bounded(async {
            let task_ids = self.evidence.task_ids_for_agent(agent_id).await?;
            Ok((!task_ids.is_empty(), task_ids))
        })
        .await
    }

    pub async fn append_changelog(&self, entry: NewChangelogEntry) -> Result<ChangelogEntry> {
        self.bounded(async {
            let entry = self.changelog.append(entry).await?;
            self.events.publish(Event::ChangelogAppended {
                task_id: entry.task_id.clone(),
                agent_id: entry.agent_id.clone(),
                file_path: entry.file_path.clone(),
            });
            Ok(entry)
        })
        .await
    }

    pub async fn query_changelog(&self, filter: ChangelogFilter) -> Result<Vec<ChangelogEntry>> {
        self.bounded(self.changelog.query(filter)).await
    }

    /// Convenience wrapper over `searchChangelog` scoped to one file (§4.5).
    pub async fn get_file_history(&self, file_path: &str, limit: u32) -> Result<Vec<ChangelogEntry>> {
        self.bounded(self.changelog.query(ChangelogFilter {
            file_path: Some(file_path.to_string()),
            limit: Some(limit),
            ..Default::default()
        }))
        .await
    }

    /// Pure derivation, no events: compliance for one `(task_id, agent_id)`
    /// pair, read-only over intents/evidence/changelog/claims (§4.6).
    async fn compute_compliance(&self, task_id: &str, agent_id: &str) -> Result<ComplianceReport> {
        let intents = self.intents.list_for_task(task_id).await?;
        let agent_intents: Vec<&Intent> = intents.iter().filter(|i| i.agent_id == agent_id).collect();
        let declared_files: Vec<String> = agent_intents.iter().flat_map(|i| i.files.clone()).collect();
        let boundaries_text: Vec<Option<String>> = agent_intents.iter().map(|i| i.boundaries.clone()).collect();

        let modified_files = self.changelog.modified_files(task_id, agent_id).await?;
        let has_evidence = !self.evidence.list_for_agent(task_id, agent_id).await?.is_empty();

        let now = self.clock.now();
        let claims_released = self.claims.get_for_agent(agent_id, now).await?.is_none();

        Ok(compliance::evaluate(ComplianceInputs {
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            declared_files,
            boundaries_text,
            modified_files,
            has_evidence,
            claims_released,
        }))
    }

    /// Evaluate intent -> evidence -> files-match -> boundaries ->
    /// claims-released compliance for one `(task_id, agent_id)` pair (§4.6).
    /// Unlike [`Self::compute_compliance`], this is the public,
    /// event-emitting entry point (e.g. the `compliance.check` surface).
    pub async fn evaluate_compliance(&self, task_id: &str, agent_id: &str) -> Result<ComplianceReport> {
        self.bounded(async {
            let report = self.compute_compliance(task_id, agent_id).await?;
            self.events.publish(Event::ComplianceEvaluated {
                task_id: task_id.to_string(),
                agent_id: agent_id.to_string(),
                compliant: report.compliant,
            });
            Ok(report)
        })
        .await
    }

    /// Every distinct agent that has touched `task_id`, across intents,
    /// evidence, and changelog entries (§4.6 "distinct agentIds").
    async fn agents_touching_task(&self, task_id: &str) -> Result<Vec<String>> {
        let mut agent_ids: Vec<String> = Vec::new();
        agent_ids.extend(self.intents.list_for_task(task_id).await?.into_iter().map(|i| i.agent_id));
        agent_ids.extend(self.evidence.list_for_task(task_id).await?.into_iter().map(|e| e.agent_id));
        agent_ids.extend(
            self.changelog
                .query(ChangelogFilter {
                    task_id: Some(task_id.to_string()),
                    ..Default::default()
                })
                .await?
                .into_iter()
                .map(|e| e.agent_id),
        );
        agent_ids.retain(|a| a != "system");
        agent_ids.sort();
        agent_ids.dedup();
        Ok(agent_ids)
    }

    /// Gate for `updateTask` transitions into `Done` (§4.1, §4.6): every
    /// agent that has touched `task_id` must have `canComplete = true`.
    async fn check_completion_compliance(&self, task_id: &str) -> Result<()> {
        let agent_ids = self.agents_touching_task(task_id).await?;
        let mut non_compliant = Vec::new();
        for agent_id in &agent_ids {
            let report = self.compute_compliance(task_id, agent_id).await?;
            if !report.can_complete {
                non_compliant.push(agent_id.clone());
            }
        }
        if !non_compliant.is_empty() {
            return Err(ScrumError::Precondition(PreconditionKind::ComplianceBlocked {
                agent_ids: non_compliant,
            }));
        }
        Ok(())
    }

    /// Whether `task_id` may move to `Done` right now, without performing
    /// the transition (read-only pre-flight for callers of `updateTask`).
    pub async fn can_complete(&self, task_id: &str) -> Result<bool> {
        self.bounded(async {
            self.check_completion_compliance(task_id).await?;
            Ok(true)
        })
        .await
    }

    pub async fn register_agent(
        &self,
        agent_id: &str,
        capabilities: Vec<String>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Agent> {
        self.bounded(async {
            Validator::validate_agent_id(agent_id)?;
            let agent = self.agents.register(agent_id, capabilities, metadata).await?;
            self.events.publish(Event::AgentRegistered {
                agent_id: agent_id.to_string(),
            });
            Ok(agent)
        })
        .await
    }

    pub async fn heartbeat(&self, agent_id: &str) -> Result<Agent> {
        let now = self.clock.now();
        self.bounded(async {
            let agent = self.agents.heartbeat(agent_id, now).await?;
            self.events.publish(Event::AgentHeartbeat {
                agent_id: agent_id.to_string(),
            });
            Ok(agent)
        })
        .await
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.bounded(self.agents.list()).await
    }
}

/// Synthetic path used for lifecycle changelog entries that are not
/// scoped to a real file (§3 `ChangelogEntry`).
pub fn synthetic_path(task_id: &str) -> String {
    format!("task:{task_id}")
}

/// A standalone boundary check usable outside the compliance flow, e.g. by
/// a caller that wants to pre-flight a set of files against an intent
/// before attaching evidence.
pub fn check_boundaries(boundaries_text: Option<&str>, modified: &[String]) -> Vec<String> {
    Boundaries::parse(boundaries_text).violations(modified.iter())
}

/// Generate a new entity id with the given type prefix, re-exported here
/// so facade callers don't need to depend on `ids` directly.
pub fn new_id(prefix: &str) -> String {
    ids::generate(prefix)
}

/// Truncate `text` in place to at most `max_bytes`, on a char boundary
/// (§3 `Evidence`, §6 `output_clip_bytes`).
fn clip_to_byte_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }
    let mut boundary = max_bytes;
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    text.truncate(boundary);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_path_is_namespaced() {
        assert_eq!(synthetic_path("t1"), "task:t1");
    }

    #[test]
    fn check_boundaries_reports_violations() {
        let violations = check_boundaries(Some("src/secrets/"), &["src/secrets/k.ts".to_string()]);
        assert_eq!(violations, vec!["src/secrets/k.ts".to_string()]);
    }
}

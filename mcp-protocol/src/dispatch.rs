//! Maps one [`crate::requests::Request`] onto the matching
//! [`scrum_core::Facade`] call and wraps the outcome in an [`Envelope`].
//!
//! This is the only place request shapes and facade signatures meet; the
//! transport (stdio, in `mcp-server`) just reads a line, calls
//! [`Dispatcher::dispatch`], and writes the envelope back out.

use std::sync::Arc;

use serde_json::{json, Value};

use scrum_core::facade::Facade;
use scrum_core::models::UpdateOptions;
use scrum_core::store::IntentStore;

use crate::envelope::{Envelope, ErrorBody};
use crate::requests::Request;

/// TTL bounds applied to `claimCreate` when the caller doesn't pin them
/// itself; configured once at server start-up (§6).
#[derive(Debug, Clone, Copy)]
pub struct ClaimTtlBounds {
    pub min_seconds: u64,
    pub max_seconds: u64,
}

impl Default for ClaimTtlBounds {
    fn default() -> Self {
        Self { min_seconds: 30, max_seconds: 3600 }
    }
}

/// Dispatches requests against a single [`Facade`] instance.
pub struct FacadeDispatcher {
    facade: Arc<Facade>,
    claim_ttl: ClaimTtlBounds,
}

impl FacadeDispatcher {
    pub fn new(facade: Arc<Facade>) -> Self {
        Self { facade, claim_ttl: ClaimTtlBounds::default() }
    }

    pub fn with_claim_ttl_bounds(mut self, bounds: ClaimTtlBounds) -> Self {
        self.claim_ttl = bounds;
        self
    }

    /// Runs `request` against the facade and always returns an `Envelope`
    /// (never an `Err`) — failures are carried as `Envelope::failure`.
    pub async fn dispatch(&self, request: Request) -> Envelope<Value> {
        match self.handle(request).await {
            Ok(value) => Envelope::success(value),
            Err(err) => Envelope::failure(ErrorBody::from(&err)),
        }
    }

    async fn handle(&self, request: Request) -> scrum_core::error::Result<Value> {
        let facade = &self.facade;
        let value = match request {
            Request::TaskCreate(new_task) => json!(facade.create_task(new_task).await?),
            Request::TaskGet { id } => json!(facade.get_task(&id).await?),
            Request::TaskList(params) => {
                let filter = scrum_core::models::TaskFilter {
                    assigned_agent: params.assigned_agent,
                    status: params.status,
                    labels: params.labels,
                    limit: params.limit,
                };
                json!(facade.list_tasks(filter).await?)
            }
            Request::TaskUpdate { id, patch, options } => {
                let options: UpdateOptions = options.map(Into::into).unwrap_or_default();
                json!(facade.update_task(&id, patch, options).await?)
            }
            Request::Board(params) => {
                json!(facade.board(params.assigned_agent.as_deref(), &params.labels).await?)
            }
            Request::CommentAdd { task_id, agent_id, content } => {
                json!(facade.add_comment(&task_id, &agent_id, &content).await?)
            }
            Request::CommentList { task_id } => json!(facade.list_comments(&task_id).await?),
            Request::BlockerAdd { task_id, agent_id, description, blocking_task_id } => {
                json!(
                    facade
                        .add_blocker(&task_id, &agent_id, &description, blocking_task_id.as_deref())
                        .await?
                )
            }
            Request::BlockerResolve { blocker_id } => json!(facade.resolve_blocker(&blocker_id).await?),
            Request::BlockerList { task_id } => json!(facade.list_blockers(&task_id).await?),
            Request::DependencyAdd { task_id, depends_on_task_id } => {
                json!(facade.add_dependency(&task_id, &depends_on_task_id).await?)
            }
            Request::DependencyRemove { task_id, depends_on_task_id } => {
                facade.remove_dependency(&task_id, &depends_on_task_id).await?;
                Value::Null
            }
            Request::TaskReady { task_id } => {
                let (ready, blocking_task_ids) = facade.is_task_ready(&task_id).await?;
                json!({ "ready": ready, "blockingTaskIds": blocking_task_ids })
            }
            Request::WipLimitSet { status, max_tasks } => {
                json!(facade.set_wip_limit(status, max_tasks).await?)
            }
            Request::WipLimitGet { status } => json!(facade.get_wip_limit(status).await?),
            Request::WipLimitList => json!(facade.list_wip_limits().await?),
            Request::IntentPost(new_intent) => json!(facade.post_intent(new_intent).await?),
            Request::IntentList { task_id } => {
                json!(facade.intents.list_for_task(&task_id).await?)
            }
            Request::ClaimCreate { agent_id, files, ttl_seconds } => {
                json!(
                    facade
                        .claim_files(&agent_id, files, ttl_seconds, self.claim_ttl.min_seconds, self.claim_ttl.max_seconds)
                        .await?
                )
            }
            Request::ClaimRelease { agent_id, files } => {
                facade.release_claim(&agent_id, files).await?;
                Value::Null
            }
            Request::ClaimExtend { agent_id, additional_seconds, files } => {
                match facade.extend_claims(&agent_id, additional_seconds, files).await? {
                    Some((count, expires_at)) => json!({ "extended": count, "expiresAt": expires_at }),
                    None => Value::Null,
                }
            }
            Request::ClaimList => json!(facade.list_active_claims().await?),
            Request::ClaimOverlapCheck { files } => {
                let conflicts = facade.overlap_check(&files).await?;
                json!(conflicts
                    .into_iter()
                    .map(|(file_path, agent_id)| json!({ "filePath": file_path, "agentId": agent_id }))
                    .collect::<Vec<_>>())
            }
            Request::EvidenceAttach(new_evidence) => json!(facade.attach_evidence(new_evidence).await?),
            Request::EvidenceList { task_id } => json!(facade.list_evidence(&task_id).await?),
            Request::EvidenceListAll { limit } => json!(facade.list_all_evidence(limit).await?),
            Request::ChangelogLog(entry) => json!(facade.append_changelog(entry).await?),
            Request::ChangelogSearch(filter) => json!(facade.query_changelog(filter).await?),
            Request::FileHistory { file_path, limit } => {
                json!(facade.get_file_history(&file_path, limit).await?)
            }
            Request::ComplianceCheck { task_id, agent_id } => {
                json!(facade.evaluate_compliance(&task_id, &agent_id).await?)
            }
            Request::AgentRegister { agent_id, capabilities, metadata } => {
                json!(facade.register_agent(&agent_id, capabilities, metadata).await?)
            }
            Request::AgentHeartbeat { agent_id } => json!(facade.heartbeat(&agent_id).await?),
            Request::AgentList => json!(facade.list_agents().await?),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mocks::{InMemoryAgentStore, InMemoryChangelogStore, InMemoryClaimStore, InMemoryEvidenceStore, InMemoryIntentStore, InMemoryTaskStore};
    use scrum_core::clock::SystemClock;
    use scrum_core::events::EventBus;
    use scrum_core::models::{NewIntent, NewTask};

    fn test_facade() -> Arc<Facade> {
        let tasks = Arc::new(InMemoryTaskStore::new());
        Arc::new(Facade::new(
            tasks.clone(),
            Arc::new(InMemoryIntentStore::new()),
            Arc::new(InMemoryClaimStore::new()),
            Arc::new(InMemoryEvidenceStore::new()),
            Arc::new(InMemoryChangelogStore::new()),
            Arc::new(InMemoryAgentStore::new(tasks)),
            Arc::new(SystemClock),
            Arc::new(EventBus::new()),
        ))
    }

    #[tokio::test]
    async fn task_create_then_get_round_trips_through_envelope() {
        let dispatcher = FacadeDispatcher::new(test_facade());
        let created = dispatcher
            .dispatch(Request::TaskCreate(NewTask {
                title: "write docs".to_string(),
                description: None,
                priority: scrum_core::models::Priority::Medium,
                assigned_agent: None,
                due_date: None,
                labels: Default::default(),
                story_points: None,
            }))
            .await;
        assert!(created.ok);
        let id = created.data.unwrap()["id"].as_str().unwrap().to_string();

        let fetched = dispatcher.dispatch(Request::TaskGet { id: id.clone() }).await;
        assert!(fetched.ok);
        assert_eq!(fetched.data.unwrap()["id"], id);
    }

    #[tokio::test]
    async fn claim_without_intent_fails_with_precondition_envelope() {
        let dispatcher = FacadeDispatcher::new(test_facade());
        let result = dispatcher
            .dispatch(Request::ClaimCreate {
                agent_id: "agent-a".to_string(),
                files: vec!["src/lib.rs".to_string()],
                ttl_seconds: 300,
            })
            .await;
        assert!(!result.ok);
        assert_eq!(result.error.unwrap().kind, "NO_INTENT");
    }

    #[tokio::test]
    async fn claim_after_intent_succeeds() {
        let dispatcher = FacadeDispatcher::new(test_facade());
        let created = dispatcher
            .dispatch(Request::TaskCreate(NewTask {
                title: "t".to_string(),
                description: None,
                priority: scrum_core::models::Priority::Medium,
                assigned_agent: None,
                due_date: None,
                labels: Default::default(),
                story_points: None,
            }))
            .await;
        let task_id = created.data.unwrap()["id"].as_str().unwrap().to_string();

        let posted = dispatcher
            .dispatch(Request::IntentPost(NewIntent {
                task_id,
                agent_id: "agent-a".to_string(),
                files: vec!["src/lib.rs".to_string()],
                boundaries: None,
                acceptance_criteria: "tests pass".to_string(),
            }))
            .await;
        assert!(posted.ok);

        let claimed = dispatcher
            .dispatch(Request::ClaimCreate {
                agent_id: "agent-a".to_string(),
                files: vec!["src/lib.rs".to_string()],
                ttl_seconds: 300,
            })
            .await;
        assert!(claimed.ok);
    }
}

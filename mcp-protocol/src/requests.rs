//! Request/response shapes for the facade operation surface (§6). Field
//! names are camelCase on the wire; IDs are opaque strings. This module
//! only describes the contract — dispatch lives in [`crate::dispatch`].

use serde::{Deserialize, Serialize};

use scrum_core::models::{
    ChangelogFilter, NewChangelogEntry, NewEvidence, NewIntent, NewTask, TaskPatch, TaskStatus,
};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    #[serde(default)]
    pub assigned_agent: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoardParams {
    #[serde(default)]
    pub assigned_agent: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptionsParams {
    #[serde(default = "default_true")]
    pub enforce_dependencies: bool,
    #[serde(default = "default_true")]
    pub enforce_wip_limits: bool,
}

fn default_true() -> bool {
    true
}

impl From<UpdateOptionsParams> for scrum_core::models::UpdateOptions {
    fn from(p: UpdateOptionsParams) -> Self {
        scrum_core::models::UpdateOptions {
            enforce_dependencies: p.enforce_dependencies,
            enforce_wip_limits: p.enforce_wip_limits,
        }
    }
}

/// The tagged request envelope accepted by the dispatcher: `{"op": "...",
/// "params": {...}}`, one JSON object per request line over stdio (§6).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", content = "params", rename_all = "camelCase")]
pub enum Request {
    TaskCreate(NewTask),
    TaskGet { id: String },
    TaskList(TaskListParams),
    TaskUpdate {
        id: String,
        patch: TaskPatch,
        #[serde(default)]
        options: Option<UpdateOptionsParams>,
    },
    Board(BoardParams),
    CommentAdd {
        task_id: String,
        agent_id: String,
        content: String,
    },
    CommentList {
        task_id: String,
    },
    BlockerAdd {
        task_id: String,
        agent_id: String,
        description: String,
        #[serde(default)]
        blocking_task_id: Option<String>,
    },
    BlockerResolve {
        blocker_id: String,
    },
    BlockerList {
        task_id: String,
    },
    DependencyAdd {
        task_id: String,
        depends_on_task_id: String,
    },
    DependencyRemove {
        task_id: String,
        depends_on_task_id: String,
    },
    TaskReady {
        task_id: String,
    },
    WipLimitSet {
        status: TaskStatus,
        max_tasks: u32,
    },
    WipLimitGet {
        status: TaskStatus,
    },
    WipLimitList,
    IntentPost(NewIntent),
    IntentList {
        task_id: String,
    },
    ClaimCreate {
        agent_id: String,
        files: Vec<String>,
        ttl_seconds: u64,
    },
    ClaimRelease {
        agent_id: String,
        #[serde(default)]
        files: Option<Vec<String>>,
    },
    ClaimExtend {
        agent_id: String,
        additional_seconds: u64,
        #[serde(default)]
        files: Option<Vec<String>>,
    },
    ClaimList,
    ClaimOverlapCheck {
        files: Vec<String>,
    },
    EvidenceAttach(NewEvidence),
    EvidenceList {
        task_id: String,
    },
    EvidenceListAll {
        #[serde(default = "default_evidence_limit")]
        limit: u32,
    },
    ChangelogLog(NewChangelogEntry),
    ChangelogSearch(ChangelogFilter),
    FileHistory {
        file_path: String,
        #[serde(default = "default_evidence_limit")]
        limit: u32,
    },
    ComplianceCheck {
        task_id: String,
        agent_id: String,
    },
    AgentRegister {
        agent_id: String,
        #[serde(default)]
        capabilities: Vec<String>,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },
    AgentHeartbeat {
        agent_id: String,
    },
    AgentList,
}

fn default_evidence_limit() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_get_parses_from_tagged_json() {
        let json = serde_json::json!({ "op": "taskGet", "params": { "id": "t_1" } });
        let req: Request = serde_json::from_value(json).unwrap();
        assert!(matches!(req, Request::TaskGet { id } if id == "t_1"));
    }

    #[test]
    fn claim_create_parses_full_params() {
        let json = serde_json::json!({
            "op": "claimCreate",
            "params": { "agentId": "a", "files": ["x.rs"], "ttlSeconds": 900 }
        });
        let req: Request = serde_json::from_value(json).unwrap();
        match req {
            Request::ClaimCreate { agent_id, files, ttl_seconds } => {
                assert_eq!(agent_id, "a");
                assert_eq!(files, vec!["x.rs".to_string()]);
                assert_eq!(ttl_seconds, 900);
            }
            _ => panic!("wrong variant"),
        }
    }
}

//! End-to-end: parse a raw JSON request line, dispatch it against a
//! mocks-backed facade, and check the envelope serialized back out.

use std::sync::Arc;

use mocks::{InMemoryAgentStore, InMemoryChangelogStore, InMemoryClaimStore, InMemoryEvidenceStore, InMemoryIntentStore, InMemoryTaskStore};
use scrum_core::clock::SystemClock;
use scrum_core::events::EventBus;
use scrum_core::facade::Facade;

use mcp_protocol::{FacadeDispatcher, Request};

fn facade() -> Arc<Facade> {
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

async fn roundtrip(dispatcher: &FacadeDispatcher, line: &str) -> serde_json::Value {
    let request: Request = serde_json::from_str(line).unwrap();
    let envelope = dispatcher.dispatch(request).await;
    serde_json::to_value(&envelope).unwrap()
}

#[tokio::test]
async fn task_lifecycle_over_wire_shaped_json() {
    let dispatcher = FacadeDispatcher::new(facade());

    let created = roundtrip(
        &dispatcher,
        r#"{"op":"taskCreate","params":{"title":"ship the release notes","priority":"high"}}"#,
    )
    .await;
    assert_eq!(created["ok"], true);
    let task_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["status"], "backlog");

    let board = roundtrip(&dispatcher, r#"{"op":"board","params":{}}"#).await;
    assert_eq!(board["data"]["backlog"].as_array().unwrap().len(), 1);

    let update = roundtrip(
        &dispatcher,
        &format!(r#"{{"op":"taskUpdate","params":{{"id":"{task_id}","patch":{{"status":"todo"}}}}}}"#),
    )
    .await;
    assert_eq!(update["ok"], true);
    assert_eq!(update["data"]["status"], "todo");
}

#[tokio::test]
async fn claim_without_intent_surfaces_precondition_kind_on_wire() {
    let dispatcher = FacadeDispatcher::new(facade());

    let result = roundtrip(
        &dispatcher,
        r#"{"op":"claimCreate","params":{"agentId":"agent-a","files":["src/lib.rs"],"ttlSeconds":300}}"#,
    )
    .await;

    assert_eq!(result["ok"], false);
    assert_eq!(result["error"]["kind"], "NO_INTENT");
    assert!(result["error"]["details"]["nextSteps"][0].as_str().unwrap().contains("intent"));
}

#[tokio::test]
async fn unknown_task_id_surfaces_not_found() {
    let dispatcher = FacadeDispatcher::new(facade());
    let result = roundtrip(&dispatcher, r#"{"op":"taskGet","params":{"id":"t_missing"}}"#).await;
    assert_eq!(result["ok"], true);
    assert_eq!(result["data"], serde_json::Value::Null);
}

#[tokio::test]
async fn agent_register_then_heartbeat_round_trip() {
    let dispatcher = FacadeDispatcher::new(facade());
    let registered = roundtrip(
        &dispatcher,
        r#"{"op":"agentRegister","params":{"agentId":"agent-a","capabilities":["rust"]}}"#,
    )
    .await;
    assert_eq!(registered["ok"], true);
    assert_eq!(registered["data"]["status"], "idle");

    let heartbeat = roundtrip(&dispatcher, r#"{"op":"agentHeartbeat","params":{"agentId":"agent-a"}}"#).await;
    assert_eq!(heartbeat["ok"], true);
    assert_eq!(heartbeat["data"]["agentId"], "agent-a");
}

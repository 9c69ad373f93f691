use mcp_server::config::{Config, DatabaseConfig, EngineConfig, LogFormat, LoggingConfig, ServerConfig};
use mcp_server::setup::{create_store, ensure_database_directory, initialize_app};
use tempfile::TempDir;

fn config_with_url(url: Option<String>) -> Config {
    Config {
        database: DatabaseConfig {
            url,
            max_connections: 5,
            connection_timeout: 30,
        },
        server: ServerConfig {
            listen_addr: "127.0.0.1".to_string(),
            port: 4177,
            workers: 4,
            sprint_enabled: false,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        },
        engine: EngineConfig {
            output_clip_bytes: 65536,
            agent_offline_after_ms: 300_000,
            default_claim_ttl_seconds: 900,
            max_claim_ttl_seconds: 3600,
            min_claim_ttl_seconds: 5,
            claim_extend_default_seconds: 300,
            dep_closure_max_depth: 100,
        },
    }
}

#[tokio::test]
async fn starts_up_against_a_file_backed_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite://{}", db_path.display());
    let config = config_with_url(Some(database_url));

    let store = create_store(&config).await;
    assert!(store.is_ok());
}

#[tokio::test]
async fn starts_up_against_an_in_memory_database() {
    let config = config_with_url(Some(":memory:".to_string()));
    let store = create_store(&config).await;
    assert!(store.is_ok());
}

#[tokio::test]
async fn dispatcher_serves_a_full_task_lifecycle() {
    let config = config_with_url(Some(":memory:".to_string()));
    let dispatcher = initialize_app(&config).await.unwrap();

    let created = dispatcher
        .dispatch(serde_json::from_str(r#"{"op":"taskCreate","params":{"title":"ship it"}}"#).unwrap())
        .await;
    assert!(created.ok);
    let task_id = created.data.unwrap()["id"].as_str().unwrap().to_string();

    let fetched = dispatcher
        .dispatch(
            serde_json::from_str(&format!(r#"{{"op":"taskGet","params":{{"id":"{task_id}"}}}}"#)).unwrap(),
        )
        .await;
    assert!(fetched.ok);
    assert_eq!(fetched.data.unwrap()["id"], task_id);
}

#[test]
fn ensure_database_directory_handles_in_memory() {
    assert!(ensure_database_directory(":memory:").is_ok());
    assert!(ensure_database_directory("sqlite://:memory:").is_ok());
}

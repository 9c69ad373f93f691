use anyhow::{Context, Result};
use mcp_protocol::{ClaimTtlBounds, FacadeDispatcher};
use scrum_core::clock::SystemClock;
use scrum_core::events::EventBus;
use scrum_core::facade::Facade;
use scrum_database::SqliteStore;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;

/// Open (and migrate) the SQLite store backing the coordination engine.
pub async fn create_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let database_url = config.database_url();
    info!(database_url = %database_url, "Opening SQLite store");

    let store = SqliteStore::new(&database_url)
        .await
        .context("Failed to open SQLite store")?;

    info!("Running database migrations");
    store.migrate().await.context("Failed to run database migrations")?;

    Ok(Arc::new(store))
}

/// Compose a [`Facade`] over `store`, registering it behind every store
/// trait the facade needs (one physical backend, six logical roles).
pub fn create_facade(store: Arc<SqliteStore>, config: &Config) -> Facade {
    Facade::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(SystemClock),
        Arc::new(EventBus::new()),
    )
    .with_output_clip_bytes(config.engine.output_clip_bytes)
}

/// Build the dispatcher the stdio transport drives, wired to the
/// configured claim TTL bounds (§6).
pub fn create_dispatcher(facade: Facade, config: &Config) -> FacadeDispatcher {
    FacadeDispatcher::new(Arc::new(facade)).with_claim_ttl_bounds(ClaimTtlBounds {
        min_seconds: config.engine.min_claim_ttl_seconds,
        max_seconds: config.engine.max_claim_ttl_seconds,
    })
}

/// Build the whole dispatcher from configuration: open the store, migrate
/// it, compose the facade, wire the dispatcher.
pub async fn initialize_app(config: &Config) -> Result<FacadeDispatcher> {
    let store = create_store(config).await.context("Failed to create store")?;
    let facade = create_facade(store, config);
    Ok(create_dispatcher(facade, config))
}

/// Ensure the directory holding a `sqlite://` file URL exists.
pub fn ensure_database_directory_from_config(config: &Config) -> Result<()> {
    ensure_database_directory(&config.database_url())
}

pub fn ensure_database_directory(database_url: &str) -> Result<()> {
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if db_path == ":memory:" {
            return Ok(());
        }
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!(dir = %parent.display(), "Creating database directory");
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }
    }
    Ok(())
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{migrate::MigrateDatabase, QueryBuilder, Row, Sqlite, SqlitePool};

use scrum_core::error::{Result, ScrumError};
use scrum_core::ids;
use scrum_core::models::{
    Agent, AgentClaim, Blocker, ChangelogEntry, ChangelogFilter, ClaimOutcome, Comment, Evidence, Intent,
    NewChangelogEntry, NewEvidence, NewIntent, NewTask, Task, TaskDependency, TaskFilter, TaskPatch, TaskStatus,
    WipLimit,
};
use scrum_core::store::{AgentStore, ChangelogStore, ClaimStore, EvidenceStore, IntentStore, TaskStore};

use crate::common::{
    change_type_to_string, map_sqlx_error, priority_to_string, row_to_agent, row_to_blocker, row_to_changelog_entry,
    row_to_comment, row_to_dependency, row_to_evidence, row_to_intent, row_to_task, row_to_wip_limit,
    status_to_string,
};

/// A single SQLite-backed implementation of every store trait, sharing one
/// connection pool, the way the teacher's `SqliteTaskRepository` owns one
/// pool for all task persistence.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` (a file path or `:memory:`), creating the
    /// database if it doesn't exist yet.
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_url = if database_url.starts_with(":memory:") || database_url.starts_with("sqlite://") {
            database_url.to_string()
        } else {
            format!("sqlite://{database_url}")
        };

        if !db_url.contains(":memory:") && !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            Sqlite::create_database(&db_url)
                .await
                .map_err(|e| ScrumError::Internal(format!("failed to create database: {e}")))?;
        }

        let connect_options = if db_url.contains(":memory:") {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_url)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Memory)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        } else {
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(db_url.replace("sqlite://", ""))
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
        };

        let pool = SqlitePool::connect_with(connect_options).await.map_err(map_sqlx_error)?;
        Ok(Self { pool })
    }

    /// Apply pending migrations. Call once after connecting.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| ScrumError::Internal(format!("migration failed: {e}")))?;
        tracing::info!("database migrations completed");
        Ok(())
    }

    /// Access to the pool, for tests that need to issue raw SQL.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn create(&self, task: NewTask) -> Result<Task> {
        let id = ids::generate("task");
        let now = Utc::now();
        let labels_json = serde_json::to_string(&task.labels).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO tasks (id, title, description, status, priority, assigned_agent, due_date, labels, story_points, created_at, started_at, completed_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?)",
        )
        .bind(&id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(status_to_string(TaskStatus::Backlog))
        .bind(priority_to_string(task.priority))
        .bind(&task.assigned_agent)
        .bind(task.due_date)
        .bind(labels_json)
        .bind(task.story_points)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.get(&id).await?.ok_or_else(|| ScrumError::not_found("task", &id))
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET updated_at = ");
        builder.push_bind(Utc::now());
        let mut touched = false;

        macro_rules! set_field {
            ($sql:expr, $value:expr) => {{
                builder.push(", ");
                builder.push($sql);
                builder.push(" = ");
                builder.push_bind($value);
                touched = true;
            }};
        }

        if let Some(title) = &patch.title {
            set_field!("title", title.clone());
        }
        if let Some(description) = &patch.description {
            set_field!("description", description.clone());
        }
        if let Some(status) = patch.status {
            set_field!("status", status_to_string(status).to_string());
        }
        if let Some(priority) = patch.priority {
            set_field!("priority", priority_to_string(priority).to_string());
        }
        if let Some(assigned_agent) = &patch.assigned_agent {
            set_field!("assigned_agent", assigned_agent.clone());
        }
        if let Some(due_date) = patch.due_date {
            set_field!("due_date", due_date);
        }
        if let Some(labels) = &patch.labels {
            set_field!("labels", serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string()));
        }
        if let Some(story_points) = patch.story_points {
            set_field!("story_points", story_points);
        }
        let _ = touched;

        if matches!(patch.status, Some(TaskStatus::InProgress)) {
            builder.push(", started_at = COALESCE(started_at, ");
            builder.push_bind(Utc::now());
            builder.push(")");
        }
        if matches!(patch.status, Some(TaskStatus::Done)) {
            builder.push(", completed_at = COALESCE(completed_at, ");
            builder.push_bind(Utc::now());
            builder.push(")");
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder.build().execute(&self.pool).await.map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(ScrumError::not_found("task", id));
        }

        self.get(id).await?.ok_or_else(|| ScrumError::not_found("task", id))
    }

    async fn get(&self, id: &str) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM tasks");
        let mut has_conditions = false;

        if let Some(agent) = &filter.assigned_agent {
            builder.push(" WHERE assigned_agent = ");
            builder.push_bind(agent.clone());
            has_conditions = true;
        }
        if let Some(status) = filter.status {
            builder.push(if has_conditions { " AND " } else { " WHERE " });
            builder.push("status = ");
            builder.push_bind(status_to_string(status).to_string());
            has_conditions = true;
        }
        let _ = has_conditions;

        builder.push(" ORDER BY created_at ASC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        let mut tasks: Vec<Task> = rows.iter().map(row_to_task).collect::<Result<_>>()?;

        if !filter.labels.is_empty() {
            tasks.retain(|t| filter.labels.iter().all(|l| t.labels.contains(l)));
        }
        Ok(tasks)
    }

    async fn list_all(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_task).collect()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        // blockers.blocking_task_id has no FK/cascade, so a deleted task
        // would otherwise leave dangling references (§3).
        sqlx::query("UPDATE blockers SET blocking_task_id = NULL WHERE blocking_task_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(ScrumError::not_found("task", id));
        }
        Ok(())
    }

    async fn add_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<TaskDependency> {
        let id = ids::generate("dep");
        let now = Utc::now();
        sqlx::query("INSERT INTO task_dependencies (id, task_id, depends_on_task_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(task_id)
            .bind(depends_on_task_id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(TaskDependency {
            id,
            task_id: task_id.to_string(),
            depends_on_task_id: depends_on_task_id.to_string(),
            created_at: now,
        })
    }

    async fn remove_dependency(&self, task_id: &str, depends_on_task_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM task_dependencies WHERE task_id = ? AND depends_on_task_id = ?")
            .bind(task_id)
            .bind(depends_on_task_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_dependencies(&self) -> Result<Vec<TaskDependency>> {
        let rows = sqlx::query("SELECT * FROM task_dependencies")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_dependency).collect())
    }

    async fn get_wip_limit(&self, status: TaskStatus) -> Result<Option<WipLimit>> {
        let row = sqlx::query("SELECT * FROM wip_limits WHERE status = ?")
            .bind(status_to_string(status))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(row_to_wip_limit).transpose()
    }

    async fn set_wip_limit(&self, status: TaskStatus, max_tasks: u32) -> Result<WipLimit> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO wip_limits (status, max_tasks, updated_at) VALUES (?, ?, ?)
             ON CONFLICT (status) DO UPDATE SET max_tasks = excluded.max_tasks, updated_at = excluded.updated_at",
        )
        .bind(status_to_string(status))
        .bind(max_tasks as i64)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(WipLimit {
            status,
            max_tasks,
            updated_at: now,
        })
    }

    async fn list_wip_limits(&self) -> Result<Vec<WipLimit>> {
        let rows = sqlx::query("SELECT * FROM wip_limits")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(row_to_wip_limit).collect()
    }

    async fn add_comment(&self, task_id: &str, agent_id: &str, content: &str) -> Result<Comment> {
        let id = ids::generate("comment");
        let now = Utc::now();
        sqlx::query("INSERT INTO comments (id, task_id, agent_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL)")
            .bind(&id)
            .bind(task_id)
            .bind(agent_id)
            .bind(content)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Comment {
            id,
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: None,
        })
    }

    async fn list_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
        let rows = sqlx::query("SELECT * FROM comments WHERE task_id = ? ORDER BY created_at ASC")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_comment).collect())
    }

    async fn add_blocker(
        &self,
        task_id: &str,
        agent_id: &str,
        description: &str,
        blocking_task_id: Option<&str>,
    ) -> Result<Blocker> {
        let id = ids::generate("blocker");
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO blockers (id, task_id, description, blocking_task_id, resolved_at, created_at, agent_id)
             VALUES (?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(&id)
        .bind(task_id)
        .bind(description)
        .bind(blocking_task_id)
        .bind(now)
        .bind(agent_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Blocker {
            id,
            task_id: task_id.to_string(),
            description: description.to_string(),
            blocking_task_id: blocking_task_id.map(|s| s.to_string()),
            resolved_at: None,
            created_at: now,
            agent_id: agent_id.to_string(),
        })
    }

    async fn resolve_blocker(&self, blocker_id: &str) -> Result<Blocker> {
        // Resolving an already-resolved blocker is a no-op (§4.1): COALESCE
        // keeps the original `resolved_at` rather than bumping it to `now`.
        let now = Utc::now();
        let result = sqlx::query("UPDATE blockers SET resolved_at = COALESCE(resolved_at, ?) WHERE id = ?")
            .bind(now)
            .bind(blocker_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(ScrumError::not_found("blocker", blocker_id));
        }
        let row = sqlx::query("SELECT * FROM blockers WHERE id = ?")
            .bind(blocker_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row_to_blocker(&row))
    }

    async fn list_blockers(&self, task_id: &str) -> Result<Vec<Blocker>> {
        let rows = sqlx::query("SELECT * FROM blockers WHERE task_id = ? ORDER BY created_at ASC")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_blocker).collect())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl IntentStore for SqliteStore {
    async fn create(&self, intent: NewIntent) -> Result<Intent> {
        let id = ids::generate("intent");
        let now = Utc::now();
        let files_json = serde_json::to_string(&intent.files).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO intents (id, task_id, agent_id, files, boundaries, acceptance_criteria, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&intent.task_id)
        .bind(&intent.agent_id)
        .bind(files_json)
        .bind(&intent.boundaries)
        .bind(&intent.acceptance_criteria)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Intent {
            id,
            task_id: intent.task_id,
            agent_id: intent.agent_id,
            files: intent.files,
            boundaries: intent.boundaries,
            acceptance_criteria: intent.acceptance_criteria,
            created_at: now,
        })
    }

    async fn list_for_task(&self, task_id: &str) -> Result<Vec<Intent>> {
        let rows = sqlx::query("SELECT * FROM intents WHERE task_id = ? ORDER BY created_at ASC")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_intent).collect())
    }

    async fn list_for_agent(&self, agent_id: &str) -> Result<Vec<Intent>> {
        let rows = sqlx::query("SELECT * FROM intents WHERE agent_id = ? ORDER BY created_at ASC")
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_intent).collect())
    }
}

#[async_trait]
impl ClaimStore for SqliteStore {
    async fn create(
        &self,
        agent_id: &str,
        files: Vec<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let mut conflicts = Vec::new();
        for file in &files {
            let row = sqlx::query("SELECT agent_id FROM claims WHERE file_path = ? AND expires_at > ? AND agent_id != ?")
                .bind(file)
                .bind(now)
                .bind(agent_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            if let Some(row) = row {
                let holder: String = row.get("agent_id");
                conflicts.push(holder);
            }
        }

        if !conflicts.is_empty() {
            tx.rollback().await.map_err(map_sqlx_error)?;
            conflicts.sort();
            conflicts.dedup();
            return Ok(ClaimOutcome::Conflict {
                conflicts_with: conflicts,
            });
        }

        for file in &files {
            sqlx::query(
                "INSERT INTO claims (agent_id, file_path, expires_at, created_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT (agent_id, file_path) DO UPDATE SET expires_at = excluded.expires_at",
            )
            .bind(agent_id)
            .bind(file)
            .bind(expires_at)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(ClaimOutcome::Ok(AgentClaim {
            agent_id: agent_id.to_string(),
            files,
            expires_at,
            created_at: now,
        }))
    }

    async fn release(&self, agent_id: &str, files: Option<Vec<String>>) -> Result<()> {
        match files {
            Some(files) => {
                let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM claims WHERE agent_id = ");
                builder.push_bind(agent_id);
                builder.push(" AND file_path IN (");
                let mut separated = builder.separated(", ");
                for file in &files {
                    separated.push_bind(file);
                }
                separated.push_unseparated(")");
                builder.build().execute(&self.pool).await.map_err(map_sqlx_error)?;
            }
            None => {
                sqlx::query("DELETE FROM claims WHERE agent_id = ?")
                    .bind(agent_id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;
            }
        }
        Ok(())
    }

    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<AgentClaim>> {
        let rows = sqlx::query("SELECT agent_id, file_path, expires_at, created_at FROM claims WHERE expires_at > ? ORDER BY agent_id")
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut by_agent: HashMap<String, AgentClaim> = HashMap::new();
        for row in &rows {
            let agent_id: String = row.get("agent_id");
            let file_path: String = row.get("file_path");
            let expires_at: DateTime<Utc> = row.get("expires_at");
            let created_at: DateTime<Utc> = row.get("created_at");
            let entry = by_agent.entry(agent_id.clone()).or_insert_with(|| AgentClaim {
                agent_id,
                files: Vec::new(),
                expires_at,
                created_at,
            });
            entry.files.push(file_path);
            entry.expires_at = entry.expires_at.max(expires_at);
        }
        Ok(by_agent.into_values().collect())
    }

    async fn extend(&self, agent_id: &str, files: Option<Vec<String>>, new_expiry: DateTime<Utc>) -> Result<usize> {
        let rows_affected = match files {
            Some(files) => {
                let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE claims SET expires_at = ");
                builder.push_bind(new_expiry);
                builder.push(" WHERE agent_id = ");
                builder.push_bind(agent_id);
                builder.push(" AND file_path IN (");
                let mut separated = builder.separated(", ");
                for file in &files {
                    separated.push_bind(file);
                }
                separated.push_unseparated(")");
                builder.build().execute(&self.pool).await.map_err(map_sqlx_error)?.rows_affected()
            }
            None => {
                sqlx::query("UPDATE claims SET expires_at = ? WHERE agent_id = ?")
                    .bind(new_expiry)
                    .bind(agent_id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected()
            }
        };
        Ok(rows_affected as usize)
    }

    async fn get_for_agent(&self, agent_id: &str, now: DateTime<Utc>) -> Result<Option<AgentClaim>> {
        let rows = sqlx::query("SELECT agent_id, file_path, expires_at, created_at FROM claims WHERE agent_id = ? AND expires_at > ?")
            .bind(agent_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut files = Vec::new();
        let mut expires_at = now;
        let mut created_at = now;
        for row in &rows {
            files.push(row.get::<String, _>("file_path"));
            let row_expires: DateTime<Utc> = row.get("expires_at");
            expires_at = expires_at.max(row_expires);
            created_at = row.get("created_at");
        }

        Ok(Some(AgentClaim {
            agent_id: agent_id.to_string(),
            files,
            expires_at,
            created_at,
        }))
    }
}

#[async_trait]
impl EvidenceStore for SqliteStore {
    async fn create(&self, evidence: NewEvidence) -> Result<Evidence> {
        let id = ids::generate("evidence");
        let now = Utc::now();
        sqlx::query("INSERT INTO evidence (id, task_id, agent_id, command, output, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(&id)
            .bind(&evidence.task_id)
            .bind(&evidence.agent_id)
            .bind(&evidence.command)
            .bind(&evidence.output)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Evidence {
            id,
            task_id: evidence.task_id,
            agent_id: evidence.agent_id,
            command: evidence.command,
            output: evidence.output,
            created_at: now,
        })
    }

    async fn list_for_task(&self, task_id: &str) -> Result<Vec<Evidence>> {
        let rows = sqlx::query("SELECT * FROM evidence WHERE task_id = ? ORDER BY created_at ASC")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_evidence).collect())
    }

    async fn list_for_agent(&self, task_id: &str, agent_id: &str) -> Result<Vec<Evidence>> {
        let rows = sqlx::query("SELECT * FROM evidence WHERE task_id = ? AND agent_id = ? ORDER BY created_at ASC")
            .bind(task_id)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_evidence).collect())
    }

    async fn list_all(&self, limit: u32) -> Result<Vec<Evidence>> {
        let rows = sqlx::query("SELECT * FROM evidence ORDER BY created_at DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(row_to_evidence).collect())
    }

    async fn task_ids_for_agent(&self, agent_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT task_id FROM evidence WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.iter().map(|row| row.get("task_id")).collect())
    }
}

#[async_trait]
impl ChangelogStore for SqliteStore {
    async fn append(&self, entry: NewChangelogEntry) -> Result<ChangelogEntry> {
        let id = ids::generate("change");
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO changelog (id, task_id, agent_id, file_path, change_type, summary, diff_snippet, commit_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&entry.task_id)
        .bind(&entry.agent_id)
        .bind(&entry.file_path)
        .bind(change_type_to_string(entry.change_type))
        .bind(&entry.summary)
        .bind(&entry.diff_snippet)
        .bind(&entry.commit_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(ChangelogEntry {
            id,
            task_id: entry.task_id,
            agent_id: entry.agent_id,
            file_path: entry.file_path,
            change_type: entry.change_type,
            summary: entry.summary,
            diff_snippet: entry.diff_snippet,
            commit_hash: entry.commit_hash,
            created_at: now,
        })
    }

    async fn query(&self, filter: ChangelogFilter) -> Result<Vec<ChangelogEntry>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM changelog");
        let mut has_conditions = false;

        macro_rules! condition {
            ($sql:expr, $value:expr) => {{
                builder.push(if has_conditions { " AND " } else { " WHERE " });
                builder.push($sql);
                builder.push_bind($value);
                has_conditions = true;
            }};
        }

        if let Some(file_path) = &filter.file_path {
            condition!("file_path LIKE ", format!("%{file_path}%"));
        }
        if let Some(agent_id) = &filter.agent_id {
            condition!("agent_id = ", agent_id.clone());
        }
        if let Some(task_id) = &filter.task_id {
            condition!("task_id = ", task_id.clone());
        }
        if let Some(change_type) = filter.change_type {
            condition!("change_type = ", change_type_to_string(change_type).to_string());
        }
        if let Some(since) = filter.since {
            condition!("created_at >= ", since);
        }
        if let Some(until) = filter.until {
            condition!("created_at <= ", until);
        }
        if let Some(query) = &filter.query {
            condition!("summary LIKE ", format!("%{query}%"));
        }

        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        rows.iter().map(row_to_changelog_entry).collect()
    }
}

#[async_trait]
impl AgentStore for SqliteStore {
    async fn register(&self, agent_id: &str, capabilities: Vec<String>, metadata: Option<serde_json::Value>) -> Result<Agent> {
        let now = Utc::now();
        let capabilities_json = serde_json::to_string(&capabilities).unwrap_or_else(|_| "[]".to_string());
        let metadata_json = metadata.as_ref().map(|m| m.to_string());

        sqlx::query(
            "INSERT INTO agents (agent_id, capabilities, metadata, last_heartbeat, registered_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (agent_id) DO UPDATE SET capabilities = excluded.capabilities, metadata = excluded.metadata, last_heartbeat = excluded.last_heartbeat",
        )
        .bind(agent_id)
        .bind(capabilities_json)
        .bind(metadata_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.get(agent_id).await?.ok_or_else(|| ScrumError::not_found("agent", agent_id))
    }

    async fn heartbeat(&self, agent_id: &str, now: DateTime<Utc>) -> Result<Agent> {
        let result = sqlx::query("UPDATE agents SET last_heartbeat = ? WHERE agent_id = ?")
            .bind(now)
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(ScrumError::not_found("agent", agent_id));
        }
        self.get(agent_id).await?.ok_or_else(|| ScrumError::not_found("agent", agent_id))
    }

    async fn get(&self, agent_id: &str) -> Result<Option<Agent>> {
        let row = sqlx::query("SELECT * FROM agents WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let Some(row) = row else { return Ok(None) };
        let has_in_progress = self.agent_has_in_progress_task(agent_id).await?;
        Ok(Some(row_to_agent(&row, has_in_progress)))
    }

    async fn list(&self) -> Result<Vec<Agent>> {
        let rows = sqlx::query("SELECT * FROM agents ORDER BY registered_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let active_agents: std::collections::HashSet<String> =
            sqlx::query_scalar("SELECT DISTINCT assigned_agent FROM tasks WHERE status = 'in_progress' AND assigned_agent IS NOT NULL")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .into_iter()
                .collect();
        Ok(rows
            .iter()
            .map(|row| {
                let agent_id: String = row.get("agent_id");
                let has_in_progress = active_agents.contains(&agent_id);
                row_to_agent(row, has_in_progress)
            })
            .collect())
    }
}

impl SqliteStore {
    async fn agent_has_in_progress_task(&self, agent_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tasks WHERE assigned_agent = ? AND status = 'in_progress'",
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(count > 0)
    }
}

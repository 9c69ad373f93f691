use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use scrum_core::error::ScrumError;
use scrum_core::models::{
    Agent, AgentStatus, Blocker, ChangeType, ChangelogEntry, Comment, Evidence, Intent, Priority, Task, TaskDependency,
    TaskStatus, WipLimit,
};

/// How long an agent may go without a heartbeat before it is reported
/// `Offline` regardless of task activity (derived, not stored — §3 `Agent`,
/// §6 `agent_offline_after_ms` default).
const OFFLINE_AFTER_SECS: i64 = 300;

pub fn status_to_string(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Backlog => "backlog",
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Review => "review",
        TaskStatus::Done => "done",
        TaskStatus::Cancelled => "cancelled",
    }
}

pub fn string_to_status(s: &str) -> scrum_core::error::Result<TaskStatus> {
    match s {
        "backlog" => Ok(TaskStatus::Backlog),
        "todo" => Ok(TaskStatus::Todo),
        "in_progress" => Ok(TaskStatus::InProgress),
        "review" => Ok(TaskStatus::Review),
        "done" => Ok(TaskStatus::Done),
        "cancelled" => Ok(TaskStatus::Cancelled),
        other => Err(ScrumError::Internal(format!("invalid task status in database: {other}"))),
    }
}

pub fn priority_to_string(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
        Priority::Critical => "critical",
    }
}

pub fn string_to_priority(s: &str) -> scrum_core::error::Result<Priority> {
    match s {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        "critical" => Ok(Priority::Critical),
        other => Err(ScrumError::Internal(format!("invalid priority in database: {other}"))),
    }
}

pub fn change_type_to_string(change_type: ChangeType) -> &'static str {
    match change_type {
        ChangeType::Create => "create",
        ChangeType::Modify => "modify",
        ChangeType::Delete => "delete",
        ChangeType::TaskCreated => "task_created",
        ChangeType::TaskStatusChange => "task_status_change",
        ChangeType::TaskAssigned => "task_assigned",
        ChangeType::TaskPriorityChange => "task_priority_change",
        ChangeType::TaskCompleted => "task_completed",
        ChangeType::BlockerAdded => "blocker_added",
        ChangeType::BlockerResolved => "blocker_resolved",
        ChangeType::DependencyAdded => "dependency_added",
        ChangeType::DependencyRemoved => "dependency_removed",
        ChangeType::CommentAdded => "comment_added",
    }
}

pub fn string_to_change_type(s: &str) -> scrum_core::error::Result<ChangeType> {
    match s {
        "create" => Ok(ChangeType::Create),
        "modify" => Ok(ChangeType::Modify),
        "delete" => Ok(ChangeType::Delete),
        "task_created" => Ok(ChangeType::TaskCreated),
        "task_status_change" => Ok(ChangeType::TaskStatusChange),
        "task_assigned" => Ok(ChangeType::TaskAssigned),
        "task_priority_change" => Ok(ChangeType::TaskPriorityChange),
        "task_completed" => Ok(ChangeType::TaskCompleted),
        "blocker_added" => Ok(ChangeType::BlockerAdded),
        "blocker_resolved" => Ok(ChangeType::BlockerResolved),
        "dependency_added" => Ok(ChangeType::DependencyAdded),
        "dependency_removed" => Ok(ChangeType::DependencyRemoved),
        "comment_added" => Ok(ChangeType::CommentAdded),
        other => Err(ScrumError::Internal(format!("invalid change_type in database: {other}"))),
    }
}

pub fn row_to_task(row: &SqliteRow) -> scrum_core::error::Result<Task> {
    let status_str: String = row.get("status");
    let priority_str: String = row.get("priority");
    let labels_json: String = row.get("labels");
    let labels = serde_json::from_str(&labels_json).unwrap_or_default();

    Ok(Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        status: string_to_status(&status_str)?,
        priority: string_to_priority(&priority_str)?,
        assigned_agent: row.get("assigned_agent"),
        due_date: row.get("due_date"),
        labels,
        story_points: row.get("story_points"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        updated_at: row.get("updated_at"),
    })
}

pub fn row_to_dependency(row: &SqliteRow) -> TaskDependency {
    TaskDependency {
        id: row.get("id"),
        task_id: row.get("task_id"),
        depends_on_task_id: row.get("depends_on_task_id"),
        created_at: row.get("created_at"),
    }
}

pub fn row_to_wip_limit(row: &SqliteRow) -> scrum_core::error::Result<WipLimit> {
    let status_str: String = row.get("status");
    Ok(WipLimit {
        status: string_to_status(&status_str)?,
        max_tasks: row.get::<i64, _>("max_tasks") as u32,
        updated_at: row.get("updated_at"),
    })
}

pub fn row_to_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        task_id: row.get("task_id"),
        agent_id: row.get("agent_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub fn row_to_blocker(row: &SqliteRow) -> Blocker {
    Blocker {
        id: row.get("id"),
        task_id: row.get("task_id"),
        description: row.get("description"),
        blocking_task_id: row.get("blocking_task_id"),
        resolved_at: row.get("resolved_at"),
        created_at: row.get("created_at"),
        agent_id: row.get("agent_id"),
    }
}

pub fn row_to_intent(row: &SqliteRow) -> Intent {
    let files_json: String = row.get("files");
    Intent {
        id: row.get("id"),
        task_id: row.get("task_id"),
        agent_id: row.get("agent_id"),
        files: serde_json::from_str(&files_json).unwrap_or_default(),
        boundaries: row.get("boundaries"),
        acceptance_criteria: row.get("acceptance_criteria"),
        created_at: row.get("created_at"),
    }
}

pub fn row_to_evidence(row: &SqliteRow) -> Evidence {
    Evidence {
        id: row.get("id"),
        task_id: row.get("task_id"),
        agent_id: row.get("agent_id"),
        command: row.get("command"),
        output: row.get("output"),
        created_at: row.get("created_at"),
    }
}

pub fn row_to_changelog_entry(row: &SqliteRow) -> scrum_core::error::Result<ChangelogEntry> {
    let change_type_str: String = row.get("change_type");
    Ok(ChangelogEntry {
        id: row.get("id"),
        task_id: row.get("task_id"),
        agent_id: row.get("agent_id"),
        file_path: row.get("file_path"),
        change_type: string_to_change_type(&change_type_str)?,
        summary: row.get("summary"),
        diff_snippet: row.get("diff_snippet"),
        commit_hash: row.get("commit_hash"),
        created_at: row.get("created_at"),
    })
}

/// Agent status is derived at read time, not stored (§3 `Agent`): `Offline`
/// if the heartbeat is stale beyond [`OFFLINE_AFTER_SECS`], else `Active`
/// if the agent has an `in_progress` task, else `Idle`. The caller supplies
/// `has_in_progress_task` from a join against `tasks` since that is not a
/// column on `agents` itself.
pub fn row_to_agent(row: &SqliteRow, has_in_progress_task: bool) -> Agent {
    let capabilities_json: String = row.get("capabilities");
    let metadata_json: Option<String> = row.get("metadata");
    let last_heartbeat: DateTime<Utc> = row.get("last_heartbeat");

    let age = Utc::now().signed_duration_since(last_heartbeat).num_seconds();
    let status = if age > OFFLINE_AFTER_SECS {
        AgentStatus::Offline
    } else if has_in_progress_task {
        AgentStatus::Active
    } else {
        AgentStatus::Idle
    };

    Agent {
        agent_id: row.get("agent_id"),
        capabilities: serde_json::from_str(&capabilities_json).unwrap_or_default(),
        metadata: metadata_json.and_then(|m| serde_json::from_str(&m).ok()),
        last_heartbeat,
        registered_at: row.get("registered_at"),
        status,
    }
}

/// Map a `sqlx::Error` to the domain error taxonomy, parsing UNIQUE
/// constraint messages the way the teacher's `sqlx_error_to_task_error`
/// does for its own unique constraints.
pub fn map_sqlx_error(err: sqlx::Error) -> ScrumError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            if message.contains("UNIQUE constraint failed") {
                ScrumError::Conflict {
                    holders: vec![message.to_string()],
                }
            } else {
                ScrumError::Internal(format!("database constraint error: {message}"))
            }
        }
        sqlx::Error::RowNotFound => ScrumError::NotFound("row not found".to_string()),
        sqlx::Error::PoolTimedOut => ScrumError::Internal("connection pool timeout".to_string()),
        sqlx::Error::Io(io_err) => ScrumError::Internal(format!("database I/O error: {io_err}")),
        other => ScrumError::Internal(format!("database operation failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in TaskStatus::BOARD_COLUMNS {
            assert_eq!(string_to_status(status_to_string(status)).unwrap(), status);
        }
        assert_eq!(string_to_status("cancelled").unwrap(), TaskStatus::Cancelled);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(string_to_status("bogus").is_err());
    }

    #[test]
    fn change_type_round_trips() {
        let kinds = [
            ChangeType::Create,
            ChangeType::Modify,
            ChangeType::Delete,
            ChangeType::TaskCreated,
            ChangeType::TaskStatusChange,
            ChangeType::TaskAssigned,
            ChangeType::TaskPriorityChange,
            ChangeType::TaskCompleted,
            ChangeType::BlockerAdded,
            ChangeType::BlockerResolved,
            ChangeType::DependencyAdded,
            ChangeType::DependencyRemoved,
            ChangeType::CommentAdded,
        ];
        for kind in kinds {
            assert_eq!(string_to_change_type(change_type_to_string(kind)).unwrap(), kind);
        }
    }
}

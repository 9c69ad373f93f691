//! Dependency graph traversal: readiness, cycle detection, and WIP limit
//! checks (§4.1, §9 "Graph traversal"). Pure functions over an in-memory
//! edge list; callers supply whatever a store's `list_dependencies` loads.

use crate::error::{PreconditionKind, Result, ScrumError};
use crate::models::{Task, TaskDependency, TaskStatus, WipLimit};
use std::collections::{HashMap, HashSet};

/// Edges are capped at this transitive depth; a graph that still has an
/// open frontier past this is treated as pathological rather than walked
/// forever (§9).
pub const MAX_DEPTH: usize = 100;

/// A task is ready when every task it depends on is `Done` (§4.1). A task
/// with no declared dependencies is trivially ready.
pub fn is_task_ready(task_id: &str, edges: &[TaskDependency], tasks_by_id: &HashMap<String, Task>) -> bool {
    blocking_tasks(task_id, edges, tasks_by_id).is_empty()
}

/// Every task transitively reachable from `task_id` by following
/// `depends_on` edges, bounded to [`MAX_DEPTH`] hops, that is not yet
/// `Done` (§4.1, §9). Traversal walks through already-`Done` nodes too —
/// a dependency being done does not stop its own unfinished dependencies
/// from still blocking `task_id`.
pub fn blocking_tasks(
    task_id: &str,
    edges: &[TaskDependency],
    tasks_by_id: &HashMap<String, Task>,
) -> Vec<String> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut frontier: Vec<&str> = vec![task_id];
    visited.insert(task_id);
    let mut blocking: Vec<String> = Vec::new();

    for _ in 0..MAX_DEPTH {
        if frontier.is_empty() {
            break;
        }
        let mut next = Vec::new();
        for node in frontier {
            for e in edges.iter().filter(|e| e.task_id == node) {
                let dep_id = e.depends_on_task_id.as_str();
                if visited.insert(dep_id) {
                    let not_done = tasks_by_id
                        .get(dep_id)
                        .map(|t| t.status != TaskStatus::Done)
                        .unwrap_or(true);
                    if not_done {
                        blocking.push(dep_id.to_string());
                    }
                    next.push(dep_id);
                }
            }
        }
        frontier = next;
    }
    blocking
}

/// Validate that adding the edge `task_id -> depends_on_task_id` keeps the
/// graph a DAG and is not a duplicate or self-reference, walking the
/// transitive closure of `depends_on_task_id`'s dependencies up to
/// [`MAX_DEPTH`].
pub fn validate_new_edge(
    task_id: &str,
    depends_on_task_id: &str,
    edges: &[TaskDependency],
) -> Result<()> {
    if task_id == depends_on_task_id {
        return Err(ScrumError::Precondition(PreconditionKind::SelfDependency));
    }
    if edges
        .iter()
        .any(|e| e.task_id == task_id && e.depends_on_task_id == depends_on_task_id)
    {
        return Err(ScrumError::Precondition(PreconditionKind::Duplicate));
    }
    // Adding task_id -> depends_on_task_id creates a cycle iff task_id is
    // already reachable from depends_on_task_id.
    if reachable(depends_on_task_id, task_id, edges) {
        return Err(ScrumError::Precondition(PreconditionKind::Cycle));
    }
    Ok(())
}

/// Is `to` reachable from `from` by following `depends_on` edges forward,
/// within [`MAX_DEPTH`] hops?
fn reachable(from: &str, to: &str, edges: &[TaskDependency]) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut frontier: Vec<&str> = vec![from];
    visited.insert(from);

    for _ in 0..MAX_DEPTH {
        if frontier.is_empty() {
            return false;
        }
        let mut next = Vec::new();
        for node in frontier {
            if node == to {
                return true;
            }
            for e in edges.iter().filter(|e| e.task_id == node) {
                if visited.insert(e.depends_on_task_id.as_str()) {
                    next.push(e.depends_on_task_id.as_str());
                }
            }
        }
        frontier = next;
    }
    false
}

/// Count of non-cancelled tasks currently in `status`, for WIP enforcement.
pub fn count_in_status(tasks: &[Task], status: TaskStatus) -> u32 {
    tasks.iter().filter(|t| t.status == status).count() as u32
}

/// Check whether moving one more task into `status` would exceed the
/// configured limit. `current` should already exclude the task being
/// moved (i.e. count over all *other* tasks).
pub fn check_wip_limit(status: TaskStatus, limit: Option<&WipLimit>, current: u32) -> Result<()> {
    let Some(limit) = limit else { return Ok(()) };
    if current >= limit.max_tasks {
        return Err(ScrumError::Precondition(PreconditionKind::WipExceeded {
            status: status.to_string(),
            limit: limit.max_tasks,
            current,
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: "t".to_string(),
            description: None,
            status,
            priority: crate::models::Priority::Medium,
            assigned_agent: None,
            due_date: None,
            labels: Default::default(),
            story_points: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    fn edge(task_id: &str, depends_on: &str) -> TaskDependency {
        TaskDependency {
            id: format!("dep_{task_id}_{depends_on}"),
            task_id: task_id.to_string(),
            depends_on_task_id: depends_on.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ready_with_no_dependencies() {
        let tasks = HashMap::new();
        assert!(is_task_ready("t1", &[], &tasks));
    }

    #[test]
    fn blocked_until_dependency_done() {
        let mut tasks = HashMap::new();
        tasks.insert("t2".to_string(), task("t2", TaskStatus::InProgress));
        let edges = vec![edge("t1", "t2")];
        assert!(!is_task_ready("t1", &edges, &tasks));
        assert_eq!(blocking_tasks("t1", &edges, &tasks), vec!["t2".to_string()]);

        tasks.insert("t2".to_string(), task("t2", TaskStatus::Done));
        assert!(is_task_ready("t1", &edges, &tasks));
    }

    #[test]
    fn blocking_tasks_is_transitive_through_done_intermediates() {
        // t1 -> t2 -> t3. t2 is done but t3, its own dependency, is not —
        // t3 must still block t1, even though t2 no longer does.
        let mut tasks = HashMap::new();
        tasks.insert("t2".to_string(), task("t2", TaskStatus::Done));
        tasks.insert("t3".to_string(), task("t3", TaskStatus::InProgress));
        let edges = vec![edge("t1", "t2"), edge("t2", "t3")];

        assert!(!is_task_ready("t1", &edges, &tasks));
        assert_eq!(blocking_tasks("t1", &edges, &tasks), vec!["t3".to_string()]);

        tasks.insert("t3".to_string(), task("t3", TaskStatus::Done));
        assert!(is_task_ready("t1", &edges, &tasks));
    }

    #[test]
    fn rejects_self_dependency() {
        let err = validate_new_edge("t1", "t1", &[]).unwrap_err();
        assert!(matches!(
            err,
            ScrumError::Precondition(PreconditionKind::SelfDependency)
        ));
    }

    #[test]
    fn rejects_duplicate_edge() {
        let edges = vec![edge("t1", "t2")];
        let err = validate_new_edge("t1", "t2", &edges).unwrap_err();
        assert!(matches!(
            err,
            ScrumError::Precondition(PreconditionKind::Duplicate)
        ));
    }

    #[test]
    fn rejects_cycle() {
        // t1 -> t2 -> t3, adding t3 -> t1 would close a cycle.
        let edges = vec![edge("t1", "t2"), edge("t2", "t3")];
        let err = validate_new_edge("t3", "t1", &edges).unwrap_err();
        assert!(matches!(
            err,
            ScrumError::Precondition(PreconditionKind::Cycle)
        ));
    }

    #[test]
    fn allows_diamond_dependency() {
        let edges = vec![edge("t1", "t2"), edge("t1", "t3"), edge("t2", "t4")];
        assert!(validate_new_edge("t3", "t4", &edges).is_ok());
    }

    #[test]
    fn wip_limit_blocks_when_at_capacity() {
        let limit = WipLimit {
            status: TaskStatus::InProgress,
            max_tasks: 2,
            updated_at: Utc::now(),
        };
        assert!(check_wip_limit(TaskStatus::InProgress, Some(&limit), 1).is_ok());
        let err = check_wip_limit(TaskStatus::InProgress, Some(&limit), 2).unwrap_err();
        assert!(matches!(
            err,
            ScrumError::Precondition(PreconditionKind::WipExceeded { .. })
        ));
    }

    #[test]
    fn no_limit_never_blocks() {
        assert!(check_wip_limit(TaskStatus::InProgress, None, 999).is_ok());
    }
}

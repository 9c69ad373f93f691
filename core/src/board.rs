//! Kanban board projection (§4.1): five non-cancelled buckets, each sorted
//! by priority descending then `created_at` ascending.

use crate::models::{Board, Task, TaskStatus};
use std::cmp::Reverse;

pub fn project(mut tasks: Vec<Task>) -> Board {
    tasks.retain(|t| t.status != TaskStatus::Cancelled);
    tasks.sort_by_key(|t| (Reverse(t.priority), t.created_at));

    let mut board = Board::default();
    for task in tasks {
        match task.status {
            TaskStatus::Backlog => board.backlog.push(task),
            TaskStatus::Todo => board.todo.push(task),
            TaskStatus::InProgress => board.in_progress.push(task),
            TaskStatus::Review => board.review.push(task),
            TaskStatus::Done => board.done.push(task),
            TaskStatus::Cancelled => unreachable!("cancelled tasks filtered above"),
        }
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{Duration, Utc};

    fn task(id: &str, status: TaskStatus, priority: Priority, age_secs: i64) -> Task {
        Task {
            id: id.to_string(),
            title: "t".to_string(),
            description: None,
            status,
            priority,
            assigned_agent: None,
            due_date: None,
            labels: Default::default(),
            story_points: None,
            created_at: Utc::now() - Duration::seconds(age_secs),
            started_at: None,
            completed_at: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn excludes_cancelled() {
        let tasks = vec![task("t1", TaskStatus::Cancelled, Priority::High, 0)];
        let board = project(tasks);
        assert!(board.backlog.is_empty());
        assert!(board.todo.is_empty());
        assert!(board.in_progress.is_empty());
        assert!(board.review.is_empty());
        assert!(board.done.is_empty());
    }

    #[test]
    fn sorts_by_priority_then_age() {
        let tasks = vec![
            task("low", TaskStatus::Backlog, Priority::Low, 100),
            task("high_new", TaskStatus::Backlog, Priority::High, 1),
            task("high_old", TaskStatus::Backlog, Priority::High, 200),
        ];
        let board = project(tasks);
        let ids: Vec<&str> = board.backlog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high_old", "high_new", "low"]);
    }
}

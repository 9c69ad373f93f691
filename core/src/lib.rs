//! Coordination state engine for SCRUM.
//!
//! This crate provides the domain models, business logic, and trait
//! interfaces for a local multi-agent coordination service built on an
//! intent -> claim -> evidence -> release discipline. All other crates
//! depend on the types and interfaces defined here.
//!
//! # Architecture
//!
//! - [`models`] - Core domain entities (Task, Intent, Claim, Evidence, ...)
//! - [`error`] - Error taxonomy and result handling
//! - [`store`] - Persistence trait interfaces, one per entity family
//! - [`facade`] - The composing entry point gating every cross-cutting rule
//! - [`dependency`] - Dependency graph traversal, cycle detection, WIP checks
//! - [`boundary`] - The boundary mini-language parser and matcher
//! - [`compliance`] - Pure compliance scoring derivation
//! - [`events`] - The event bus
//! - [`board`] - Kanban board projection
//! - [`clock`] - The injectable time source
//! - [`ids`] - Collision-resistant entity id generation
//! - [`validation`] - Business-rule validation utilities
//!
//! # Example
//!
//! ```rust
//! use scrum_core::{models::NewTask, validation::Validator};
//!
//! let new_task = NewTask {
//!     title: "Design the architecture".to_string(),
//!     description: Some("Draft the module layout".to_string()),
//!     priority: scrum_core::models::Priority::High,
//!     assigned_agent: None,
//!     due_date: None,
//!     labels: Default::default(),
//!     story_points: None,
//! };
//!
//! Validator::validate_title(&new_task.title).unwrap();
//! ```

pub mod models;
pub mod error;
pub mod store;
pub mod facade;
pub mod dependency;
pub mod boundary;
pub mod compliance;
pub mod events;
pub mod board;
pub mod clock;
pub mod ids;
pub mod validation;

pub use error::{Result, ScrumError, PreconditionKind};
pub use facade::Facade;
pub use store::{AgentStore, ChangelogStore, ClaimStore, EvidenceStore, IntentStore, TaskStore};
pub use models::{NewTask, Task, TaskFilter, TaskPatch, TaskStatus};
pub use validation::Validator;

/// Current version of the core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name.
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_constants_are_set() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "scrum-core");
    }

    #[test]
    fn re_exports_resolve() {
        let status = TaskStatus::Backlog;
        assert_eq!(format!("{status}"), "backlog");

        let err = ScrumError::not_found("task", "t1");
        assert!(err.is_not_found());
    }
}

use thiserror::Error;

/// Result type alias used throughout the coordination engine.
pub type Result<T> = std::result::Result<T, ScrumError>;

/// The precondition kinds from spec §7 that gate a facade transition
/// rather than reflecting a malformed request. Each carries the details
/// needed to build the `nextSteps` a caller can act on mechanically.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionKind {
    #[error("no intent declared for files: {missing_files:?}")]
    NoIntent { missing_files: Vec<String> },

    #[error("no evidence attached for agent")]
    NoEvidence,

    #[error("dependency not satisfied, blocking tasks: {blocking_task_ids:?}")]
    DependencyBlocked { blocking_task_ids: Vec<String> },

    #[error("WIP limit exceeded for status {status} (limit {limit}, current {current})")]
    WipExceeded {
        status: String,
        limit: u32,
        current: u32,
    },

    #[error("compliance check failed: undeclared files {undeclared:?}")]
    ComplianceFailed { undeclared: Vec<String> },

    #[error("boundary violation: {violations:?}")]
    BoundaryViolation { violations: Vec<String> },

    #[error("completion blocked, non-compliant agents: {agent_ids:?}")]
    ComplianceBlocked { agent_ids: Vec<String> },

    #[error("a task cannot depend on itself")]
    SelfDependency,

    #[error("dependency already exists")]
    Duplicate,

    #[error("adding this dependency would create a cycle")]
    Cycle,
}

impl PreconditionKind {
    /// Actionable next steps an agent can follow mechanically (§7).
    pub fn next_steps(&self) -> Vec<String> {
        match self {
            PreconditionKind::NoIntent { missing_files } => vec![format!(
                "postIntent with files covering: {}",
                missing_files.join(", ")
            )],
            PreconditionKind::NoEvidence => {
                vec!["attachEvidence before releasing claims".to_string()]
            }
            PreconditionKind::DependencyBlocked { blocking_task_ids } => vec![format!(
                "complete blocking tasks first: {}",
                blocking_task_ids.join(", ")
            )],
            PreconditionKind::WipExceeded { status, .. } => vec![format!(
                "wait for a task to leave status {status} or raise the WIP limit"
            )],
            PreconditionKind::ComplianceFailed { undeclared } => vec![format!(
                "post an intent declaring: {}, or revert the undeclared changes",
                undeclared.join(", ")
            )],
            PreconditionKind::BoundaryViolation { violations } => vec![format!(
                "revert changes to boundary-protected files: {}",
                violations.join(", ")
            )],
            PreconditionKind::ComplianceBlocked { agent_ids } => vec![format!(
                "resolve compliance for agents: {}",
                agent_ids.join(", ")
            )],
            PreconditionKind::SelfDependency
            | PreconditionKind::Duplicate
            | PreconditionKind::Cycle => vec!["choose a different dependency pair".to_string()],
        }
    }
}

/// Error taxonomy for the coordination engine (§7). Kinds, not exception
/// class hierarchies: callers match on the variant to decide how to react.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrumError {
    #[error("validation error: {message}")]
    Validation { message: String, field: Option<String> },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: held by {holders:?}")]
    Conflict { holders: Vec<String> },

    #[error(transparent)]
    Precondition(#[from] PreconditionKind),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ScrumError {
    pub fn validation(message: impl Into<String>) -> Self {
        ScrumError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ScrumError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ScrumError::NotFound(format!("{entity} '{id}' not found"))
    }

    pub fn empty_field(field: &str) -> Self {
        Self::validation_field(field, format!("field '{field}' cannot be empty"))
    }

    /// `nextSteps` for the rejection responses that require them (§7):
    /// `COMPLIANCE_FAILED`/`COMPLIANCE_BLOCKED`/`NO_INTENT`/`NO_EVIDENCE`.
    /// Other kinds have no mechanical next step and return `None`.
    pub fn next_steps(&self) -> Option<Vec<String>> {
        match self {
            ScrumError::Precondition(kind @ PreconditionKind::NoIntent { .. })
            | ScrumError::Precondition(kind @ PreconditionKind::NoEvidence)
            | ScrumError::Precondition(kind @ PreconditionKind::ComplianceFailed { .. })
            | ScrumError::Precondition(kind @ PreconditionKind::ComplianceBlocked { .. }) => {
                Some(kind.next_steps())
            }
            _ => None,
        }
    }

    /// A short machine-readable code for the `{error:{kind,...}}` envelope (§6/§7).
    pub fn kind_code(&self) -> &'static str {
        match self {
            ScrumError::Validation { .. } => "VALIDATION_ERROR",
            ScrumError::NotFound(_) => "NOT_FOUND",
            ScrumError::Conflict { .. } => "CONFLICT",
            ScrumError::Precondition(PreconditionKind::NoIntent { .. }) => "NO_INTENT",
            ScrumError::Precondition(PreconditionKind::NoEvidence) => "NO_EVIDENCE",
            ScrumError::Precondition(PreconditionKind::DependencyBlocked { .. }) => {
                "DEPENDENCY_BLOCKED"
            }
            ScrumError::Precondition(PreconditionKind::WipExceeded { .. }) => "WIP_EXCEEDED",
            ScrumError::Precondition(PreconditionKind::ComplianceFailed { .. }) => {
                "COMPLIANCE_FAILED"
            }
            ScrumError::Precondition(PreconditionKind::BoundaryViolation { .. }) => {
                "BOUNDARY_VIOLATION"
            }
            ScrumError::Precondition(PreconditionKind::ComplianceBlocked { .. }) => {
                "COMPLIANCE_BLOCKED"
            }
            ScrumError::Precondition(PreconditionKind::SelfDependency) => "SELF_DEPENDENCY",
            ScrumError::Precondition(PreconditionKind::Duplicate) => "DUPLICATE",
            ScrumError::Precondition(PreconditionKind::Cycle) => "CYCLE",
            ScrumError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ScrumError::Internal(_) => "INTERNAL",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ScrumError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = ScrumError::not_found("task", "t_1");
        assert_eq!(err.kind_code(), "NOT_FOUND");
        assert!(err.is_not_found());
    }

    #[test]
    fn compliance_failed_has_next_steps() {
        let err = ScrumError::Precondition(PreconditionKind::ComplianceFailed {
            undeclared: vec!["y.ts".to_string()],
        });
        assert_eq!(err.kind_code(), "COMPLIANCE_FAILED");
        let steps = err.next_steps().unwrap();
        assert!(steps[0].contains("y.ts"));
    }

    #[test]
    fn cycle_has_no_mechanical_next_step() {
        let err = ScrumError::Precondition(PreconditionKind::Cycle);
        assert_eq!(err.kind_code(), "CYCLE");
        assert!(err.next_steps().is_none());
    }
}

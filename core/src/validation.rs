use crate::error::{Result, ScrumError};

/// Business-rule validation, kept isolated from storage the way the
/// teacher keeps `TaskValidator` separate from `TaskRepository`.
pub struct Validator;

impl Validator {
    /// Task titles must be non-empty and reasonably short.
    pub fn validate_title(title: &str) -> Result<()> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(ScrumError::empty_field("title"));
        }
        if trimmed.len() > 200 {
            return Err(ScrumError::validation_field(
                "title",
                "title must be at most 200 characters long",
            ));
        }
        Ok(())
    }

    /// Agent ids are opaque but bounded, matching the teacher's agent-name
    /// validation.
    pub fn validate_agent_id(agent_id: &str) -> Result<()> {
        if agent_id.trim().is_empty() {
            return Err(ScrumError::empty_field("agentId"));
        }
        if agent_id.len() > 100 {
            return Err(ScrumError::validation_field(
                "agentId",
                "agent id must be at most 100 characters long",
            ));
        }
        Ok(())
    }

    pub fn validate_comment_content(content: &str) -> Result<()> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ScrumError::empty_field("content"));
        }
        if trimmed.len() > 10_000 {
            return Err(ScrumError::validation_field(
                "content",
                "comment content must be at most 10000 characters long",
            ));
        }
        Ok(())
    }

    /// Intents must declare at least one file and a non-trivial acceptance
    /// criteria (§4.2).
    pub fn validate_intent_files(files: &[String]) -> Result<()> {
        if files.is_empty() {
            return Err(ScrumError::validation_field(
                "files",
                "intent must declare at least one file",
            ));
        }
        if files.iter().any(|f| f.trim().is_empty()) {
            return Err(ScrumError::validation_field("files", "file paths cannot be empty"));
        }
        Ok(())
    }

    pub fn validate_acceptance_criteria(criteria: &str) -> Result<()> {
        let trimmed = criteria.trim();
        if trimmed.len() < 5 {
            return Err(ScrumError::validation_field(
                "acceptanceCriteria",
                "acceptance criteria must be non-empty and descriptive (>= 5 characters)",
            ));
        }
        Ok(())
    }

    /// Claim TTLs are clamped to `[min, max]` seconds rather than rejected
    /// outright (§4.3 step 4).
    pub fn clamp_ttl_seconds(requested: u64, min: u64, max: u64) -> u64 {
        requested.clamp(min, max)
    }

    pub fn validate_command(command: &str) -> Result<()> {
        if command.trim().is_empty() {
            return Err(ScrumError::empty_field("command"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_title() {
        assert!(Validator::validate_title("").is_err());
        assert!(Validator::validate_title("   ").is_err());
        assert!(Validator::validate_title("Fix login").is_ok());
    }

    #[test]
    fn rejects_empty_intent_files() {
        assert!(Validator::validate_intent_files(&[]).is_err());
        assert!(Validator::validate_intent_files(&["a.rs".to_string()]).is_ok());
    }

    #[test]
    fn rejects_too_short_acceptance_criteria() {
        assert!(Validator::validate_acceptance_criteria("ok").is_err());
        assert!(Validator::validate_acceptance_criteria("tests pass").is_ok());
    }

    #[test]
    fn clamps_ttl_to_bounds() {
        assert_eq!(Validator::clamp_ttl_seconds(1, 5, 3600), 5);
        assert_eq!(Validator::clamp_ttl_seconds(999_999, 5, 3600), 3600);
        assert_eq!(Validator::clamp_ttl_seconds(900, 5, 3600), 900);
    }
}

//! Compliance scoring: a pure derivation over an agent's intents, evidence,
//! changelog entries, and outstanding claims for a task (§4.6).

use crate::boundary::Boundaries;
use serde::{Deserialize, Serialize};

/// The minimum score (inclusive) at which an agent is considered
/// compliant for a task (§4.6).
pub const COMPLIANT_THRESHOLD: u32 = 70;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub task_id: String,
    pub agent_id: String,
    pub score: u32,
    pub has_intent: bool,
    pub has_evidence: bool,
    pub files_match: bool,
    pub undeclared_files: Vec<String>,
    pub boundary_violations: Vec<String>,
    pub claims_released: bool,
    pub compliant: bool,
    /// `intent ∧ evidence ∧ filesMatch ∧ boundaries` (§4.6). Deliberately
    /// excludes `claims_released` even though that term contributes to
    /// `score` — see the open design question in §9.
    pub can_complete: bool,
}

/// Inputs gathered from the stores for one `(task_id, agent_id)` pair.
/// Kept as a plain struct so `compliance::evaluate` stays storage-free and
/// trivially unit-testable.
pub struct ComplianceInputs {
    pub task_id: String,
    pub agent_id: String,
    pub declared_files: Vec<String>,
    pub boundaries_text: Vec<Option<String>>,
    pub modified_files: Vec<String>,
    pub has_evidence: bool,
    pub claims_released: bool,
}

/// Score and derive a `ComplianceReport` from `inputs` (§4.6):
/// - intent posted: 20
/// - evidence attached: 20
/// - every modified file was declared: 30
/// - no boundary violations: 20
/// - no outstanding claims: 10
///
/// `compliant` is `score >= COMPLIANT_THRESHOLD`. Per the open design
/// question in §9, `canComplete` gating intentionally does not fold
/// `claims_released` into its own check even though it contributes to the
/// score here — see `facade::can_complete`.
pub fn evaluate(inputs: ComplianceInputs) -> ComplianceReport {
    let has_intent = !inputs.declared_files.is_empty();

    let declared: std::collections::HashSet<&str> =
        inputs.declared_files.iter().map(|s| s.as_str()).collect();
    let undeclared_files: Vec<String> = inputs
        .modified_files
        .iter()
        .filter(|f| !declared.contains(f.as_str()))
        .cloned()
        .collect();
    let files_match = undeclared_files.is_empty();

    let boundary_violations: Vec<String> = inputs
        .boundaries_text
        .iter()
        .flat_map(|text| {
            let boundaries = Boundaries::parse(text.as_deref());
            boundaries.violations(inputs.modified_files.iter())
        })
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut score = 0u32;
    if has_intent {
        score += 20;
    }
    if inputs.has_evidence {
        score += 20;
    }
    if files_match {
        score += 30;
    }
    if boundary_violations.is_empty() {
        score += 20;
    }
    if inputs.claims_released {
        score += 10;
    }

    let compliant = score >= COMPLIANT_THRESHOLD;
    let can_complete = has_intent && inputs.has_evidence && files_match && boundary_violations.is_empty();

    ComplianceReport {
        task_id: inputs.task_id,
        agent_id: inputs.agent_id,
        score,
        has_intent,
        has_evidence: inputs.has_evidence,
        files_match,
        undeclared_files,
        boundary_violations,
        claims_released: inputs.claims_released,
        compliant,
        can_complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> ComplianceInputs {
        ComplianceInputs {
            task_id: "t1".to_string(),
            agent_id: "a1".to_string(),
            declared_files: vec!["a.rs".to_string()],
            boundaries_text: vec![None],
            modified_files: vec!["a.rs".to_string()],
            has_evidence: true,
            claims_released: true,
        }
    }

    #[test]
    fn full_compliance_scores_100() {
        let report = evaluate(base_inputs());
        assert_eq!(report.score, 100);
        assert!(report.compliant);
    }

    #[test]
    fn missing_evidence_drops_below_threshold() {
        let mut inputs = base_inputs();
        inputs.has_evidence = false;
        inputs.claims_released = false;
        let report = evaluate(inputs);
        assert_eq!(report.score, 50);
        assert!(!report.compliant);
    }

    #[test]
    fn undeclared_file_reported() {
        let mut inputs = base_inputs();
        inputs.modified_files.push("b.rs".to_string());
        let report = evaluate(inputs);
        assert!(!report.files_match);
        assert_eq!(report.undeclared_files, vec!["b.rs".to_string()]);
        assert_eq!(report.score, 70);
        assert!(report.compliant);
    }

    #[test]
    fn boundary_violation_reported() {
        let mut inputs = base_inputs();
        inputs.boundaries_text = vec![Some("a.rs".to_string())];
        let report = evaluate(inputs);
        assert_eq!(report.boundary_violations, vec!["a.rs".to_string()]);
        assert_eq!(report.score, 80);
    }

    #[test]
    fn no_intent_at_all_scores_zero_from_that_bucket() {
        let mut inputs = base_inputs();
        inputs.declared_files.clear();
        inputs.modified_files.clear();
        let report = evaluate(inputs);
        assert!(!report.has_intent);
        assert_eq!(report.score, 60);
    }
}

// decision.rs - The merged verdict returned by the governance engine.

use cg_changeset::{deny_threshold_met, Severity, Violation, ViolationSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result of one evaluation stage.
///
/// A stage either completes with zero or more findings or fails outright.
/// Callers must say what a failure means via [`StageOutcome::into_violations`].
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Completed(Vec<Violation>),
    Failed(String),
}

impl StageOutcome {
    /// Resolve the outcome into violations. A failed stage becomes one
    /// critical config violation naming `stage`.
    pub fn into_violations(self, stage: &str) -> Vec<Violation> {
        match self {
            StageOutcome::Completed(violations) => violations,
            StageOutcome::Failed(detail) => {
                tracing::warn!(stage, detail = %detail, "stage failed; denying");
                vec![Violation::evaluator_failure(stage, detail)]
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

/// The engine's verdict for one operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GovernanceDecision {
    pub allowed: bool,
    pub reason: String,
    /// Semantic, then policy, then budget findings.
    pub violations: Vec<Violation>,
    pub requires_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub evaluation_time_ms: u64,
    /// Violations raised by the policy stage (including its failure).
    #[serde(default)]
    pub policy_decision: usize,
    /// Violations raised by the budget stage (including its failure).
    #[serde(default)]
    pub budget_decision: usize,
    #[serde(default)]
    pub semantic_findings: usize,
}

impl GovernanceDecision {
    /// Merge stage results, apply the deny threshold and derive the reason.
    pub fn from_stages(
        semantic: Vec<Violation>,
        policy: Vec<Violation>,
        budget: Vec<Violation>,
    ) -> Self {
        let semantic_findings = semantic.len();
        let policy_decision = policy.len();
        let budget_decision = budget.len();

        let mut violations = semantic;
        violations.extend(policy);
        violations.extend(budget);

        let allowed = !deny_threshold_met(&violations);
        let reason = reason_for(&violations);

        Self {
            allowed,
            reason,
            violations,
            requires_override: !allowed,
            override_id: None,
            expires_at: None,
            evaluation_time_ms: 0,
            policy_decision,
            budget_decision,
            semantic_findings,
        }
    }

    /// A denial raised before any stage ran.
    pub fn rejected(violation: Violation) -> Self {
        let mut decision = Self::from_stages(Vec::new(), Vec::new(), Vec::new());
        decision.violations.push(violation);
        decision.allowed = !deny_threshold_met(&decision.violations);
        decision.requires_override = !decision.allowed;
        decision.reason = reason_for(&decision.violations);
        decision
    }

    /// Violations that meet the deny threshold on their own.
    pub fn blocking_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_blocking())
    }

    pub fn has_override(&self) -> bool {
        self.override_id.is_some()
    }
}

fn reason_for(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return "No violations".to_string();
    }

    let of_severity = |severity: Severity| -> Vec<&Violation> {
        violations.iter().filter(|v| v.severity == severity).collect()
    };

    let critical = of_severity(Severity::Critical);
    if let Some(first) = critical.first() {
        return format!(
            "Denied: {} critical violation(s): {}",
            critical.len(),
            first.message
        );
    }

    let high = of_severity(Severity::High);
    if let Some(first) = high.first() {
        return format!(
            "Denied: {} high-severity violation(s): {}",
            high.len(),
            first.message
        );
    }

    let medium: Vec<&Violation> = violations
        .iter()
        .filter(|v| {
            v.severity == Severity::Medium
                && matches!(v.source, ViolationSource::Budget | ViolationSource::Policy)
        })
        .collect();
    if let Some(first) = medium.first() {
        return format!(
            "Denied: {} medium budget/policy violation(s): {}",
            medium.len(),
            first.message
        );
    }

    format!("Allowed with {} warning(s)", violations.len())
}

/// How an override request was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// The decision was flipped to allowed.
    Approved {
        override_id: String,
        expires_at: Option<DateTime<Utc>>,
    },
    /// The evaluator declined. The decision is unchanged.
    Rejected { reason: String },
    /// The decision was already allowed; nothing to override.
    NotRequired,
}

// budget.rs - The change budget evaluator.
//
// `ChangeBudget::validate_operation()` runs every configured rule against an
// operation and collects all violations. There is no short-circuiting: an
// operation that is both oversized and touches a forbidden path reports both.
//
// Rule          | Scope    | Severity
// --------------|----------|---------
// max_files     | op       | high
// allowed_file_patterns | file | high
// forbidden_paths | file   | critical
// max_lines_per_file | file | medium
// max_total_lines | op     | high
// max_complexity_increase | file (both snippets present) | medium
//
// Limits are inclusive: value == limit passes, limit + 1 violates.

use cg_changeset::{deny_threshold_met, FileChange, Operation, Severity, Violation, ViolationSource};
use serde::{Deserialize, Serialize};

use crate::complexity::complexity_delta;
use crate::config::BudgetConfig;
use crate::pattern::{matches_forbidden_path, PatternSet};

/// Returned by `error_message()` when nothing was violated.
pub const WITHIN_BUDGET: &str = "Within budget constraints";

const REMEDIATION: &[&str] = &[
    "Split the change into smaller batches and submit them separately.",
    "Extract methods or helper functions to cut the complexity a single edit adds.",
    "Keep edits out of protected paths (VCS metadata, dependency and cache directories).",
];

/// The outcome of validating one operation against a budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetDecision {
    pub allowed: bool,
    pub violations: Vec<Violation>,
    pub reason: String,
}

impl BudgetDecision {
    fn from_violations(violations: Vec<Violation>) -> Self {
        let allowed = !deny_threshold_met(&violations);
        let reason = if violations.is_empty() {
            WITHIN_BUDGET.to_string()
        } else {
            let rules: Vec<&str> = violations.iter().map(|v| v.rule.as_str()).collect();
            format!(
                "{} budget violation(s): {}",
                violations.len(),
                rules.join(", ")
            )
        };
        Self {
            allowed,
            violations,
            reason,
        }
    }

    /// Highest severity among the violations, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }

    /// A report suitable for handing back to the agent that proposed the
    /// change. Only counts, limits and paths appear, never line content.
    pub fn error_message(&self) -> String {
        if self.allowed && self.violations.is_empty() {
            return WITHIN_BUDGET.to_string();
        }

        let mut lines = vec!["Operation exceeds budget constraints:".to_string()];
        for v in &self.violations {
            let mut line = match (v.limit, v.actual) {
                (Some(limit), Some(actual)) => {
                    format!("- {} exceeds limit of {} (actual: {})", v.rule, limit, actual)
                }
                _ => format!("- {}: {}", v.rule, v.message),
            };
            if v.limit.is_some() {
                if let Some(file) = &v.file {
                    line.push_str(&format!(" in {}", file));
                }
            }
            lines.push(line);
        }

        lines.push(String::new());
        lines.push("Suggestions:".to_string());
        for suggestion in REMEDIATION {
            lines.push(format!("- {}", suggestion));
        }
        lines.join("\n")
    }
}

/// Quantitative constraint evaluator. Build once per config, share freely.
#[derive(Debug, Clone)]
pub struct ChangeBudget {
    config: BudgetConfig,
    allowed: PatternSet,
}

impl ChangeBudget {
    pub fn new(config: BudgetConfig) -> Self {
        let allowed = PatternSet::new(&config.allowed_file_patterns);
        Self { config, allowed }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Evaluate every rule and collect all violations.
    pub fn validate_operation(&self, operation: &Operation) -> BudgetDecision {
        let mut violations = Vec::new();
        let cfg = &self.config;

        let file_count = operation.file_count() as u64;
        if file_count > cfg.max_files {
            violations.push(
                Violation::new(
                    "max_files",
                    Severity::High,
                    format!(
                        "Operation touches {} files, limit is {}",
                        file_count, cfg.max_files
                    ),
                    ViolationSource::Budget,
                )
                .with_limit(cfg.max_files, file_count),
            );
        }

        for change in &operation.changes {
            self.check_file(change, &mut violations);
        }

        let total = operation.total_lines_changed() as u64;
        if total > cfg.max_total_lines {
            violations.push(
                Violation::new(
                    "max_total_lines",
                    Severity::High,
                    format!(
                        "Operation changes {} lines in total, limit is {}",
                        total, cfg.max_total_lines
                    ),
                    ViolationSource::Budget,
                )
                .with_limit(cfg.max_total_lines, total),
            );
        }

        let decision = BudgetDecision::from_violations(violations);
        tracing::debug!(
            files = file_count,
            total_lines = total,
            violations = decision.violations.len(),
            allowed = decision.allowed,
            "budget evaluated"
        );
        decision
    }

    fn check_file(&self, change: &FileChange, violations: &mut Vec<Violation>) {
        let cfg = &self.config;
        let path = change.file_path.as_str();

        if !self.allowed.allows(path) {
            violations.push(
                Violation::new(
                    "allowed_file_patterns",
                    Severity::High,
                    format!(
                        "File '{}' does not match any allowed pattern ({})",
                        path,
                        self.allowed.raw_patterns().join(", ")
                    ),
                    ViolationSource::Budget,
                )
                .with_file(path),
            );
        }

        if matches_forbidden_path(path, &cfg.forbidden_paths) {
            violations.push(
                Violation::new(
                    "forbidden_paths",
                    Severity::Critical,
                    format!("File '{}' is in a forbidden path", path),
                    ViolationSource::Budget,
                )
                .with_file(path),
            );
        }

        let lines = change.lines_changed() as u64;
        if lines > cfg.max_lines_per_file {
            violations.push(
                Violation::new(
                    "max_lines_per_file",
                    Severity::Medium,
                    format!(
                        "File '{}' changes {} lines, limit is {}",
                        path, lines, cfg.max_lines_per_file
                    ),
                    ViolationSource::Budget,
                )
                .with_limit(cfg.max_lines_per_file, lines)
                .with_file(path),
            );
        }

        if let (Some(original), Some(modified)) = (&change.original_code, &change.modified_code) {
            let delta = complexity_delta(path, Some(original), Some(modified));
            if delta > 0 && delta as u64 > cfg.max_complexity_increase {
                violations.push(
                    Violation::new(
                        "max_complexity_increase",
                        Severity::Medium,
                        format!(
                            "File '{}' adds {} complexity, limit is {}",
                            path, delta, cfg.max_complexity_increase
                        ),
                        ViolationSource::Budget,
                    )
                    .with_limit(cfg.max_complexity_increase, delta as u64)
                    .with_file(path),
                );
            }
        }
    }
}

impl Default for ChangeBudget {
    fn default() -> Self {
        Self::new(BudgetConfig::default())
    }
}

// violation.rs - The shared constraint-violation vocabulary.
//
// Every evaluator reports findings in this one shape so the orchestrator can
// merge them and apply a single deny rule:
//
//   deny = any(critical | high)
//       || any(medium AND source in {budget, policy})
//
// A medium finding from the semantic scan alone is informational.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChangeSetError;

/// How serious a violation is. Ordered: `Low < Medium < High < Critical`.
///
/// Serialized and displayed as `LOW` .. `CRITICAL`; lowercase is accepted
/// when decoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "critical")]
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ChangeSetError;

    /// Case-insensitive. `"error"` and `"warning"` are accepted as aliases
    /// for high and medium since some policy bundles use them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" | "error" => Ok(Severity::High),
            "medium" | "warning" => Ok(Severity::Medium),
            "low" | "info" => Ok(Severity::Low),
            other => Err(ChangeSetError::UnknownSeverity(other.to_string())),
        }
    }
}

/// Which evaluator produced a violation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSource {
    /// The declarative policy evaluator.
    Policy,
    /// The quantitative change budget.
    Budget,
    /// The semantic security scan.
    Semantic,
    /// An evaluator failed internally and the engine failed closed.
    Config,
}

impl std::fmt::Display for ViolationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationSource::Policy => write!(f, "policy"),
            ViolationSource::Budget => write!(f, "budget"),
            ViolationSource::Semantic => write!(f, "semantic"),
            ViolationSource::Config => write!(f, "config"),
        }
    }
}

/// A single constraint violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    /// Machine-readable rule name (e.g. "max_files", a policy name).
    pub rule: String,

    pub severity: Severity,

    /// Human-readable explanation. Carries counts and paths, never code.
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<u64>,

    /// The file this violation is scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    pub source: ViolationSource,
}

impl Violation {
    /// Create a violation. Config-sourced violations are always critical,
    /// whatever severity the caller asked for.
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        source: ViolationSource,
    ) -> Self {
        let severity = if source == ViolationSource::Config {
            Severity::Critical
        } else {
            severity
        };
        Self {
            rule: rule.into(),
            severity,
            message: message.into(),
            limit: None,
            actual: None,
            file: None,
            source,
        }
    }

    /// The violation an orchestrator records when a whole stage fails.
    pub fn evaluator_failure(stage: &str, detail: impl std::fmt::Display) -> Self {
        Self::new(
            format!("{stage}_evaluation_failed"),
            Severity::Critical,
            format!("{stage} evaluation failed closed: {detail}"),
            ViolationSource::Config,
        )
    }

    /// Set limit and actual values and return self.
    pub fn with_limit(mut self, limit: u64, actual: u64) -> Self {
        self.limit = Some(limit);
        self.actual = Some(actual);
        self
    }

    /// Scope this violation to a file and return self.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Whether this violation alone is enough to deny an operation.
    pub fn is_blocking(&self) -> bool {
        match self.severity {
            Severity::Critical | Severity::High => true,
            Severity::Medium => matches!(
                self.source,
                ViolationSource::Budget | ViolationSource::Policy
            ),
            Severity::Low => false,
        }
    }
}

/// Apply the deny rule to a merged list of violations.
///
/// Zero violations never meet the threshold.
pub fn deny_threshold_met(violations: &[Violation]) -> bool {
    violations.iter().any(Violation::is_blocking)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(severity: Severity, source: ViolationSource) -> Violation {
        Violation::new("rule", severity, "msg", source)
    }

    #[test]
    fn config_violations_are_forced_critical() {
        let violation = Violation::new("broken", Severity::Low, "boom", ViolationSource::Config);
        assert_eq!(violation.severity, Severity::Critical);

        let failure = Violation::evaluator_failure("policy", "parse error");
        assert_eq!(failure.rule, "policy_evaluation_failed");
        assert_eq!(failure.severity, Severity::Critical);
        assert_eq!(failure.source, ViolationSource::Config);
        assert!(failure.message.contains("failed closed"));
    }

    #[test]
    fn empty_list_never_denies() {
        assert!(!deny_threshold_met(&[]));
    }

    #[test]
    fn critical_and_high_always_deny() {
        for source in [
            ViolationSource::Policy,
            ViolationSource::Budget,
            ViolationSource::Semantic,
        ] {
            assert!(deny_threshold_met(&[v(Severity::Critical, source)]));
            assert!(deny_threshold_met(&[v(Severity::High, source)]));
        }
    }

    #[test]
    fn medium_denies_only_for_budget_and_policy() {
        assert!(deny_threshold_met(&[v(Severity::Medium, ViolationSource::Budget)]));
        assert!(deny_threshold_met(&[v(Severity::Medium, ViolationSource::Policy)]));
        assert!(!deny_threshold_met(&[v(Severity::Medium, ViolationSource::Semantic)]));
    }

    #[test]
    fn low_never_denies() {
        assert!(!deny_threshold_met(&[
            v(Severity::Low, ViolationSource::Budget),
            v(Severity::Low, ViolationSource::Policy),
        ]));
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("High".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("warning".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("catastrophic".parse::<Severity>().is_err());
    }

    #[test]
    fn severity_json_matches_display() {
        for severity in [Severity::Low, Severity::Medium, Severity::High, Severity::Critical] {
            let json = serde_json::to_value(severity).unwrap();
            assert_eq!(json, severity.to_string());
        }
        let decoded: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(decoded, Severity::Critical);
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let json = serde_json::to_value(v(Severity::High, ViolationSource::Budget)).unwrap();
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["source"], "budget");
        assert!(json.get("limit").is_none());
        assert!(json.get("file").is_none());
    }
}

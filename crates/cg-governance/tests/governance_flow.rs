// governance_flow.rs - End-to-end flow through every layer.
//
//   1. Load a budget config from disk
//   2. Evaluate a clean edit -> allowed
//   3. Evaluate an oversized edit touching .git/ -> denied by the budget
//   4. Request an override -> approved, decision flipped
//   5. Evaluate with a hung policy evaluator -> timeout fails closed
//
// VERIFY:
//   - Every decision and the override land in the JSONL trail
//   - The trail's hash chain is intact
//   - Trail entries never contain the code under review

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::tempdir;

use cg_audit::{AuditKind, JsonlTrail};
use cg_budget::{BudgetConfig, ChangeBudget};
use cg_changeset::{FileChange, Operation, Severity, ViolationSource};
use cg_governance::{
    EvaluationContext, EvaluatorError, OverrideOutcome, OverrideRequest, OverrideResponse,
    PatternAnalyzer, PolicyEvaluator, PolicyInput, PolicyVerdict, TimeoutPolicyEvaluator,
    UnifiedGovernance,
};

/// Allows everything and approves overrides that carry the right code.
struct TwoPersonRule;

impl PolicyEvaluator for TwoPersonRule {
    fn evaluate(&self, _input: &PolicyInput) -> Result<PolicyVerdict, EvaluatorError> {
        Ok(PolicyVerdict::allow())
    }

    fn request_override(&self, request: &OverrideRequest) -> Result<OverrideResponse, EvaluatorError> {
        if request.human_code != "424242" {
            return Ok(OverrideResponse {
                approved: false,
                reason: Some("invalid approval code".to_string()),
                ..Default::default()
            });
        }
        Ok(OverrideResponse {
            approved: true,
            override_id: Some(format!("ovr-{}", request.context.team)),
            expires_at: Some(Utc::now() + chrono::Duration::minutes(30)),
            reason: None,
        })
    }
}

struct Hung;

impl PolicyEvaluator for Hung {
    fn evaluate(&self, _input: &PolicyInput) -> Result<PolicyVerdict, EvaluatorError> {
        std::thread::sleep(Duration::from_secs(2));
        Ok(PolicyVerdict::allow())
    }
}

#[test]
fn evaluate_override_and_audit() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("budgets.yaml");
    fs::write(
        &config_path,
        "budgets:\n  default:\n    max_files: 2\n    max_lines_per_file: 10\n    max_total_lines: 15\n",
    )
    .unwrap();
    let audit_path = dir.path().join("decisions.jsonl");

    let config = BudgetConfig::load(&config_path).unwrap();
    assert_eq!(config.max_files, 2);
    assert_eq!(config.max_complexity_increase, 10);

    let trail = Arc::new(JsonlTrail::open(&audit_path).unwrap());
    let gov = UnifiedGovernance::builder()
        .policy(Arc::new(TwoPersonRule))
        .semantic(Arc::new(PatternAnalyzer::new().unwrap()))
        .budget(ChangeBudget::new(config))
        .audit(trail.clone())
        .build();
    let ctx = EvaluationContext::new("agent", "platform", "production");

    // Clean edit.
    let clean = Operation::new("bump timeout")
        .with_change(FileChange::new("src/settings.py").with_added(["TIMEOUT = 30"]).with_removed(["TIMEOUT = 10"]));
    let decision = gov.evaluate(&clean, &ctx);
    assert!(decision.allowed, "{}", decision.reason);
    assert_eq!(decision.reason, "No violations");

    // Oversized, spread too wide, and touching VCS metadata.
    let secret_line = "password = 'hunter2'";
    let big: Vec<String> = (0..12).map(|_| secret_line.to_string()).collect();
    let risky = Operation::new("rewrite config")
        .with_change(FileChange::new(".git/config").with_added(big.clone()))
        .with_change(FileChange::new("src/a.py").with_added(["a = 1"]))
        .with_change(FileChange::new("src/b.py").with_added(big));
    let mut denied = gov.evaluate(&risky, &ctx);
    assert!(!denied.allowed);
    assert!(denied.requires_override);
    assert!(denied.violations.len() >= 3);
    assert!(denied.violations.iter().any(|v| v.rule == "forbidden_paths"
        && v.severity == Severity::Critical
        && v.source == ViolationSource::Budget));
    assert!(denied.violations.iter().any(|v| v.rule == "max_files"));
    assert!(denied.reason.starts_with("Denied: "));

    // Wrong code: rejected and untouched.
    let outcome = gov
        .request_override(&risky, &mut denied, "incident 812 rollback", "000000", &ctx)
        .unwrap();
    assert!(matches!(outcome, OverrideOutcome::Rejected { .. }));
    assert!(!denied.allowed);

    // Right code: approved.
    let outcome = gov
        .request_override(&risky, &mut denied, "incident 812 rollback", "424242", &ctx)
        .unwrap();
    match outcome {
        OverrideOutcome::Approved { override_id, expires_at } => {
            assert_eq!(override_id, "ovr-platform");
            assert!(expires_at.is_some());
        }
        other => panic!("expected approval, got {:?}", other),
    }
    assert!(denied.allowed);
    assert_eq!(denied.reason, "Override approved: incident 812 rollback");

    // Trail: two decisions plus one override, chain intact, no code.
    drop(gov);
    let entries = JsonlTrail::read_all(&audit_path).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].allowed);
    assert!(!entries[1].allowed);
    assert!(entries[1].sources.budget >= 3);
    assert_eq!(entries[1].environment, "production");
    assert_eq!(entries[2].kind, AuditKind::Override);
    assert_eq!(entries[2].override_id.as_deref(), Some("ovr-platform"));
    assert!(JsonlTrail::verify_chain(&audit_path).unwrap());

    let raw = fs::read_to_string(&audit_path).unwrap();
    assert!(!raw.contains("hunter2"));
}

#[test]
fn hung_policy_fails_closed_through_timeout() {
    let policy = TimeoutPolicyEvaluator::new(Arc::new(Hung), Duration::from_millis(50));
    let gov = UnifiedGovernance::builder()
        .policy(Arc::new(policy))
        .budget(ChangeBudget::default())
        .build();

    let op = Operation::new("small").with_change(FileChange::new("lib.rs").with_added(["fn f() {}"]));
    let decision = gov.evaluate(&op, &EvaluationContext::default());

    assert!(!decision.allowed);
    assert_eq!(decision.violations.len(), 1);
    assert_eq!(decision.violations[0].rule, "policy_evaluation_failed");
    assert_eq!(decision.violations[0].source, ViolationSource::Config);
    assert!(decision.violations[0].message.contains("timed out"));
}

#[test]
fn engine_is_shared_across_threads() {
    let gov = Arc::new(
        UnifiedGovernance::builder()
            .budget(ChangeBudget::default())
            .build(),
    );
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let gov = Arc::clone(&gov);
            std::thread::spawn(move || {
                let op = Operation::new(format!("edit {}", i))
                    .with_change(FileChange::new(format!("src/m{}.py", i)).with_added(["x = 1"]));
                let ctx = EvaluationContext::new("agent", format!("team-{}", i), "ci");
                gov.evaluate(&op, &ctx).allowed
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }
}

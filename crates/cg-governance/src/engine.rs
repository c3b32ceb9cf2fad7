// engine.rs - UnifiedGovernance: one fail-closed verdict from three evaluators.
//
// Stages run in a fixed order: semantic scan, policy, budget. Each stage is
// optional and each is isolated: an error or panic in one becomes data, not
// a crash. Policy and budget failures deny; semantic failures are ignored.

use std::sync::Arc;
use std::time::Instant;

use cg_audit::{AuditEntry, AuditTrail};
use cg_changeset::{Operation, Severity, Violation, ViolationSource};
use chrono::Utc;
use uuid::Uuid;

use crate::context::EvaluationContext;
use crate::decision::{GovernanceDecision, OverrideOutcome, StageOutcome};
use crate::error::GovernanceError;
use crate::evaluator::{
    guarded, BudgetEvaluator, OverrideRequest, PolicyEvaluator, PolicyInput, PolicyVerdict,
};
use crate::semantic::{self, SemanticAnalyzer};

/// Builds a [`UnifiedGovernance`]. Every collaborator is optional.
#[derive(Default)]
pub struct GovernanceBuilder {
    policy: Option<Arc<dyn PolicyEvaluator>>,
    semantic: Option<Arc<dyn SemanticAnalyzer>>,
    budget: Option<Arc<dyn BudgetEvaluator>>,
    audit: Option<Arc<dyn AuditTrail>>,
}

impl GovernanceBuilder {
    pub fn policy(mut self, policy: Arc<dyn PolicyEvaluator>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn semantic(mut self, semantic: Arc<dyn SemanticAnalyzer>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    /// Usually a [`ChangeBudget`](cg_budget::ChangeBudget).
    pub fn budget(mut self, budget: impl BudgetEvaluator + 'static) -> Self {
        self.budget = Some(Arc::new(budget));
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditTrail>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn build(self) -> UnifiedGovernance {
        UnifiedGovernance {
            policy: self.policy,
            semantic: self.semantic,
            budget: self.budget,
            audit: self.audit,
        }
    }
}

/// The governance decision engine. Cheap to share behind an `Arc`.
pub struct UnifiedGovernance {
    policy: Option<Arc<dyn PolicyEvaluator>>,
    semantic: Option<Arc<dyn SemanticAnalyzer>>,
    budget: Option<Arc<dyn BudgetEvaluator>>,
    audit: Option<Arc<dyn AuditTrail>>,
}

impl UnifiedGovernance {
    pub fn builder() -> GovernanceBuilder {
        GovernanceBuilder::default()
    }

    /// Evaluate an operation.
    ///
    /// Never fails: a malformed operation is denied with one config
    /// violation, the same way a failing stage is.
    pub fn evaluate(&self, operation: &Operation, context: &EvaluationContext) -> GovernanceDecision {
        match self.try_evaluate(operation, context) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed operation");
                let decision = GovernanceDecision::rejected(Violation::evaluator_failure("input", e));
                self.record_decision(operation, &decision, context);
                decision
            }
        }
    }

    /// Evaluate an operation, returning `InvalidInput` for a malformed one
    /// before any evaluator runs.
    pub fn try_evaluate(
        &self,
        operation: &Operation,
        context: &EvaluationContext,
    ) -> Result<GovernanceDecision, GovernanceError> {
        operation.validate()?;
        let started = Instant::now();

        let inputs = PolicyInput::all_from(operation, context);

        let semantic = match &self.semantic {
            Some(analyzer) => semantic::scan(analyzer.as_ref(), &inputs),
            None => Vec::new(),
        };
        tracing::debug!(findings = semantic.len(), "semantic stage finished");

        let policy = match &self.policy {
            Some(policy) => run_policy(policy.as_ref(), &inputs).into_violations("policy"),
            None => Vec::new(),
        };
        tracing::debug!(violations = policy.len(), "policy stage finished");

        let budget = match &self.budget {
            Some(budget) => run_budget(budget.as_ref(), operation).into_violations("budget"),
            None => Vec::new(),
        };
        tracing::debug!(violations = budget.len(), "budget stage finished");

        let mut decision = GovernanceDecision::from_stages(semantic, policy, budget);
        decision.evaluation_time_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            allowed = decision.allowed,
            violations = decision.violations.len(),
            files = operation.file_count(),
            elapsed_ms = decision.evaluation_time_ms,
            "governance decision"
        );

        self.record_decision(operation, &decision, context);
        Ok(decision)
    }

    /// Ask the policy evaluator to approve a human override of a denied
    /// decision.
    ///
    /// On approval `decision` is flipped to allowed and an override entry is
    /// audited. On rejection or failure `decision` is left untouched.
    pub fn request_override(
        &self,
        operation: &Operation,
        decision: &mut GovernanceDecision,
        justification: &str,
        human_code: &str,
        context: &EvaluationContext,
    ) -> Result<OverrideOutcome, GovernanceError> {
        if justification.trim().is_empty() {
            return Err(GovernanceError::InvalidInput(
                "override justification must not be empty".to_string(),
            ));
        }
        if human_code.trim().is_empty() {
            return Err(GovernanceError::InvalidInput(
                "override human code must not be empty".to_string(),
            ));
        }
        operation.validate()?;

        if decision.allowed {
            return Ok(OverrideOutcome::NotRequired);
        }
        let policy = self
            .policy
            .as_ref()
            .ok_or(GovernanceError::OverrideUnavailable)?;

        let request = OverrideRequest {
            operation: operation.clone(),
            violations: decision.violations.clone(),
            reason: decision.reason.clone(),
            justification: justification.to_string(),
            human_code: human_code.to_string(),
            context: context.clone(),
        };
        let response = guarded(|| policy.request_override(&request)).map_err(|e| {
            tracing::warn!(error = %e, "override request failed; decision stays denied");
            GovernanceError::OverrideFailed(e)
        })?;

        if !response.approved {
            let reason = response
                .reason
                .unwrap_or_else(|| "override rejected by policy evaluator".to_string());
            tracing::info!(reason = %reason, "override rejected");
            return Ok(OverrideOutcome::Rejected { reason });
        }
        if let Some(expires_at) = response.expires_at {
            if expires_at <= Utc::now() {
                tracing::warn!(%expires_at, "override approval already expired");
                return Ok(OverrideOutcome::Rejected {
                    reason: format!("override approval expired at {}", expires_at),
                });
            }
        }

        let override_id = response
            .override_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        decision.allowed = true;
        decision.requires_override = false;
        decision.override_id = Some(override_id.clone());
        decision.expires_at = response.expires_at;
        decision.reason = format!("Override approved: {}", justification);

        tracing::info!(
            override_id = %override_id,
            violations = decision.violations.len(),
            "override approved"
        );

        if let Some(audit) = &self.audit {
            let entry = AuditEntry::override_granted(override_id.clone(), decision.reason.clone())
                .with_violations(&decision.violations)
                .with_requester(&context.user_role, &context.team, &context.environment)
                .with_operation_hash(operation.fingerprint());
            if let Err(e) = audit.record(entry) {
                tracing::warn!(error = %e, "failed to record override audit entry");
            }
        }

        Ok(OverrideOutcome::Approved {
            override_id,
            expires_at: decision.expires_at,
        })
    }

    /// The `limit` most recent audit entries, oldest first. Empty when no
    /// trail is configured.
    pub fn decision_history(&self, limit: usize) -> Result<Vec<AuditEntry>, GovernanceError> {
        match &self.audit {
            Some(audit) => Ok(audit.recent(limit)?),
            None => Ok(Vec::new()),
        }
    }

    fn record_decision(
        &self,
        operation: &Operation,
        decision: &GovernanceDecision,
        context: &EvaluationContext,
    ) {
        let Some(audit) = &self.audit else {
            return;
        };
        let entry = AuditEntry::decision(decision.allowed, decision.reason.clone())
            .with_violations(&decision.violations)
            .with_requester(&context.user_role, &context.team, &context.environment)
            .with_operation_hash(operation.fingerprint());
        if let Err(e) = audit.record(entry) {
            tracing::warn!(error = %e, "failed to record audit entry");
        }
    }
}

fn run_policy(policy: &dyn PolicyEvaluator, inputs: &[PolicyInput]) -> StageOutcome {
    let mut violations = Vec::new();
    for input in inputs {
        match guarded(|| policy.evaluate(input)) {
            Ok(verdict) => violations.extend(verdict_violations(verdict, &input.file_path)),
            Err(e) => return StageOutcome::Failed(e.to_string()),
        }
    }
    StageOutcome::Completed(violations)
}

fn verdict_violations(verdict: PolicyVerdict, file_path: &str) -> Vec<Violation> {
    if !verdict.allowed && verdict.violations.is_empty() {
        return vec![Violation::new(
            "policy_denied",
            Severity::High,
            format!("Policy denied changes to '{}'", file_path),
            ViolationSource::Policy,
        )
        .with_file(file_path)];
    }
    verdict
        .violations
        .into_iter()
        .map(|pv| {
            let severity = pv.severity.parse().unwrap_or_else(|_| {
                tracing::debug!(severity = %pv.severity, policy = %pv.policy_name, "unknown severity; treating as high");
                Severity::High
            });
            Violation::new(pv.policy_name, severity, pv.message, ViolationSource::Policy)
                .with_file(file_path)
        })
        .collect()
}

fn run_budget(budget: &dyn BudgetEvaluator, operation: &Operation) -> StageOutcome {
    match guarded(|| budget.evaluate_budget(operation)) {
        Ok(violations) => StageOutcome::Completed(violations),
        Err(e) => StageOutcome::Failed(e.to_string()),
    }
}

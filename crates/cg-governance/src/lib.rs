//! # cg-governance
//!
//! The governance decision engine for agent-proposed code changes.
//!
//! [`UnifiedGovernance`] runs an [`Operation`](cg_changeset::Operation)
//! through up to three independent evaluators and folds their findings into
//! one verdict:
//!
//! 1. a semantic security scan ([`SemanticAnalyzer`]), advisory only,
//! 2. a declarative policy evaluator ([`PolicyEvaluator`]),
//! 3. a quantitative change budget ([`ChangeBudget`](cg_budget::ChangeBudget)).
//!
//! ## Key invariants
//!
//! - **Fail closed**: a policy or budget stage that errors or panics becomes
//!   one critical `config` violation, which denies.
//! - **Semantic scan is advisory**: its failures are swallowed, and a medium
//!   semantic finding alone never denies.
//! - **Overrides never grant silently**: a failed override request leaves the
//!   decision denied.
//! - **Audit never blocks**: a failing audit sink is logged, not raised.

pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod semantic;

pub use context::EvaluationContext;
pub use decision::{GovernanceDecision, OverrideOutcome, StageOutcome};
pub use engine::{GovernanceBuilder, UnifiedGovernance};
pub use error::{EvaluatorError, GovernanceError};
pub use evaluator::{
    BudgetEvaluator, OverrideRequest, OverrideResponse, PolicyEvaluator, PolicyInput, PolicyVerdict,
    PolicyViolation, TimeoutPolicyEvaluator,
};
pub use semantic::{PatternAnalyzer, SemanticAnalyzer};

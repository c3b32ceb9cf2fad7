// error.rs - Error types for the governance engine and its collaborators.

use thiserror::Error;

/// Failures reported by an external evaluator (policy engine, analyzer).
///
/// The engine never propagates these out of `evaluate()`; they are turned
/// into violations at the stage boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluatorError {
    /// The evaluator ran and failed (bad policy source, I/O, parse crash).
    #[error("evaluator failed: {0}")]
    Failed(String),

    /// The evaluator did not answer in time.
    #[error("evaluator timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// The evaluator panicked.
    #[error("evaluator panicked: {0}")]
    Panicked(String),

    /// The evaluator does not implement the requested capability.
    #[error("evaluator does not support {0}")]
    Unsupported(String),
}

/// Errors returned to callers of the governance API.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Malformed caller input, rejected before any evaluator runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No policy evaluator is configured to resolve overrides.
    #[error("no policy evaluator configured; overrides are unavailable")]
    OverrideUnavailable,

    /// The override could not be resolved. The decision was left untouched.
    #[error("override request failed: {0}")]
    OverrideFailed(#[from] EvaluatorError),

    /// Reading the audit trail failed.
    #[error("audit trail error: {0}")]
    Audit(#[from] cg_audit::AuditError),
}

impl From<cg_changeset::ChangeSetError> for GovernanceError {
    fn from(e: cg_changeset::ChangeSetError) -> Self {
        GovernanceError::InvalidInput(e.to_string())
    }
}

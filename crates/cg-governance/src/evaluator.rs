// evaluator.rs - The declarative policy evaluator seam.
//
// The policy language and its engine live outside this crate. The engine
// only needs two things from them: a verdict for one canonical input, and a
// way to resolve a human override request. Both may fail; the orchestrator
// decides what a failure means (deny), not the evaluator.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use cg_budget::ChangeBudget;
use cg_changeset::{FileChange, Operation, OperationKind, SourceLanguage, Violation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

/// The canonical view of one file change handed to the policy and semantic
/// stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyInput {
    #[serde(rename = "type")]
    pub operation_type: OperationKind,
    pub code: String,
    pub language: SourceLanguage,
    pub file_path: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl PolicyInput {
    /// Normalize one file change of `operation`.
    pub fn from_change(
        operation: &Operation,
        change: &FileChange,
        context: &EvaluationContext,
    ) -> Self {
        Self {
            operation_type: operation.kind,
            code: change.scan_text(),
            language: change.language(),
            file_path: change.file_path.clone(),
            metadata: context.to_metadata(&operation.description),
        }
    }

    /// One input per file change, in operation order.
    pub fn all_from(operation: &Operation, context: &EvaluationContext) -> Vec<Self> {
        operation
            .changes
            .iter()
            .map(|change| Self::from_change(operation, change, context))
            .collect()
    }
}

/// A single finding reported by the policy evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyViolation {
    pub policy_name: String,
    /// Free-form label; parsed case-insensitively by the engine.
    pub severity: String,
    pub message: String,
}

/// The evaluator's answer for one input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyVerdict {
    pub allowed: bool,
    #[serde(default)]
    pub violations: Vec<PolicyViolation>,
}

impl PolicyVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            violations: Vec::new(),
        }
    }

    pub fn deny(violations: Vec<PolicyViolation>) -> Self {
        Self {
            allowed: false,
            violations,
        }
    }
}

/// Everything an evaluator needs to decide on a human override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub operation: Operation,
    /// The violations that caused the denial.
    pub violations: Vec<Violation>,
    pub reason: String,
    pub justification: String,
    /// Code supplied by the approving human (e.g. a one-time token).
    pub human_code: String,
    pub context: EvaluationContext,
}

/// The evaluator's answer to an override request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverrideResponse {
    pub approved: bool,
    #[serde(default)]
    pub override_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Why an override was rejected, when the evaluator says.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A declarative policy evaluator.
pub trait PolicyEvaluator: Send + Sync {
    /// Evaluate one canonical input.
    fn evaluate(&self, input: &PolicyInput) -> Result<PolicyVerdict, EvaluatorError>;

    /// Resolve a human override request for a denied operation.
    fn request_override(&self, request: &OverrideRequest) -> Result<OverrideResponse, EvaluatorError> {
        let _ = request;
        Err(EvaluatorError::Unsupported("override requests".to_string()))
    }
}

/// The quantitative budget stage.
pub trait BudgetEvaluator: Send + Sync {
    /// Every budget violation of `operation`, in rule order.
    fn evaluate_budget(&self, operation: &Operation) -> Result<Vec<Violation>, EvaluatorError>;
}

impl BudgetEvaluator for ChangeBudget {
    fn evaluate_budget(&self, operation: &Operation) -> Result<Vec<Violation>, EvaluatorError> {
        Ok(self.validate_operation(operation).violations)
    }
}

/// Run `f`, turning a panic into `EvaluatorError::Panicked`.
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T, EvaluatorError>) -> Result<T, EvaluatorError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(EvaluatorError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Bounds how long a policy evaluator may take.
///
/// Each call runs on a worker thread. If no answer arrives within the
/// timeout the call fails with `EvaluatorError::Timeout`; the worker is left
/// to finish on its own and its late answer is discarded.
pub struct TimeoutPolicyEvaluator {
    inner: Arc<dyn PolicyEvaluator>,
    timeout: Duration,
}

impl TimeoutPolicyEvaluator {
    pub fn new(inner: Arc<dyn PolicyEvaluator>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    fn run<T, F>(&self, call: F) -> Result<T, EvaluatorError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn PolicyEvaluator) -> Result<T, EvaluatorError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        std::thread::Builder::new()
            .name("cg-policy-eval".to_string())
            .spawn(move || {
                let result = guarded(|| call(inner.as_ref()));
                // The receiver may already have given up.
                let _ = tx.send(result);
            })
            .map_err(|e| EvaluatorError::Failed(format!("failed to spawn evaluator thread: {}", e)))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(EvaluatorError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EvaluatorError::Failed(
                "evaluator thread exited without an answer".to_string(),
            )),
        }
    }
}

impl PolicyEvaluator for TimeoutPolicyEvaluator {
    fn evaluate(&self, input: &PolicyInput) -> Result<PolicyVerdict, EvaluatorError> {
        let input = input.clone();
        self.run(move |inner| inner.evaluate(&input))
    }

    fn request_override(&self, request: &OverrideRequest) -> Result<OverrideResponse, EvaluatorError> {
        let request = request.clone();
        self.run(move |inner| inner.request_override(&request))
    }
}

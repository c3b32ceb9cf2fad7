//! # cg-changeset
//!
//! The shared vocabulary of Change Gate.
//!
//! An [`Operation`] is one atomic, prospective change-set proposed by an
//! agent: an ordered list of [`FileChange`]s plus a description. Every
//! evaluator (budget, policy, semantic scan) reports what it found as
//! [`Violation`]s, and [`deny_threshold_met`] is the single rule that turns a
//! list of violations into allow or deny.

pub mod change;
pub mod error;
pub mod violation;

pub use change::{FileChange, Operation, OperationKind, SourceLanguage};
pub use error::ChangeSetError;
pub use violation::{deny_threshold_met, Severity, Violation, ViolationSource};

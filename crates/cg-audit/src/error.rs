// error.rs - Error types for the audit trail.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during audit operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the audit log file.
    #[error("failed to open audit log at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write an entry to the log.
    #[error("failed to append entry: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to serialize or deserialize an entry (malformed JSON).
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The audit log has been tampered with; the hash chain is broken.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },

    /// A writer panicked while holding the trail lock.
    #[error("audit trail lock poisoned")]
    LockPoisoned,
}

// error.rs - Error types for the change-set data model.

use thiserror::Error;

/// Errors raised while building or decoding operations.
#[derive(Debug, Error)]
pub enum ChangeSetError {
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A file change without a path cannot be evaluated.
    #[error("file change #{index} has an empty file_path")]
    EmptyFilePath { index: usize },

    /// An unrecognized severity label.
    #[error("unknown severity '{0}'")]
    UnknownSeverity(String),
}

// error.rs - Error types for budget configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a budget configuration.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// The configuration file exists but could not be read.
    #[error("failed to read budget config at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration document is malformed.
    #[error("invalid budget config at {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

// config.rs - Budget limits and their on-disk form.
//
// A budget file is YAML, TOML or JSON (picked by extension) holding either
// the limits directly or under `budgets.default`:
//
//   budgets:
//     default:
//       max_files: 5
//       max_lines_per_file: 100
//       forbidden_paths: [".git/", "node_modules/"]
//
// Keys that are absent take their built-in defaults. A missing file means
// the built-in defaults apply wholesale.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BudgetError;

/// Quantitative limits for a single operation. Loaded once, then read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BudgetConfig {
    /// Maximum number of files one operation may touch.
    pub max_files: u64,

    /// Maximum added + removed lines in any single file.
    pub max_lines_per_file: u64,

    /// Maximum added + removed lines across the whole operation.
    pub max_total_lines: u64,

    /// Maximum complexity a single file may gain.
    pub max_complexity_increase: u64,

    /// Glob patterns a file must match. Empty means no restriction.
    pub allowed_file_patterns: Vec<String>,

    /// Path fragments that may never be touched.
    pub forbidden_paths: Vec<String>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_files: 5,
            max_lines_per_file: 100,
            max_total_lines: 300,
            max_complexity_increase: 10,
            allowed_file_patterns: Vec::new(),
            forbidden_paths: default_forbidden_paths(),
        }
    }
}

fn default_forbidden_paths() -> Vec<String> {
    [
        ".git/",
        "node_modules/",
        "__pycache__/",
        ".venv/",
        ".mypy_cache/",
        ".pytest_cache/",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl BudgetConfig {
    /// Load a budget file. The format is picked from the extension
    /// (`.toml`, `.json`, anything else is read as YAML).
    pub fn load(path: &Path) -> Result<Self, BudgetError> {
        let content = std::fs::read_to_string(path).map_err(|source| BudgetError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let invalid = |reason: String| BudgetError::InvalidConfig {
            path: path.to_path_buf(),
            reason,
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let document: serde_json::Value = match ext.as_deref() {
            Some("toml") => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
        };

        Self::from_document(document).map_err(invalid)
    }

    /// Load the file if it exists, otherwise use the built-in defaults.
    ///
    /// A file that exists but is malformed is still an error: silently
    /// falling back would loosen limits the operator meant to tighten.
    pub fn load_or_default(path: &Path) -> Result<Self, BudgetError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no budget config; using defaults");
            Ok(Self::default())
        }
    }

    /// Build a config from an already-parsed document (flat or nested
    /// under `budgets.default`).
    pub fn from_document(document: serde_json::Value) -> Result<Self, String> {
        let section = match document.pointer("/budgets/default") {
            Some(nested) => nested.clone(),
            None => document,
        };
        match section {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::Object(_) => {
                serde_json::from_value(section).map_err(|e| e.to_string())
            }
            other => Err(format!("expected a mapping of budget limits, found {}", other)),
        }
    }
}

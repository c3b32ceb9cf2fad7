// mod.rs - Subcommands and the per-project file layout they share.

pub mod budget;
pub mod evaluate;
pub mod history;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cg_changeset::Operation;

/// Where a project keeps its governance files.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub budget_config: PathBuf,
    pub audit_log: PathBuf,
}

impl ProjectPaths {
    pub fn for_project(root: &Path) -> Self {
        let dir = root.join(".cg");
        Self {
            budget_config: dir.join("budget.yaml"),
            audit_log: dir.join("decisions.jsonl"),
        }
    }

    pub fn budget_config_or(&self, explicit: Option<&Path>) -> PathBuf {
        explicit.map(Path::to_path_buf).unwrap_or_else(|| self.budget_config.clone())
    }

    pub fn audit_log_or(&self, explicit: Option<&Path>) -> PathBuf {
        explicit.map(Path::to_path_buf).unwrap_or_else(|| self.audit_log.clone())
    }
}

/// Read and validate an operation from a JSON file.
pub fn load_operation(path: &Path) -> anyhow::Result<Operation> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read operation file {}", path.display()))?;
    let operation = Operation::from_json(&raw)
        .with_context(|| format!("failed to parse operation file {}", path.display()))?;
    operation
        .validate()
        .with_context(|| format!("invalid operation in {}", path.display()))?;
    Ok(operation)
}

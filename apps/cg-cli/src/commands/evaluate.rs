// evaluate.rs - Run one operation through the full governance engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cg_audit::JsonlTrail;
use cg_budget::{BudgetConfig, ChangeBudget};
use cg_governance::{EvaluationContext, GovernanceDecision, PatternAnalyzer, UnifiedGovernance};
use clap::Args;

use super::{load_operation, ProjectPaths};

#[derive(Args)]
pub struct EvaluateArgs {
    /// Operation JSON file.
    #[arg(long)]
    pub operation: PathBuf,
    /// Budget config (YAML, TOML or JSON). Defaults to .cg/budget.yaml.
    #[arg(long)]
    pub budget: Option<PathBuf>,
    /// Audit trail to append to. Defaults to .cg/decisions.jsonl.
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
    #[arg(long, default_value = "agent")]
    pub role: String,
    #[arg(long, default_value = "default")]
    pub team: String,
    #[arg(long, default_value = "development")]
    pub environment: String,
    /// Feature tier of the caller.
    #[arg(long, default_value = "community")]
    pub tier: String,
}

pub fn execute(args: &EvaluateArgs, paths: &ProjectPaths) -> anyhow::Result<()> {
    let decision = run(args, paths)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    if !decision.allowed {
        anyhow::bail!("{}", decision.reason);
    }
    Ok(())
}

/// Evaluate and record, returning the decision.
pub fn run(args: &EvaluateArgs, paths: &ProjectPaths) -> anyhow::Result<GovernanceDecision> {
    let operation = load_operation(&args.operation)?;

    let budget_path = paths.budget_config_or(args.budget.as_deref());
    let config = BudgetConfig::load_or_default(&budget_path)?;
    tracing::debug!(budget = %budget_path.display(), "budget config loaded");

    let audit_path = paths.audit_log_or(args.audit_log.as_deref());
    ensure_parent(&audit_path)?;
    let trail = JsonlTrail::open(&audit_path)?;

    let governance = UnifiedGovernance::builder()
        .semantic(Arc::new(PatternAnalyzer::new()?))
        .budget(ChangeBudget::new(config))
        .audit(Arc::new(trail))
        .build();

    let context = EvaluationContext::new(&args.role, &args.team, &args.environment)
        .with_tier(&args.tier);
    let decision = governance.evaluate(&operation, &context);
    tracing::info!(
        allowed = decision.allowed,
        violations = decision.violations.len(),
        audit_log = %audit_path.display(),
        "decision recorded"
    );
    Ok(decision)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

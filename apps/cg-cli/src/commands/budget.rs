// budget.rs - Check an operation against the change budget only.

use std::path::PathBuf;

use cg_budget::{BudgetConfig, BudgetDecision, ChangeBudget};
use clap::Args;

use super::{load_operation, ProjectPaths};

#[derive(Args)]
pub struct BudgetArgs {
    /// Operation JSON file.
    #[arg(long)]
    pub operation: PathBuf,
    /// Budget config (YAML, TOML or JSON). Defaults to .cg/budget.yaml.
    #[arg(long)]
    pub budget: Option<PathBuf>,
}

pub fn execute(args: &BudgetArgs, paths: &ProjectPaths) -> anyhow::Result<()> {
    let decision = check(args, paths)?;
    println!("{}", decision.error_message());
    if !decision.allowed {
        anyhow::bail!("operation exceeds budget ({} violation(s))", decision.violations.len());
    }
    Ok(())
}

pub fn check(args: &BudgetArgs, paths: &ProjectPaths) -> anyhow::Result<BudgetDecision> {
    let operation = load_operation(&args.operation)?;
    let config = BudgetConfig::load_or_default(&paths.budget_config_or(args.budget.as_deref()))?;
    Ok(ChangeBudget::new(config).validate_operation(&operation))
}

//! # cg-budget
//!
//! Quantitative "blast radius" limits for agent-proposed change-sets.
//!
//! A [`ChangeBudget`] checks an [`Operation`](cg_changeset::Operation)
//! against a [`BudgetConfig`]: how many files it touches, how many lines it
//! changes per file and in total, whether it strays outside the allowed file
//! patterns or into forbidden paths, and how much structural complexity it
//! adds. Every rule is evaluated independently so a single call reports
//! every problem at once.
//!
//! ## Key invariants
//!
//! - **Inclusive limits**: a value equal to its limit is allowed.
//! - **Empty is fine**: an operation with no file changes is always allowed.
//! - **No code in messages**: reports carry counts and paths only.

pub mod budget;
pub mod complexity;
pub mod config;
pub mod error;
pub mod pattern;

pub use budget::{BudgetDecision, ChangeBudget};
pub use complexity::{complexity_delta, measure_complexity, measure_complexity_for};
pub use config::BudgetConfig;
pub use error::BudgetError;
pub use pattern::{matches_allowed_pattern, matches_forbidden_path, PatternSet};

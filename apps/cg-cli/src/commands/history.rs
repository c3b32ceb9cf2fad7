// history.rs - Audit trail inspection: tail and verify.

use std::path::Path;

use cg_audit::{AuditEntry, AuditError, AuditKind, JsonlTrail};

pub fn tail(path: &Path, n: usize) -> anyhow::Result<()> {
    if !path.exists() {
        println!("No audit trail found at {}", path.display());
        return Ok(());
    }

    let entries = JsonlTrail::read_all(path)?;
    let start = entries.len().saturating_sub(n);
    let recent = &entries[start..];

    if recent.is_empty() {
        println!("No decisions recorded.");
        return Ok(());
    }

    println!(
        "{:<20} {:<9} {:<7} {:<5} {:<14} REASON",
        "TIMESTAMP", "KIND", "RESULT", "VIOL", "TEAM"
    );
    println!("{}", "-".repeat(80));
    for entry in recent {
        println!("{}", format_row(entry));
    }
    Ok(())
}

fn format_row(entry: &AuditEntry) -> String {
    let kind = match entry.kind {
        AuditKind::Decision => "decision",
        AuditKind::Override => "override",
    };
    format!(
        "{:<20} {:<9} {:<7} {:<5} {:<14} {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        kind,
        if entry.allowed { "allow" } else { "deny" },
        entry.violation_count,
        entry.team,
        entry.reason,
    )
}

pub fn verify(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!("No audit trail found at {}", path.display());
        return Ok(());
    }

    tracing::debug!(path = %path.display(), "verifying decision trail");
    match JsonlTrail::verify_chain(path) {
        Ok(_) => {
            let entries = JsonlTrail::read_all(path)?;
            println!(
                "Audit trail verified: {} entr{}, hash chain intact.",
                entries.len(),
                if entries.len() == 1 { "y" } else { "ies" }
            );
            Ok(())
        }
        Err(AuditError::IntegrityViolation {
            line,
            expected,
            actual,
        }) => {
            println!("INTEGRITY VIOLATION at line {}:", line);
            println!("  Expected previous_hash: {}", expected);
            println!("  Actual previous_hash:   {}", actual);
            anyhow::bail!("audit trail integrity check failed")
        }
        Err(e) => Err(e.into()),
    }
}

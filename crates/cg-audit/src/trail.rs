// trail.rs - The audit sink abstraction and an in-memory implementation.
//
// Trails are shared across threads by the governance engine, so every
// implementation serializes its own appends.

use std::sync::Mutex;

use crate::entry::AuditEntry;
use crate::error::AuditError;

/// An append-only sink for audit entries.
pub trait AuditTrail: Send + Sync {
    /// Append one entry. Entries are never modified once recorded.
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;

    /// The `limit` most recent entries, oldest first.
    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Keeps entries in process memory. Useful for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryTrail {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditTrail for MemoryTrail {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self.entries.lock().map_err(|_| AuditError::LockPoisoned)?;
        entries.push(entry);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self.entries.lock().map_err(|_| AuditError::LockPoisoned)?;
        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..].to_vec())
    }
}

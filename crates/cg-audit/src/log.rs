// log.rs - Append-only JSONL decision trail.
//
// One JSON object per line, one line per decision. Each entry's
// `previous_hash` holds the SHA-256 of the preceding raw line, so inserting,
// deleting or editing a line breaks the chain and `verify_chain()` reports
// where.
//
// Appends are serialized with a mutex and flushed immediately, so several
// threads can share one trail.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::hasher;
use crate::trail::AuditTrail;

struct Writer {
    out: BufWriter<File>,
    /// Hash of the last line written, used to chain the next entry.
    last_hash: Option<String>,
}

/// A hash-chained audit trail backed by a JSONL file.
pub struct JsonlTrail {
    path: PathBuf,
    writer: Mutex<Writer>,
}

impl JsonlTrail {
    /// Open (or create) a trail at the given path.
    ///
    /// An existing file is scanned for its last line so new entries continue
    /// the chain instead of starting a second one.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        let last_hash = if path.exists() {
            Self::lines(&path)?.last().map(|line| hasher::hash_str(line))
        } else {
            None
        };
        tracing::debug!(
            path = %path.display(),
            resumed = last_hash.is_some(),
            "opening decision trail"
        );

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            writer: Mutex::new(Writer {
                out: BufWriter::new(file),
                last_hash,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry in a trail file, oldest first.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
        Self::lines(path.as_ref())?
            .iter()
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }

    /// Walk the trail and check that each entry points at the line before it.
    ///
    /// Returns `Ok(true)` when intact, or `IntegrityViolation` naming the
    /// first (1-based, blank lines skipped) line that breaks the chain.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<bool, AuditError> {
        let mut expected: Option<String> = None;

        for (index, line) in Self::lines(path.as_ref())?.iter().enumerate() {
            let entry: AuditEntry = serde_json::from_str(line)?;
            if entry.previous_hash != expected {
                tracing::warn!(line = index + 1, "decision trail chain broken");
                return Err(AuditError::IntegrityViolation {
                    line: index + 1,
                    expected: expected.unwrap_or_else(|| "None".to_string()),
                    actual: entry.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }
            // The chain covers the bytes on disk, not a re-serialization,
            // so field order or whitespace edits are caught too.
            expected = Some(hasher::hash_str(line));
        }

        Ok(true)
    }

    /// Non-blank lines of a trail file.
    fn lines(path: &Path) -> Result<Vec<String>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

impl AuditTrail for JsonlTrail {
    fn record(&self, mut entry: AuditEntry) -> Result<(), AuditError> {
        let mut writer = self.writer.lock().map_err(|_| AuditError::LockPoisoned)?;

        entry.previous_hash = writer.last_hash.clone();
        let json = serde_json::to_string(&entry)?;

        writeln!(writer.out, "{}", json)?;
        writer.out.flush()?;
        // Only advance the chain once the line is durably written.
        writer.last_hash = Some(hasher::hash_str(&json));
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        // Hold the lock so a concurrent append cannot leave a partial line.
        let _guard = self.writer.lock().map_err(|_| AuditError::LockPoisoned)?;
        let entries = Self::read_all(&self.path)?;
        let start = entries.len().saturating_sub(limit);
        Ok(entries[start..].to_vec())
    }
}

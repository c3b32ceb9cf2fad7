//! # cg-audit
//!
//! Append-only audit trail for governance decisions.
//!
//! Every decision and every approved override is recorded as an
//! [`AuditEntry`]. Entries are write-once: a trail only ever appends.
//! [`JsonlTrail`] stores one JSON object per line and links each entry to
//! the previous one with a SHA-256 hash so tampering can be detected.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use cg_audit::{AuditEntry, AuditTrail, JsonlTrail};
//!
//! let trail = JsonlTrail::open("/tmp/decisions.jsonl").unwrap();
//! trail
//!     .record(AuditEntry::decision(false, "Denied: 1 critical violation(s)"))
//!     .unwrap();
//! ```

pub mod entry;
pub mod error;
pub mod hasher;
pub mod log;
pub mod trail;

pub use entry::{AuditEntry, AuditKind, SourceCounts};
pub use error::AuditError;
pub use log::JsonlTrail;
pub use trail::{AuditTrail, MemoryTrail};

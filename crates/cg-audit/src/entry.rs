// entry.rs - Audit entry data model.
//
// One entry per governance decision or approved override. Entries carry
// counts and the requester's context, never the code under review.

use cg_changeset::{Violation, ViolationSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of event an entry records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// `evaluate()` produced a decision.
    Decision,
    /// A human override was approved for a denied decision.
    Override,
}

/// Violation counts broken down by the evaluator that raised them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCounts {
    pub policy: usize,
    pub budget: usize,
    pub semantic: usize,
    #[serde(default)]
    pub config: usize,
}

impl SourceCounts {
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut counts = Self::default();
        for v in violations {
            match v.source {
                ViolationSource::Policy => counts.policy += 1,
                ViolationSource::Budget => counts.budget += 1,
                ViolationSource::Semantic => counts.semantic += 1,
                ViolationSource::Config => counts.config += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.policy + self.budget + self.semantic + self.config
    }
}

/// A single audit entry, one line in the JSONL trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub entry_id: Uuid,

    /// When the decision was made (UTC).
    pub timestamp: DateTime<Utc>,

    pub kind: AuditKind,

    pub allowed: bool,

    /// The decision's one-line reason.
    pub reason: String,

    pub violation_count: usize,

    pub sources: SourceCounts,

    pub user_role: String,

    pub team: String,

    pub environment: String,

    /// Set on override entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_id: Option<String>,

    /// Content-free fingerprint of the evaluated operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_hash: Option<String>,

    /// Hash of the previous entry in a chained trail. Set by the trail.
    #[serde(default)]
    pub previous_hash: Option<String>,
}

impl AuditEntry {
    /// A decision entry with the current timestamp and no requester yet.
    pub fn decision(allowed: bool, reason: impl Into<String>) -> Self {
        Self::new(AuditKind::Decision, allowed, reason)
    }

    /// An override entry. Overrides always record an allowed outcome.
    pub fn override_granted(override_id: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut entry = Self::new(AuditKind::Override, true, reason);
        entry.override_id = Some(override_id.into());
        entry
    }

    fn new(kind: AuditKind, allowed: bool, reason: impl Into<String>) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            allowed,
            reason: reason.into(),
            violation_count: 0,
            sources: SourceCounts::default(),
            user_role: String::new(),
            team: String::new(),
            environment: String::new(),
            override_id: None,
            operation_hash: None,
            previous_hash: None,
        }
    }

    /// Record per-source counts for the given violations and return self.
    pub fn with_violations(mut self, violations: &[Violation]) -> Self {
        self.sources = SourceCounts::from_violations(violations);
        self.violation_count = violations.len();
        self
    }

    /// Record who asked for the decision and return self.
    pub fn with_requester(
        mut self,
        user_role: impl Into<String>,
        team: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        self.user_role = user_role.into();
        self.team = team.into();
        self.environment = environment.into();
        self
    }

    pub fn with_operation_hash(mut self, hash: impl Into<String>) -> Self {
        self.operation_hash = Some(hash.into());
        self
    }
}

// change.rs - Prospective file changes and the operation that groups them.
//
// An Operation is the one canonical shape every evaluator receives. Callers
// build it themselves (from a patch engine, a rename, an MCP request) rather
// than handing the engine a loosely-typed map to sniff.
//
// Values are built fresh per evaluation and never mutated afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ChangeSetError;

/// A prospective change to a single file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    /// Workspace-relative path of the file being changed.
    pub file_path: String,

    /// Lines the change adds, in order.
    #[serde(default)]
    pub added_lines: Vec<String>,

    /// Lines the change removes, in order.
    #[serde(default)]
    pub removed_lines: Vec<String>,

    /// Full source before the change. Only used for the complexity delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_code: Option<String>,

    /// Full source after the change. Only used for the complexity delta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_code: Option<String>,
}

impl FileChange {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// Set the added lines and return self (builder pattern).
    pub fn with_added<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.added_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set the removed lines and return self.
    pub fn with_removed<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.removed_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_original_code(mut self, code: impl Into<String>) -> Self {
        self.original_code = Some(code.into());
        self
    }

    pub fn with_modified_code(mut self, code: impl Into<String>) -> Self {
        self.modified_code = Some(code.into());
        self
    }

    /// Added plus removed lines. Deletions weigh the same as additions.
    pub fn lines_changed(&self) -> usize {
        self.added_lines.len() + self.removed_lines.len()
    }

    /// Language of the file, guessed from its extension.
    pub fn language(&self) -> SourceLanguage {
        SourceLanguage::from_path(&self.file_path)
    }

    /// The code a scanner should look at: the full modified source when the
    /// caller supplied it, otherwise the added lines.
    pub fn scan_text(&self) -> String {
        match &self.modified_code {
            Some(code) => code.clone(),
            None => self.added_lines.join("\n"),
        }
    }
}

/// What kind of edit an operation performs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// In-place modification of existing files.
    #[default]
    CodeEdit,
    /// Creation of new files.
    FileCreate,
    /// Removal of files.
    FileDelete,
    /// Symbol or file rename across the workspace.
    Rename,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::CodeEdit => write!(f, "code_edit"),
            OperationKind::FileCreate => write!(f, "file_create"),
            OperationKind::FileDelete => write!(f, "file_delete"),
            OperationKind::Rename => write!(f, "rename"),
        }
    }
}

/// One atomic prospective change-set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operation {
    /// The file changes, in the order the caller will apply them.
    #[serde(default)]
    pub changes: Vec<FileChange>,

    /// Free-text description of the intent.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub kind: OperationKind,
}

impl Operation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Append a file change and return self.
    pub fn with_change(mut self, change: FileChange) -> Self {
        self.changes.push(change);
        self
    }

    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.changes.len()
    }

    /// Sum of added and removed lines across all files.
    pub fn total_lines_changed(&self) -> usize {
        self.changes.iter().map(FileChange::lines_changed).sum()
    }

    /// Reject malformed input before any evaluator sees it.
    pub fn validate(&self) -> Result<(), ChangeSetError> {
        for (index, change) in self.changes.iter().enumerate() {
            if change.file_path.trim().is_empty() {
                return Err(ChangeSetError::EmptyFilePath { index });
            }
        }
        Ok(())
    }

    /// Decode an operation from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, ChangeSetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// SHA-256 over the operation's shape: kind, description, paths and
    /// line counts. Line content is deliberately excluded so the digest can
    /// go into audit records without leaking code.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.description.as_bytes());
        for change in &self.changes {
            hasher.update([0u8]);
            hasher.update(change.file_path.as_bytes());
            hasher.update(change.added_lines.len().to_le_bytes());
            hasher.update(change.removed_lines.len().to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Source language of a changed file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceLanguage {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Java,
    Unknown,
}

impl SourceLanguage {
    /// Detect the language from a file extension.
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("py" | "pyi") => SourceLanguage::Python,
            Some("js" | "jsx" | "mjs" | "cjs") => SourceLanguage::JavaScript,
            Some("ts" | "tsx" | "mts" | "cts") => SourceLanguage::TypeScript,
            Some("rs") => SourceLanguage::Rust,
            Some("go") => SourceLanguage::Go,
            Some("java") => SourceLanguage::Java,
            _ => SourceLanguage::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLanguage::Python => "python",
            SourceLanguage::JavaScript => "javascript",
            SourceLanguage::TypeScript => "typescript",
            SourceLanguage::Rust => "rust",
            SourceLanguage::Go => "go",
            SourceLanguage::Java => "java",
            SourceLanguage::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

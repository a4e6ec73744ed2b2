//! Per-item copy decisions and run statistics.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Whether a plan entry is a single file or a whole folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// What happened to one incoming item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Copied under its own name.
    Copied,
    /// Copied under a `_N` name because the original name was taken by
    /// different content.
    Renamed,
    /// Not written: identical content already sits at the destination.
    SkippedDuplicate,
    /// Could not be processed; see the entry detail.
    Error,
}

/// One copy decision: where an item wanted to go, where it went, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPlanEntry {
    /// File or folder.
    pub kind: EntryKind,
    /// Source path of the item.
    pub source: PathBuf,
    /// Destination path under the item's own name.
    pub proposed: PathBuf,
    /// Destination path actually used (the duplicate's path for skips,
    /// None on error).
    pub resolved: Option<PathBuf>,
    /// Outcome of the decision.
    pub outcome: Outcome,
    /// Extra context, mostly error messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CopyPlanEntry {
    /// Create an entry for a successful decision.
    pub fn resolved(
        kind: EntryKind,
        source: impl Into<PathBuf>,
        proposed: impl Into<PathBuf>,
        resolved: impl Into<PathBuf>,
        outcome: Outcome,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            proposed: proposed.into(),
            resolved: Some(resolved.into()),
            outcome,
            detail: None,
        }
    }

    /// Create an entry for an item that could not be processed.
    pub fn error(
        kind: EntryKind,
        source: impl Into<PathBuf>,
        proposed: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            proposed: proposed.into(),
            resolved: None,
            outcome: Outcome::Error,
            detail: Some(message.into()),
        }
    }

    /// Whether this decision writes to the destination.
    pub fn writes(&self) -> bool {
        matches!(self.outcome, Outcome::Copied | Outcome::Renamed)
    }

    /// The destination path if one was decided.
    pub fn resolved_path(&self) -> Option<&Path> {
        self.resolved.as_deref()
    }
}

/// Totals for one consolidation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationStats {
    /// Folders created at the destination, nested ones included.
    pub folders_copied: u64,
    /// Top-level folders that had to take a `_N` name.
    pub folders_renamed: u64,
    /// Top-level folders already present from a previous run.
    pub folders_skipped: u64,
    /// Files copied under their own name, files inside copied folders included.
    pub files_copied: u64,
    /// Files copied under a `_N` name.
    pub files_renamed: u64,
    /// Files not copied because identical content was already present.
    pub files_skipped: u64,
    /// Items that failed.
    pub errors: u64,
    /// Bytes written to the destination.
    pub bytes_copied: u64,
}

impl ConsolidationStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a top-level decision.
    pub fn record(&mut self, entry: &CopyPlanEntry) {
        match (entry.kind, entry.outcome) {
            (EntryKind::File, Outcome::Copied) => self.files_copied += 1,
            (EntryKind::File, Outcome::Renamed) => self.files_renamed += 1,
            (EntryKind::File, Outcome::SkippedDuplicate) => self.files_skipped += 1,
            (EntryKind::Folder, Outcome::Renamed) => self.folders_renamed += 1,
            (EntryKind::Folder, Outcome::SkippedDuplicate) => self.folders_skipped += 1,
            (EntryKind::Folder, Outcome::Copied) => {}
            (_, Outcome::Error) => self.errors += 1,
        }
    }

    /// Number of items written (copied or renamed).
    pub fn total_written(&self) -> u64 {
        self.files_copied + self.files_renamed
    }

    /// Whether the run finished without item-level errors.
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

//! Output types: one row per author, gathered into a batch.

use serde::{Deserialize, Serialize};

/// Canonical role labels the prompt asks the model to use.
pub mod role {
    pub const FIRST_AUTHOR: &str = "First Author";
    pub const CO_FIRST_AUTHOR: &str = "Co-First Author";
    pub const CORRESPONDING_AUTHOR: &str = "Corresponding Author";
    pub const CO_AUTHOR: &str = "Co-Author";
}

/// Value written into `name` (and, historically, `role`) of an error row.
pub const ERROR_MARKER: &str = "ERROR";

/// One normalised row of author metadata from one document.
///
/// `None` in an optional field means the model did not provide it, which is
/// distinct from `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    /// Identifier of the originating document, usually its file name.
    pub source_file: String,
    /// Author name; empty when the model omitted it.
    pub name: String,
    /// Role label as produced by the model, or the failure description on an error row.
    pub role: String,
    pub is_corresponding: Option<bool>,
    pub affiliation: Option<String>,
    pub email: Option<String>,
}

impl AuthorRecord {
    /// The single row standing in for a document whose extraction failed.
    ///
    /// The failure description is carried in `role`.
    pub fn error(source_file: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            name: ERROR_MARKER.to_string(),
            role: description.into(),
            is_corresponding: None,
            affiliation: None,
            email: None,
        }
    }

    /// Whether this row looks like an error row rather than a real author.
    ///
    /// This is a heuristic on the row alone: an author the model itself
    /// named `"ERROR"`, with no affiliation or email, also matches. Use
    /// [`crate::extract::FileOutcome`] or [`BatchStats::failed_files`] when
    /// the distinction matters.
    pub fn is_error(&self) -> bool {
        self.name == ERROR_MARKER && self.affiliation.is_none() && self.email.is_none()
    }
}

/// Per-run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub processed_files: usize,
    pub failed_files: usize,
    pub total_records: usize,
    pub duration_ms: u64,
    /// True when the run stopped early because its cancel flag was raised.
    pub cancelled: bool,
}

/// All author records produced by one batch run, in file order then author order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub records: Vec<AuthorRecord>,
    pub stats: BatchStats,
}

impl ExtractionBatch {
    /// Records that came from the model, skipping error rows.
    pub fn authors(&self) -> impl Iterator<Item = &AuthorRecord> {
        self.records.iter().filter(|r| !r.is_error())
    }

    /// Error rows only, by [`AuthorRecord::is_error`].
    pub fn errors(&self) -> impl Iterator<Item = &AuthorRecord> {
        self.records.iter().filter(|r| r.is_error())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Results returned by the two batch passes.
//!
//! The runs never flip a shared "error occurred" flag. Each one returns an
//! explicit summary, and the caller decides what to print or how to exit.

use crate::model::UrlRow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of [`crate::generate::generate_urls`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    /// Rows written to the generated-URL table, in accumulation order.
    pub rows: Vec<UrlRow>,
    /// Where the table was written.
    pub path: PathBuf,
    pub stats: GenerationStats,
}

/// Counters for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Organisations whose division matched the selection.
    pub organizations: usize,
    pub queries: usize,
    /// Search API pages requested across all queries.
    pub pages_requested: usize,
    /// Links returned by the search API, duplicates included.
    pub links_returned: usize,
    /// Links skipped because the URL was already seen this run.
    pub duplicates_skipped: usize,
    pub trusted: usize,
    pub third_party: usize,
    /// Untrusted links dropped because third-party rows are not kept.
    pub discarded: usize,
    /// Queries whose pagination ended early on a malformed or failed page.
    pub aborted_queries: usize,
    pub total_duration_ms: u64,
}

/// Outcome of [`crate::collect::collect_content`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// URL rows read from the input table.
    pub total_urls: usize,
    pub pdf_saved: usize,
    pub html_saved: usize,
    /// PDFs that failed every attempt (one failure-log row each).
    pub pdf_failures: usize,
    /// HTML pages that failed (log only).
    pub html_failures: usize,
    /// Archive appends or re-sorts that failed.
    pub archive_errors: usize,
    /// Input rows that could not be parsed.
    pub skipped_rows: usize,
    pub total_duration_ms: u64,
}

impl CollectionSummary {
    /// Number of records written to archives.
    pub fn saved(&self) -> usize {
        self.pdf_saved + self.html_saved
    }

    /// `true` when anything went wrong during the pass.
    pub fn has_errors(&self) -> bool {
        self.pdf_failures + self.html_failures + self.archive_errors + self.skipped_rows > 0
    }
}

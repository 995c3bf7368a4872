//! URL store: classified, de-duplicated result rows for one generation run.

use crate::error::HarvestError;
use crate::model::{LinkFlag, UrlRow};
use crate::pipeline::classify::{detect_file_type, is_trusted_link};
use csv::QuoteStyle;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Column headers of the generated-URL table.
pub const URL_HEADERS: [&str; 5] = ["Organization", "Year", "URL", "File Type", "Flag"];

/// What happened to a link offered to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Added(LinkFlag),
    /// Already seen earlier in this run.
    Duplicate,
    /// Untrusted and third-party rows are not kept.
    Discarded,
}

/// In-memory rows plus the run's seen-URL set.
#[derive(Debug, Default)]
pub struct UrlStore {
    rows: Vec<UrlRow>,
    seen: HashSet<String>,
    include_third_party: bool,
}

impl UrlStore {
    pub fn new(include_third_party: bool) -> Self {
        Self {
            include_third_party,
            ..Self::default()
        }
    }

    /// Classify and keep `url` unless it was seen before.
    ///
    /// A URL is marked seen before it is classified, so a discarded link is
    /// not reconsidered under a later organisation or year either.
    pub fn offer(&mut self, organization: &str, year: i32, url: &str) -> Admission {
        if !self.seen.insert(url.to_string()) {
            return Admission::Duplicate;
        }

        let trusted = is_trusted_link(url, organization);
        debug!("Checking link: {} -> trusted: {}", url, trusted);
        let flag = match (trusted, self.include_third_party) {
            (true, _) => LinkFlag::Trusted,
            (false, true) => LinkFlag::ThirdParty,
            (false, false) => {
                debug!("Discarded: {} (untrusted domain)", url);
                return Admission::Discarded;
            }
        };

        self.rows.push(UrlRow {
            organization: organization.to_string(),
            year,
            url: url.to_string(),
            file_type: detect_file_type(url),
            flag,
        });
        Admission::Added(flag)
    }

    pub fn rows(&self) -> &[UrlRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<UrlRow> {
        self.rows
    }

    /// Write every row to `path`, replacing any previous table.
    pub fn save(&self, path: &Path) -> Result<(), HarvestError> {
        super::write_atomic(path, &URL_HEADERS, &self.rows, QuoteStyle::Necessary)
    }
}

/// Rows read back from a generated-URL table.
#[derive(Debug, Clone, Default)]
pub struct UrlTable {
    pub rows: Vec<UrlRow>,
    /// Rows that did not deserialise.
    pub skipped: usize,
}

/// Read a generated-URL table. Unreadable rows are skipped with a warning.
pub fn read_url_table(path: &Path) -> Result<UrlTable, HarvestError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| HarvestError::TableRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut table = UrlTable::default();
    for (idx, result) in reader.deserialize::<UrlRow>().enumerate() {
        match result {
            Ok(row) => table.rows.push(row),
            Err(e) => {
                warn!("{}: skipping row {}: {}", path.display(), idx + 2, e);
                table.skipped += 1;
            }
        }
    }
    Ok(table)
}

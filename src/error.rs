//! Error types for the sdg-harvest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`HarvestError`] is **fatal**: the run cannot proceed at all (missing
//!   filters, missing credentials, no organisation directory, no browser
//!   engine). Returned as `Err(HarvestError)` from the top-level
//!   `generate*` / `collect*` functions.
//!
//! * [`FetchError`] is **non-fatal**: a single page request or URL failed
//!   (timeout, bad status, unparsable PDF). The batch keeps going and the
//!   failure is counted in [`crate::output::CollectionSummary`] or written
//!   to the failure log.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sdg-harvest library.
///
/// Per-URL failures use [`FetchError`] and never abort a batch.
#[derive(Debug, Error)]
pub enum HarvestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// One or more required filters were not selected.
    #[error("Please select: {}.", fields.join(", "))]
    MissingFilters { fields: Vec<&'static str> },

    /// A required credential is not configured.
    #[error("Missing search API credential: set {var} or pass it on the command line")]
    MissingCredentials { var: &'static str },

    /// The organisation source directory does not exist.
    #[error("Organisation source directory not found: '{path}'")]
    SourceDirNotFound { path: PathBuf },

    /// The options (label) file could not be parsed.
    #[error("Invalid options file '{path}': {detail}")]
    InvalidOptions { path: PathBuf, detail: String },

    // ── Table errors ──────────────────────────────────────────────────────
    /// Could not read a tabular file.
    #[error("Failed to read table '{path}': {source}")]
    TableRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Could not write a tabular file.
    #[error("Failed to write table '{path}': {source}")]
    TableWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A table is readable but lacks a required column.
    #[error("Malformed table '{path}': {detail}")]
    MalformedTable { path: PathBuf, detail: String },

    /// Plain file-system failure on a known path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The WebDriver endpoint could not start a browser session.
    #[error(
        "Headless browser unavailable at '{url}': {reason}\n\
Start chromedriver (e.g. `chromedriver --port=4444`) or pass --no-browser."
    )]
    BrowserUnavailable { url: String, reason: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfEngineUnavailable(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HarvestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarvestError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal error for a single request or URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("Request to '{url}' failed: {reason}")]
    Http { url: String, reason: String },

    /// The request timed out.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("'{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The downloaded file could not be read as a PDF.
    #[error("PDF error for '{path}': {detail}")]
    Pdf { path: PathBuf, detail: String },

    /// The headless browser failed to render the page.
    #[error("Browser failed on '{url}': {detail}")]
    Browser { url: String, detail: String },

    /// The page or document yielded no text.
    #[error("No content extracted from '{url}'")]
    EmptyContent { url: String },

    /// Local file-system failure while storing a download.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: PathBuf, detail: String },
}

impl FetchError {
    /// Map a reqwest error onto the matching variant.
    pub(crate) fn from_reqwest(url: &str, timeout_secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

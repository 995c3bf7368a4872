//! Failure log: one row per PDF that failed every attempt in this run.

use crate::error::HarvestError;
use crate::model::FailureRecord;
use csv::QuoteStyle;
use std::path::{Path, PathBuf};
use tracing::info;

/// Message stored for a PDF that never downloaded and parsed.
pub fn pdf_failure_message(attempts: u32) -> String {
    format!("Failed to download or parse PDF after {} attempts.", attempts)
}

#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the log left by a previous run. A missing file is fine.
    pub fn reset(&self) -> Result<(), HarvestError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed previous failure log {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HarvestError::io(&self.path, e)),
        }
    }

    pub fn append(&self, record: &FailureRecord) -> Result<(), HarvestError> {
        super::append_row(&self.path, record, QuoteStyle::Necessary)
    }
}

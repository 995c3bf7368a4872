//! CSV tables on local storage.
//!
//! | Table | Written by | Mode |
//! |-------|-----------|------|
//! | generated URLs | generation | overwrite, atomic |
//! | `<org>/content.csv` | collection | append, then atomic re-sort |
//! | failed PDFs | collection | reset per run, append |
//! | submission audit | generation | append, never truncated |
//!
//! Single writer throughout, so nothing here locks.

pub mod archive;
pub mod audit;
pub mod failures;
pub mod urls;

use crate::error::HarvestError;
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;

/// Write `rows` to `path` through a temp file in the same directory, then
/// rename over the target. An empty row set still gets its header.
pub(crate) fn write_atomic<T: Serialize>(
    path: &Path,
    headers: &[&str],
    rows: &[T],
    quote: QuoteStyle,
) -> Result<(), HarvestError> {
    let parent = ensure_parent(path)?;
    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| HarvestError::io(parent, e))?;

    {
        let mut writer = WriterBuilder::new()
            .quote_style(quote)
            .has_headers(!rows.is_empty())
            .from_writer(tmp.as_file_mut());
        let write_err = |source| HarvestError::TableWrite {
            path: path.to_path_buf(),
            source,
        };
        if rows.is_empty() {
            writer.write_record(headers).map_err(write_err)?;
        }
        for row in rows {
            writer.serialize(row).map_err(write_err)?;
        }
        writer.flush().map_err(|e| HarvestError::io(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| HarvestError::io(path, e.error))?;
    Ok(())
}

/// Append one row, writing the header first when the file is new or empty.
pub(crate) fn append_row<T: Serialize>(
    path: &Path,
    row: &T,
    quote: QuoteStyle,
) -> Result<(), HarvestError> {
    ensure_parent(path)?;
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| HarvestError::io(path, e))?;

    let mut writer = WriterBuilder::new()
        .quote_style(quote)
        .has_headers(is_new)
        .from_writer(file);
    writer
        .serialize(row)
        .map_err(|source| HarvestError::TableWrite {
            path: path.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(|e| HarvestError::io(path, e))
}

/// Create the parent directory of `path` and return it (`.` when bare).
fn ensure_parent(path: &Path) -> Result<&Path, HarvestError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| HarvestError::io(parent, e))?;
    Ok(parent)
}

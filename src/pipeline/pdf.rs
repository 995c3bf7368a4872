//! PDF text extraction via pdfium, plus the page-marker layout of stored text.
//!
//! pdfium is not async-safe, so [`PdfiumReader`] does all of its work inside
//! `tokio::task::spawn_blocking`. The library is located (and fetched on
//! first use) by `pdfium-auto` once, when the reader is built; a missing
//! engine is a fatal [`HarvestError::PdfEngineUnavailable`].

use crate::error::{FetchError, HarvestError};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Longest short name kept before the `.pdf` suffix.
const MAX_SHORT_NAME: usize = 100;

/// Reads the text of every page of a local PDF.
#[async_trait]
pub trait PdfReader: Send + Sync {
    /// Page texts in document order. An unreadable file is an error.
    async fn extract_pages(&self, path: &Path) -> Result<Vec<String>, FetchError>;
}

/// pdfium-backed [`PdfReader`] bound to one library file.
///
/// Construct through [`PdfiumReader::locate`] or
/// [`PdfiumReader::from_library_path`], both of which fail up front when no
/// usable library exists.
#[derive(Debug, Clone)]
pub struct PdfiumReader {
    lib_path: PathBuf,
}

impl PdfiumReader {
    /// Find libpdfium (`PDFIUM_LIB_PATH`, the cache, or a first-use
    /// download) and check that it binds.
    pub async fn locate() -> Result<Self, HarvestError> {
        tokio::task::spawn_blocking(|| {
            let lib_path = pdfium_auto::ensure_pdfium_library(None)
                .map_err(|e| HarvestError::PdfEngineUnavailable(e.to_string()))?;
            Self::from_library_path(lib_path)
        })
        .await
        .map_err(|e| HarvestError::Internal(format!("pdfium lookup task panicked: {}", e)))?
    }

    /// Use the library at `lib_path`. Blocking: binds once to check it.
    pub fn from_library_path(lib_path: impl Into<PathBuf>) -> Result<Self, HarvestError> {
        let lib_path = lib_path.into();
        pdfium_auto::bind_pdfium_from_path(&lib_path)
            .map_err(|e| HarvestError::PdfEngineUnavailable(e.to_string()))?;
        debug!("pdfium bound from {}", lib_path.display());
        Ok(Self { lib_path })
    }

    pub fn lib_path(&self) -> &Path {
        &self.lib_path
    }
}

#[async_trait]
impl PdfReader for PdfiumReader {
    async fn extract_pages(&self, path: &Path) -> Result<Vec<String>, FetchError> {
        let owned = path.to_path_buf();
        let lib_path = self.lib_path.clone();
        tokio::task::spawn_blocking(move || extract_pages_blocking(&lib_path, &owned))
            .await
            .map_err(|e| FetchError::Pdf {
                path: path.to_path_buf(),
                detail: format!("extraction task panicked: {}", e),
            })?
    }
}

fn extract_pages_blocking(lib_path: &Path, path: &Path) -> Result<Vec<String>, FetchError> {
    let pdf_err = |detail: String| FetchError::Pdf {
        path: path.to_path_buf(),
        detail,
    };

    let pdfium =
        pdfium_auto::bind_pdfium_from_path(lib_path).map_err(|e| pdf_err(e.to_string()))?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| pdf_err(format!("{:?}", e)))?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| pdf_err(format!("page {}: {:?}", idx + 1, e)))?;
        pages.push(text.all());
    }
    debug!("{}: extracted {} pages", path.display(), pages.len());
    Ok(pages)
}

/// Join page texts, each introduced by `\n===== PAGE {n} =====\n`.
pub fn assemble_pdf_text(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("\n===== PAGE {} =====\n{}", i + 1, text))
        .collect()
}

/// Local file name for a downloaded PDF.
///
/// Host with `.` → `_`, then path with `/` → `_`, cut to 100 characters.
pub fn pdf_file_name(url: &str) -> String {
    let short: String = match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default().replace('.', "_");
            format!("{}{}", host, parsed.path().replace('/', "_"))
        }
        Err(_) => url
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect(),
    };
    let short: String = short.chars().take(MAX_SHORT_NAME).collect();
    format!("{}.pdf", short)
}

/// Where the PDF for `url` is stored inside an organisation directory.
pub fn pdf_path(org_dir: &Path, url: &str) -> PathBuf {
    org_dir.join(pdf_file_name(url))
}

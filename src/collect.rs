//! Collection pass: generated-URL table → per-organisation archives.
//!
//! Rows are processed strictly one after another. Each ends in exactly one
//! of: an archived record, a failure-log row (PDF), or a logged error (HTML).
//! The returned [`CollectionSummary`] counts them by kind.

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::model::{FailureRecord, FileType, UrlRow};
use crate::output::CollectionSummary;
use crate::pipeline::browser::{ScriptRenderer, WebDriverRenderer};
use crate::pipeline::fetch::{ContentFetcher, FetchOutcome, HttpWebClient, WebClient};
use crate::pipeline::pdf::{PdfReader, PdfiumReader};
use crate::tables::archive::{content_record, sort_archive, ArchiveWriter};
use crate::tables::failures::{pdf_failure_message, FailureLog};
use crate::tables::urls::read_url_table;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Read the generated-URL table at `path` and collect every row.
///
/// Rows that fail to parse are skipped and counted in
/// [`CollectionSummary::skipped_rows`].
pub async fn collect_from_file(
    path: &Path,
    config: &HarvestConfig,
) -> Result<CollectionSummary, HarvestError> {
    let table = read_url_table(path)?;
    info!(
        "Read {} URL rows from {} ({} unreadable)",
        table.rows.len(),
        path.display(),
        table.skipped
    );
    let mut summary = collect_content(&table.rows, config).await?;
    summary.total_urls += table.skipped;
    summary.skipped_rows += table.skipped;
    Ok(summary)
}

/// Fetch and archive the content behind each row.
///
/// # Errors
/// Fatal only at start-up: the failure log cannot be reset, no pdfium
/// library can be bound, or no browser session can be opened while
/// `use_browser` is set. Per-URL failures are
/// counted in the summary instead.
pub async fn collect_content(
    rows: &[UrlRow],
    config: &HarvestConfig,
) -> Result<CollectionSummary, HarvestError> {
    let total_start = Instant::now();
    let total = rows.len();

    // ── Step 1: Reset the failure log ────────────────────────────────────
    let failures = FailureLog::new(&config.failure_log_path);
    failures.reset()?;

    // ── Step 2: Resolve fetch backends ───────────────────────────────────
    let web: Arc<dyn WebClient> = match config.web_client {
        Some(ref client) => Arc::clone(client),
        None => Arc::new(HttpWebClient::new(config)?),
    };
    let pdf_reader: Arc<dyn PdfReader> = match config.pdf_reader {
        Some(ref reader) => Arc::clone(reader),
        None => Arc::new(PdfiumReader::locate().await?),
    };
    let renderer = resolve_renderer(config).await?;

    let fetcher = ContentFetcher::new(
        web,
        pdf_reader,
        renderer.clone(),
        config.pdf_attempts,
        config.pdf_retry_delay,
    );
    let archive = ArchiveWriter::new(&config.output_root);
    let mut summary = CollectionSummary {
        total_urls: total,
        ..Default::default()
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_collection_start(total);
    }

    // ── Step 3: Process rows in order ────────────────────────────────────
    for (i, row) in rows.iter().enumerate() {
        let index = i + 1;
        info!("Processing URL {}/{}: {} for {}", index, total, row.url, row.organization);
        if let Some(ref cb) = config.progress_callback {
            cb.on_url_start(index, total, &row.url);
        }

        let org_dir = archive.org_dir(&row.organization);
        match fetcher.fetch(&row.url, &org_dir).await {
            FetchOutcome::Fetched(content) => {
                let record = content_record(&row.url, &content, Utc::now());
                // A row counts as saved only once its archive is back in
                // newest-first order.
                match archive
                    .append(&row.organization, &record)
                    .and_then(|path| sort_archive(&path))
                {
                    Ok(_) => {
                        match content.file_type {
                            FileType::Pdf => summary.pdf_saved += 1,
                            _ => summary.html_saved += 1,
                        }
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_url_complete(index, total, record.raw_content.len());
                        }
                    }
                    Err(e) => {
                        error!("Could not archive {}: {}", row.url, e);
                        summary.archive_errors += 1;
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_url_error(index, total, &e.to_string());
                        }
                    }
                }
            }
            FetchOutcome::PdfFailed(e) => {
                error!("PDF content could not be extracted: {} ({})", row.url, e);
                summary.pdf_failures += 1;
                let record = FailureRecord {
                    organization: row.organization.clone(),
                    url: row.url.clone(),
                    error: pdf_failure_message(config.pdf_attempts),
                };
                if let Err(log_err) = failures.append(&record) {
                    error!("Could not write failure log: {}", log_err);
                    summary.archive_errors += 1;
                }
                if let Some(ref cb) = config.progress_callback {
                    cb.on_url_error(index, total, &e.to_string());
                }
            }
            FetchOutcome::HtmlFailed(e) => {
                error!("Failed to retrieve HTML content from {}: {}", row.url, e);
                summary.html_failures += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_url_error(index, total, &e.to_string());
                }
            }
        }
    }

    // ── Step 4: Release the browser ──────────────────────────────────────
    if let Some(renderer) = renderer {
        renderer.close().await;
    }

    summary.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Collection finished: {}/{} saved, {} PDF failures, {} HTML failures, {}ms",
        summary.saved(),
        total,
        summary.pdf_failures,
        summary.html_failures,
        summary.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_collection_complete(total, summary.saved());
    }

    Ok(summary)
}

/// Injected renderer, else a fresh WebDriver session when browsing is on.
async fn resolve_renderer(
    config: &HarvestConfig,
) -> Result<Option<Arc<dyn ScriptRenderer>>, HarvestError> {
    if let Some(ref renderer) = config.renderer {
        return Ok(Some(Arc::clone(renderer)));
    }
    if !config.use_browser {
        info!("Browser rendering disabled; script-heavy pages use the raw body");
        return Ok(None);
    }
    let renderer = WebDriverRenderer::connect(&config.webdriver_url, config.render_settle).await?;
    Ok(Some(Arc::new(renderer)))
}

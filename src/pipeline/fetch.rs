//! Content fetcher: turns one stored URL into archivable text.
//!
//! ## Per-URL flow
//!
//! ```text
//!            HEAD ──▶ PDF? ──yes──▶ download ▶ pdfium ▶ page text   (≤ N attempts)
//!                        │
//!                        no
//!                        ▼
//!       GET probe ──▶ mentions "javascript"? ──yes──▶ headless browser
//!                        │ no                                │
//!                        ▼                                   ▼
//!                   probe body ─────────────▶ visible text ◀─┘
//! ```
//!
//! PDF failures are retried with a fixed delay and end in a failure-log
//! row. HTML failures are logged only. Network access goes through the
//! [`WebClient`] seam so the flow can be tested without a network.

use crate::config::HarvestConfig;
use crate::error::{FetchError, HarvestError};
use crate::model::FileType;
use crate::pipeline::browser::ScriptRenderer;
use crate::pipeline::html;
use crate::pipeline::pdf::{self, PdfReader};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Minimal HTTP surface the fetcher needs.
#[async_trait]
pub trait WebClient: Send + Sync {
    /// `Content-Type` of a `HEAD` response, redirects followed.
    async fn content_type(&self, url: &str) -> Result<Option<String>, FetchError>;

    /// Body of a `GET` response.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    /// Stream a `GET` body into `dest`, returning the bytes written.
    /// Only a stalled connection times out, not a slow one.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// reqwest-backed [`WebClient`].
///
/// `HEAD` and page requests share a client with a total timeout. PDF
/// downloads use a second client whose timeout applies to connecting and to
/// each read, so a large file that keeps streaming is never cut off.
pub struct HttpWebClient {
    client: reqwest::Client,
    download_client: reqwest::Client,
    request_timeout_secs: u64,
    pdf_timeout_secs: u64,
}

impl HttpWebClient {
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let init_err =
            |e: reqwest::Error| HarvestError::Internal(format!("HTTP client init failed: {}", e));
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(init_err)?;
        let stall = Duration::from_secs(config.pdf_timeout_secs);
        let download_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(stall)
            .read_timeout(stall)
            .build()
            .map_err(init_err)?;
        Ok(Self {
            client,
            download_client,
            request_timeout_secs: config.request_timeout_secs,
            pdf_timeout_secs: config.pdf_timeout_secs,
        })
    }

    fn check_status(url: &str, response: &reqwest::Response) -> Result<(), FetchError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl WebClient for HttpWebClient {
    async fn content_type(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.request_timeout_secs, e))?;
        Ok(response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.request_timeout_secs, e))?;
        Self::check_status(url, &response)?;
        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.request_timeout_secs, e))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let io_err = |e: std::io::Error| FetchError::Io {
            path: dest.to_path_buf(),
            detail: e.to_string(),
        };

        let mut response = self
            .download_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.pdf_timeout_secs, e))?;
        Self::check_status(url, &response)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.pdf_timeout_secs, e))?
        {
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        Ok(written)
    }
}

/// Text ready for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedContent {
    pub file_type: FileType,
    /// Pages in the PDF; 0 for HTML.
    pub page_count: usize,
    pub text: String,
}

/// Result of processing one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(FetchedContent),
    /// Every PDF attempt failed; carries the last error.
    PdfFailed(FetchError),
    HtmlFailed(FetchError),
}

/// Runs the per-URL state machine.
pub struct ContentFetcher {
    web: Arc<dyn WebClient>,
    pdf_reader: Arc<dyn PdfReader>,
    renderer: Option<Arc<dyn ScriptRenderer>>,
    pdf_attempts: u32,
    retry_delay: Duration,
}

impl ContentFetcher {
    pub fn new(
        web: Arc<dyn WebClient>,
        pdf_reader: Arc<dyn PdfReader>,
        renderer: Option<Arc<dyn ScriptRenderer>>,
        pdf_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            web,
            pdf_reader,
            renderer,
            pdf_attempts: pdf_attempts.max(1),
            retry_delay,
        }
    }

    /// Fetch `url`, storing any downloaded PDF under `org_dir`.
    pub async fn fetch(&self, url: &str, org_dir: &Path) -> FetchOutcome {
        if self.is_pdf(url).await {
            let dest = pdf::pdf_path(org_dir, url);
            match self.fetch_pdf(url, &dest).await {
                Ok(content) => FetchOutcome::Fetched(content),
                Err(e) => FetchOutcome::PdfFailed(e),
            }
        } else {
            match self.fetch_html(url).await {
                Ok(content) => FetchOutcome::Fetched(content),
                Err(e) => FetchOutcome::HtmlFailed(e),
            }
        }
    }

    /// `HEAD` content type says PDF, or the URL ends with `.pdf`.
    pub async fn is_pdf(&self, url: &str) -> bool {
        let by_suffix = url.to_lowercase().ends_with(".pdf");
        match self.web.content_type(url).await {
            Ok(content_type) => {
                by_suffix
                    || content_type
                        .map(|ct| ct.to_lowercase().contains("application/pdf"))
                        .unwrap_or(false)
            }
            Err(e) => {
                debug!("HEAD failed for {}, judging by suffix: {}", url, e);
                by_suffix
            }
        }
    }

    /// Download and extract a PDF, retrying with a fixed delay.
    pub async fn fetch_pdf(&self, url: &str, dest: &Path) -> Result<FetchedContent, FetchError> {
        let mut last_error = None;

        for attempt in 1..=self.pdf_attempts {
            if attempt > 1 {
                sleep_between_attempts(self.retry_delay).await;
            }
            match self.try_pdf(url, dest).await {
                Ok(content) => {
                    info!(
                        "Downloaded PDF: {} -> {} ({} pages)",
                        url,
                        dest.display(),
                        content.page_count
                    );
                    return Ok(content);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed for PDF {}: {}",
                        attempt, self.pdf_attempts, url, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::EmptyContent {
            url: url.to_string(),
        }))
    }

    async fn try_pdf(&self, url: &str, dest: &Path) -> Result<FetchedContent, FetchError> {
        let bytes = self.web.download(url, dest).await?;
        debug!("{} bytes written to {}", bytes, dest.display());

        let pages = self.pdf_reader.extract_pages(dest).await?;
        if pages.is_empty() {
            return Err(FetchError::Pdf {
                path: dest.to_path_buf(),
                detail: "document has no pages".into(),
            });
        }
        Ok(FetchedContent {
            file_type: FileType::Pdf,
            page_count: pages.len(),
            text: pdf::assemble_pdf_text(&pages),
        })
    }

    /// Fetch a page, rendering it in the browser when the probe asks for it.
    pub async fn fetch_html(&self, url: &str) -> Result<FetchedContent, FetchError> {
        let markup = match self.web.get_text(url).await {
            Ok(body) if !html::needs_script(&body) => body,
            Ok(body) => match &self.renderer {
                Some(renderer) => {
                    debug!("{} looks script-rendered, using browser", url);
                    renderer.render(url).await?
                }
                None => {
                    debug!("{} looks script-rendered but no browser is configured", url);
                    body
                }
            },
            Err(e) => match &self.renderer {
                Some(renderer) => {
                    debug!("Probe failed for {} ({}), using browser", url, e);
                    renderer.render(url).await?
                }
                None => return Err(e),
            },
        };

        let text = html::visible_text(&markup);
        if text.is_empty() {
            return Err(FetchError::EmptyContent {
                url: url.to_string(),
            });
        }
        Ok(FetchedContent {
            file_type: FileType::Html,
            page_count: 0,
            text,
        })
    }
}

async fn sleep_between_attempts(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

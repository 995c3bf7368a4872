//! Configuration types for both batch passes.
//!
//! All run behaviour is controlled through [`HarvestConfig`], built via its
//! [`HarvestConfigBuilder`]. Credentials are never embedded: they come from
//! the environment ([`SearchCredentials::from_env`]) or are set explicitly.

use crate::error::HarvestError;
use crate::pipeline::browser::ScriptRenderer;
use crate::pipeline::fetch::WebClient;
use crate::pipeline::pdf::PdfReader;
use crate::pipeline::search::SearchProvider;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default search endpoint (Google Programmable Search JSON API).
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Environment variable holding the search API key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Environment variable holding the search-engine identifier.
pub const ENGINE_ID_VAR: &str = "GOOGLE_CX_ID";

/// Report-type keywords crossed with every organisation/year/SDG query.
pub const DEFAULT_REPORT_KEYWORDS: [&str; 4] = [
    "annual report",
    "sustainability report",
    "ESG report",
    "corporate responsibility",
];

/// Search API key plus search-engine identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

impl SearchCredentials {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        }
    }

    /// Read `GOOGLE_API_KEY` and `GOOGLE_CX_ID`.
    pub fn from_env() -> Result<Self, HarvestError> {
        let read = |var: &'static str| match std::env::var(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(HarvestError::MissingCredentials { var }),
        };
        Ok(Self::new(read(API_KEY_VAR)?, read(ENGINE_ID_VAR)?))
    }
}

impl fmt::Debug for SearchCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCredentials")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .finish()
    }
}

/// Configuration for a generation and/or collection run.
///
/// Built via [`HarvestConfig::builder()`] or using
/// [`HarvestConfig::default()`].
///
/// # Example
/// ```rust
/// use sdg_harvest::HarvestConfig;
///
/// let config = HarvestConfig::builder()
///     .max_results(20)
///     .pdf_attempts(3)
///     .include_third_party(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct HarvestConfig {
    // ── Search ──────────────────────────────────────────────────────────
    /// Search API endpoint.
    pub search_endpoint: String,

    /// API key + engine id. If None, read from the environment when a
    /// search provider has to be built.
    pub credentials: Option<SearchCredentials>,

    /// Upper bound on results requested per query. Default: 30.
    ///
    /// Pages of 10 are requested at offsets 1, 11, 21, … below this value.
    pub max_results: usize,

    /// Keywords crossed with each organisation/year/SDG combination.
    pub report_keywords: Vec<String>,

    /// Keep untrusted links as `Third-party` rows instead of dropping them.
    /// Default: false.
    pub include_third_party: bool,

    /// Year the query builder counts down from. If None, the current
    /// calendar year.
    pub current_year: Option<i32>,

    // ── Fetching ─────────────────────────────────────────────────────────
    /// Timeout for search pages, HEAD probes and HTML GETs. Default: 10 s.
    pub request_timeout_secs: u64,

    /// Timeout for PDF downloads. Default: 15 s.
    pub pdf_timeout_secs: u64,

    /// Total attempts per PDF, first try included. Default: 3.
    pub pdf_attempts: u32,

    /// Fixed delay between PDF attempts. Default: 2 s.
    pub pdf_retry_delay: Duration,

    /// Time the headless browser waits after page load. Default: 3 s.
    pub render_settle: Duration,

    /// Render script-dependent pages in a headless browser. Default: true.
    pub use_browser: bool,

    /// WebDriver endpoint of the headless browser.
    pub webdriver_url: String,

    /// User-Agent sent with fetch requests.
    pub user_agent: String,

    // ── Paths ────────────────────────────────────────────────────────────
    /// Generated-URL table: written by generation, read by collection.
    pub urls_path: PathBuf,

    /// Root of the per-organisation archives.
    pub output_root: PathBuf,

    /// PDF failure log, reset at the start of each collection run.
    pub failure_log_path: PathBuf,

    /// Append-only log of validated submissions. None disables it.
    pub audit_log_path: Option<PathBuf>,

    // ── Injection points ─────────────────────────────────────────────────
    /// Progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,

    /// Pre-constructed search provider. Takes precedence over credentials.
    pub search_provider: Option<Arc<dyn SearchProvider>>,

    /// Pre-constructed HTTP client for the collection pass.
    pub web_client: Option<Arc<dyn WebClient>>,

    /// Pre-constructed PDF text reader.
    pub pdf_reader: Option<Arc<dyn PdfReader>>,

    /// Pre-constructed script renderer. Takes precedence over `use_browser`.
    pub renderer: Option<Arc<dyn ScriptRenderer>>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            credentials: None,
            max_results: 30,
            report_keywords: DEFAULT_REPORT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            include_third_party: false,
            current_year: None,
            request_timeout_secs: 10,
            pdf_timeout_secs: 15,
            pdf_attempts: 3,
            pdf_retry_delay: Duration::from_secs(2),
            render_settle: Duration::from_secs(3),
            use_browser: true,
            webdriver_url: "http://localhost:4444".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            urls_path: PathBuf::from("generated_urls.csv"),
            output_root: PathBuf::from("output"),
            failure_log_path: PathBuf::from("logs").join("failed_pdfs.csv"),
            audit_log_path: Some(PathBuf::from("user_input_log.csv")),
            progress_callback: None,
            search_provider: None,
            web_client: None,
            pdf_reader: None,
            renderer: None,
        }
    }
}

impl fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("search_endpoint", &self.search_endpoint)
            .field("credentials", &self.credentials)
            .field("max_results", &self.max_results)
            .field("report_keywords", &self.report_keywords)
            .field("include_third_party", &self.include_third_party)
            .field("current_year", &self.current_year)
            .field("pdf_attempts", &self.pdf_attempts)
            .field("pdf_retry_delay", &self.pdf_retry_delay)
            .field("use_browser", &self.use_browser)
            .field("webdriver_url", &self.webdriver_url)
            .field("urls_path", &self.urls_path)
            .field("output_root", &self.output_root)
            .field("failure_log_path", &self.failure_log_path)
            .field("audit_log_path", &self.audit_log_path)
            .field(
                "search_provider",
                &self.search_provider.as_ref().map(|_| "<dyn SearchProvider>"),
            )
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn ScriptRenderer>"))
            .finish()
    }
}

impl HarvestConfig {
    /// Create a new builder for `HarvestConfig`.
    pub fn builder() -> HarvestConfigBuilder {
        HarvestConfigBuilder {
            config: Self::default(),
        }
    }

    /// The year queries count down from.
    pub fn effective_current_year(&self) -> i32 {
        use chrono::Datelike;
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}

/// Builder for [`HarvestConfig`].
#[derive(Debug)]
pub struct HarvestConfigBuilder {
    config: HarvestConfig,
}

impl HarvestConfigBuilder {
    pub fn search_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.search_endpoint = url.into();
        self
    }

    pub fn credentials(mut self, creds: SearchCredentials) -> Self {
        self.config.credentials = Some(creds);
        self
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.config.max_results = n;
        self
    }

    pub fn report_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.report_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_third_party(mut self, v: bool) -> Self {
        self.config.include_third_party = v;
        self
    }

    pub fn current_year(mut self, year: i32) -> Self {
        self.config.current_year = Some(year);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn pdf_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pdf_timeout_secs = secs;
        self
    }

    pub fn pdf_attempts(mut self, n: u32) -> Self {
        self.config.pdf_attempts = n;
        self
    }

    pub fn pdf_retry_delay(mut self, delay: Duration) -> Self {
        self.config.pdf_retry_delay = delay;
        self
    }

    pub fn render_settle(mut self, settle: Duration) -> Self {
        self.config.render_settle = settle;
        self
    }

    pub fn use_browser(mut self, v: bool) -> Self {
        self.config.use_browser = v;
        self
    }

    pub fn webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.config.webdriver_url = url.into();
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn urls_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.urls_path = path.into();
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn failure_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.failure_log_path = path.into();
        self
    }

    pub fn audit_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.config.audit_log_path = path;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.config.search_provider = Some(provider);
        self
    }

    pub fn web_client(mut self, client: Arc<dyn WebClient>) -> Self {
        self.config.web_client = Some(client);
        self
    }

    pub fn pdf_reader(mut self, reader: Arc<dyn PdfReader>) -> Self {
        self.config.pdf_reader = Some(reader);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn ScriptRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<HarvestConfig, HarvestError> {
        let c = &self.config;
        if c.max_results == 0 {
            return Err(HarvestError::InvalidConfig(
                "max_results must be ≥ 1".into(),
            ));
        }
        if c.pdf_attempts == 0 {
            return Err(HarvestError::InvalidConfig(
                "pdf_attempts must be ≥ 1".into(),
            ));
        }
        if c.report_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(HarvestError::InvalidConfig(
                "at least one report keyword is required".into(),
            ));
        }
        Ok(self.config)
    }
}

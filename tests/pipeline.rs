//! End-to-end tests for both passes, run against stub network seams.
//!
//! No test touches the network, a browser, or libpdfium: the search API,
//! HTTP client, PDF reader and renderer are all replaced through
//! `HarvestConfig`.

use async_trait::async_trait;
use sdg_harvest::pipeline::browser::ScriptRenderer;
use sdg_harvest::pipeline::fetch::WebClient;
use sdg_harvest::pipeline::pdf::PdfReader;
use sdg_harvest::pipeline::search::{RawPage, SearchClient, SearchProvider};
use sdg_harvest::tables::archive::{is_newest_first, ARCHIVE_FILE};
use sdg_harvest::tables::urls::read_url_table;
use sdg_harvest::{
    collect_content, collect_from_file, detect_file_type, generate_urls, is_trusted_link,
    load_organizations, ContentRecord, FailureRecord, FetchError, FileType, FilterInput,
    HarvestConfig, HarvestError, HarvestProgressCallback, LinkFlag, OptionLabels, Organization,
    UrlRow,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Stubs ────────────────────────────────────────────────────────────────

/// Serves canned bodies in order, one per request, and records each start.
struct ScriptedSearch {
    bodies: Mutex<Vec<String>>,
    requests: Mutex<Vec<(String, usize)>>,
}

impl ScriptedSearch {
    fn new(bodies: Vec<String>) -> Self {
        Self {
            bodies: Mutex::new(bodies.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn fetch_page(&self, query: &str, start: usize) -> Result<RawPage, FetchError> {
        self.requests.lock().unwrap().push((query.to_string(), start));
        let body = self
            .bodies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| r#"{"items": []}"#.to_string());
        Ok(RawPage { status: 200, body })
    }
}

/// Every query gets the same short page of links.
struct FixedLinks(Vec<&'static str>);

#[async_trait]
impl SearchProvider for FixedLinks {
    async fn fetch_page(&self, _query: &str, _start: usize) -> Result<RawPage, FetchError> {
        Ok(RawPage {
            status: 200,
            body: page_of(&self.0),
        })
    }
}

fn page_of(links: &[&str]) -> String {
    let items: Vec<_> = links
        .iter()
        .map(|l| serde_json::json!({ "link": l }))
        .collect();
    serde_json::json!({ "items": items }).to_string()
}

fn page_with(prefix: &str, n: usize) -> String {
    let links: Vec<String> = (0..n).map(|i| format!("https://{prefix}.org/{i}")).collect();
    let refs: Vec<&str> = links.iter().map(String::as_str).collect();
    page_of(&refs)
}

/// PDFs whose download fails a set number of times before succeeding;
/// everything else is a static HTML page.
struct StubWeb {
    pdf_failures_before_success: usize,
    downloads: AtomicUsize,
}

impl StubWeb {
    fn new(pdf_failures_before_success: usize) -> Self {
        Self {
            pdf_failures_before_success,
            downloads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl WebClient for StubWeb {
    async fn content_type(&self, url: &str) -> Result<Option<String>, FetchError> {
        if url.contains("/doc/") {
            Ok(Some("application/pdf".into()))
        } else {
            Ok(Some("text/html; charset=utf-8".into()))
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        Ok(format!(
            "<html><body><h1>Report</h1><p>Content of \"{url}\"\nline two</p></body></html>"
        ))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let n = self.downloads.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.pdf_failures_before_success {
            return Err(FetchError::Timeout {
                url: url.to_string(),
                secs: 15,
            });
        }
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(dest, b"%PDF-1.7 stub").unwrap();
        Ok(13)
    }
}

struct TwoPages;

#[async_trait]
impl PdfReader for TwoPages {
    async fn extract_pages(&self, _path: &Path) -> Result<Vec<String>, FetchError> {
        Ok(vec!["Scope 1 emissions".into(), "Scope 2 emissions".into()])
    }
}

/// Every request fails: HEAD, GET and downloads.
#[derive(Default)]
struct UnreachableWeb {
    downloads: AtomicUsize,
}

#[async_trait]
impl WebClient for UnreachableWeb {
    async fn content_type(&self, url: &str) -> Result<Option<String>, FetchError> {
        Err(FetchError::Http {
            url: url.to_string(),
            reason: "connection refused".into(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::Status {
            url: url.to_string(),
            status: 503,
        })
    }

    async fn download(&self, url: &str, _dest: &Path) -> Result<u64, FetchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Http {
            url: url.to_string(),
            reason: "connection refused".into(),
        })
    }
}

/// Counts renders and closes; every render fails.
#[derive(Default)]
struct CountingRenderer {
    renders: AtomicUsize,
    closes: AtomicUsize,
}

#[async_trait]
impl ScriptRenderer for CountingRenderer {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Browser {
            url: url.to_string(),
            detail: "page crashed".into(),
        })
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct UrlEvents {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl HarvestProgressCallback for UrlEvents {
    fn on_url_complete(&self, _index: usize, _total: usize, _chars: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_url_error(&self, _index: usize, _total: usize, _error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn org(name: &str, division: &str) -> Organization {
    Organization {
        organisation_name: name.into(),
        division: division.into(),
        industry: "Electricity Gas Water And Waste Services".into(),
    }
}

fn complete_input() -> FilterInput {
    FilterInput {
        countries: vec!["Australia".into()],
        industries: vec!["Division D".into()],
        sdgs: vec!["7".into(), "13".into()],
        year: Some(2023),
        document_types: vec!["AR".into()],
        frequency: Some("Annual".into()),
    }
}

fn url_row(org: &str, url: &str) -> UrlRow {
    UrlRow {
        organization: org.into(),
        year: 2024,
        url: url.into(),
        file_type: detect_file_type(url),
        flag: LinkFlag::Trusted,
    }
}

fn collect_config(dir: &Path, web: Arc<StubWeb>) -> HarvestConfig {
    HarvestConfig::builder()
        .web_client(web)
        .pdf_reader(Arc::new(TwoPages))
        .use_browser(false)
        .pdf_retry_delay(Duration::ZERO)
        .output_root(dir.join("output"))
        .failure_log_path(dir.join("logs").join("failed_pdfs.csv"))
        .build()
        .unwrap()
}

fn read_failures(path: &Path) -> Vec<FailureRecord> {
    if !path.exists() {
        return Vec::new();
    }
    csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .map(|r| r.unwrap())
        .collect()
}

fn read_archive(path: &Path) -> Vec<ContentRecord> {
    csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .map(|r| r.unwrap())
        .collect()
}

// ── Filter selection ─────────────────────────────────────────────────────

#[test]
fn incomplete_selection_lists_missing_fields() {
    for strip in 0..6 {
        let mut input = complete_input();
        match strip {
            0 => input.countries.clear(),
            1 => input.industries.clear(),
            2 => input.sdgs.clear(),
            3 => input.year = None,
            4 => input.document_types.clear(),
            _ => input.frequency = None,
        }
        match input.validate(&OptionLabels::default()) {
            Err(HarvestError::MissingFilters { fields }) => assert_eq!(fields.len(), 1),
            other => panic!("expected MissingFilters, got {other:?}"),
        }
    }
}

// ── Organisation loader ──────────────────────────────────────────────────

#[test]
fn organisation_files_load_once_each() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("ANZSIC_D_Electricity,_Gas,_Water_&_Waste_Services_2025.json"),
        r#"```json
{"data": [
  {"organisation_name": "AGL Energy"},
  {"organisation_name": ""},
  {"organisation_name": "Origin Energy"},
  {"ticker": "XYZ"}
]}
```"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("ANZSIC_B_Mining_2024.json"),
        r#"{"data": [{"organisation_name": "BHP"}]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let loaded = load_organizations(dir.path()).unwrap();
    let names: Vec<&str> = loaded
        .organizations
        .iter()
        .map(|o| o.organisation_name.as_str())
        .collect();
    assert_eq!(names, vec!["BHP", "AGL Energy", "Origin Energy"]);
    assert_eq!(loaded.skipped_files.len(), 1);

    let agl = &loaded.organizations[1];
    assert_eq!(agl.division, "Division D");
    assert_eq!(agl.industry, "Electricity Gas Water And Waste Services");
}

// ── Link classification ──────────────────────────────────────────────────

#[test]
fn file_type_branches() {
    assert_eq!(detect_file_type("https://a.org/report.pdf"), FileType::Pdf);
    assert_eq!(detect_file_type("https://a.org/data.xlsx"), FileType::Excel);
    assert_eq!(detect_file_type("https://a.org/about"), FileType::Html);
    assert_eq!(detect_file_type("https://a.org/file.zip"), FileType::Other);
}

#[test]
fn trust_heuristic() {
    assert!(is_trusted_link("https://www.greenco.com/report.pdf", "GreenCo"));
    assert!(!is_trusted_link("https://example.com/x", "GreenCo"));
}

// ── Search pagination ────────────────────────────────────────────────────

#[tokio::test]
async fn short_page_stops_pagination() {
    let provider = Arc::new(ScriptedSearch::new(vec![
        page_with("p1", 10),
        page_with("p2", 10),
        page_with("p3", 4),
        page_with("p4", 10),
    ]));
    let client = SearchClient::new(provider.clone(), 50);

    let outcome = client.search("GreenCo 2024").await;
    assert_eq!(outcome.links.len(), 24);
    assert_eq!(provider.request_count(), 3);
    assert!(!outcome.aborted);

    let starts: Vec<usize> = provider
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|(_, s)| *s)
        .collect();
    assert_eq!(starts, vec![1, 11, 21]);
}

#[tokio::test]
async fn malformed_page_keeps_earlier_links() {
    let provider = Arc::new(ScriptedSearch::new(vec![
        page_with("p1", 10),
        "<html>rate limited</html>".into(),
    ]));
    let client = SearchClient::new(provider.clone(), 30);

    let outcome = client.search("GreenCo 2024").await;
    assert_eq!(outcome.links.len(), 10);
    assert!(outcome.aborted);
    assert_eq!(provider.request_count(), 2);
}

// ── Generation pass ──────────────────────────────────────────────────────

#[tokio::test]
async fn generated_table_has_no_duplicate_urls() {
    let dir = tempfile::tempdir().unwrap();
    let urls_path = dir.path().join("generated_urls.csv");
    let audit_path = dir.path().join("user_input_log.csv");

    let provider = Arc::new(FixedLinks(vec![
        "https://www.agl.com.au/sustainability.pdf",
        "https://www.agl.com.au/about",
        "https://news.example.com/agl-energy",
        "https://www.agl.com.au/about",
    ]));
    let config = HarvestConfig::builder()
        .search_provider(provider)
        .current_year(2024)
        .report_keywords(["annual report", "ESG report"])
        .urls_path(&urls_path)
        .audit_log_path(Some(audit_path.clone()))
        .build()
        .unwrap();

    let selection = complete_input().validate(&OptionLabels::default()).unwrap();
    let orgs = vec![
        org("AGL", "Division D"),
        org("AGL Energy", "Division D"),
        org("BHP", "Division B"),
    ];

    let output = generate_urls(&selection, &orgs, &config).await.unwrap();

    // 2 orgs × 2 years × 2 SDGs × 2 keywords, one page each
    assert_eq!(output.stats.organizations, 2);
    assert_eq!(output.stats.queries, 16);
    assert_eq!(output.stats.pages_requested, 16);

    let table = read_url_table(&urls_path).unwrap();
    let mut urls: Vec<&str> = table.rows.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls.len(), 2);
    urls.sort_unstable();
    urls.dedup();
    assert_eq!(urls.len(), 2, "duplicate URL in {:?}", table.rows);

    // First sighting wins: the first org, the current year.
    assert!(table.rows.iter().all(|r| r.organization == "AGL" && r.year == 2024));
    assert_eq!(table.rows[0].file_type, FileType::Pdf);
    assert_eq!(output.stats.discarded, 1);

    let audit = std::fs::read_to_string(&audit_path).unwrap();
    assert_eq!(audit.lines().count(), 2);
    assert!(audit.contains("AGL; AGL Energy"));
}

#[tokio::test]
async fn third_party_rows_kept_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarvestConfig::builder()
        .search_provider(Arc::new(FixedLinks(vec!["https://news.example.com/agl"])))
        .current_year(2023)
        .report_keywords(["annual report"])
        .include_third_party(true)
        .urls_path(dir.path().join("urls.csv"))
        .audit_log_path(None)
        .build()
        .unwrap();
    let selection = complete_input().validate(&OptionLabels::default()).unwrap();

    let output = generate_urls(&selection, &[org("AGL", "Division D")], &config)
        .await
        .unwrap();
    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.rows[0].flag, LinkFlag::ThirdParty);
    assert_eq!(output.stats.third_party, 1);
}

// ── Collection pass ──────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_failing_every_attempt_is_logged_once() {
    let dir = tempfile::tempdir().unwrap();
    let web = Arc::new(StubWeb::new(usize::MAX));
    let config = collect_config(dir.path(), web.clone());

    let rows = vec![url_row("GreenCo", "https://greenco.com/doc/esg.pdf")];
    let summary = collect_content(&rows, &config).await.unwrap();

    assert_eq!(web.downloads.load(Ordering::SeqCst), 3);
    assert_eq!(summary.pdf_failures, 1);
    assert_eq!(summary.saved(), 0);
    assert!(summary.has_errors());

    let failures = read_failures(&config.failure_log_path);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, "https://greenco.com/doc/esg.pdf");
    assert_eq!(
        failures[0].error,
        "Failed to download or parse PDF after 3 attempts."
    );
    assert!(!dir.path().join("output").join("GreenCo").join(ARCHIVE_FILE).exists());
}

#[tokio::test]
async fn pdf_succeeding_on_second_attempt_is_archived_once() {
    let dir = tempfile::tempdir().unwrap();
    let web = Arc::new(StubWeb::new(1));
    let config = collect_config(dir.path(), web.clone());

    let rows = vec![url_row("GreenCo", "https://greenco.com/doc/esg.pdf")];
    let summary = collect_content(&rows, &config).await.unwrap();

    assert_eq!(web.downloads.load(Ordering::SeqCst), 2);
    assert_eq!(summary.pdf_saved, 1);
    assert!(!summary.has_errors());
    assert!(read_failures(&config.failure_log_path).is_empty());

    let records = read_archive(&dir.path().join("output").join("GreenCo").join(ARCHIVE_FILE));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].file_type, FileType::Pdf);
    assert_eq!(records[0].page_count, 2);
    assert_eq!(
        records[0].raw_content,
        " ===== PAGE 1 ===== Scope 1 emissions ===== PAGE 2 ===== Scope 2 emissions"
    );
}

#[tokio::test]
async fn failure_log_is_reset_each_run() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![url_row("GreenCo", "https://greenco.com/doc/esg.pdf")];

    let failing = collect_config(dir.path(), Arc::new(StubWeb::new(usize::MAX)));
    collect_content(&rows, &failing).await.unwrap();
    assert_eq!(read_failures(&failing.failure_log_path).len(), 1);

    let healthy = collect_config(dir.path(), Arc::new(StubWeb::new(0)));
    collect_content(&rows, &healthy).await.unwrap();
    assert!(read_failures(&healthy.failure_log_path).is_empty());
}

#[tokio::test]
async fn archive_is_newest_first_after_every_run() {
    let dir = tempfile::tempdir().unwrap();
    let urls_path = dir.path().join("generated_urls.csv");
    std::fs::write(
        &urls_path,
        "Organization,Year,URL,File Type,Flag\n\
         GreenCo,2024,https://greenco.com/about,HTML,Trusted\n\
         GreenCo,2024,https://greenco.com/doc/esg.pdf,PDF,Trusted\n\
         GreenCo,2023,https://greenco.com/news,HTML,Trusted\n\
         GreenCo,bad-year,https://greenco.com/x,HTML,Trusted\n",
    )
    .unwrap();
    let config = collect_config(dir.path(), Arc::new(StubWeb::new(0)));

    let summary = collect_from_file(&urls_path, &config).await.unwrap();
    assert_eq!(summary.total_urls, 4);
    assert_eq!(summary.skipped_rows, 1);
    assert_eq!(summary.html_saved, 2);
    assert_eq!(summary.pdf_saved, 1);

    let archive = dir.path().join("output").join("GreenCo").join(ARCHIVE_FILE);
    assert!(is_newest_first(&archive).unwrap());

    // A second pass appends and re-sorts the same archive.
    collect_from_file(&urls_path, &config).await.unwrap();
    let records = read_archive(&archive);
    assert_eq!(records.len(), 6);
    assert!(is_newest_first(&archive).unwrap());
    assert!(records
        .windows(2)
        .all(|w| w[0].date_collected >= w[1].date_collected));

    // Neutralised text: no raw quotes or line breaks survive.
    let html = records
        .iter()
        .find(|r| r.url == "https://greenco.com/news")
        .unwrap();
    assert_eq!(html.page_count, 0);
    assert!(html.raw_content.contains("''https://greenco.com/news''"));
    assert!(!html.raw_content.contains('\n'));
}

#[tokio::test]
async fn unreachable_hosts_split_into_pdf_and_html_failures() {
    let dir = tempfile::tempdir().unwrap();
    let web = Arc::new(UnreachableWeb::default());
    let renderer = Arc::new(CountingRenderer::default());
    let config = HarvestConfig::builder()
        .web_client(web.clone())
        .pdf_reader(Arc::new(TwoPages))
        .renderer(renderer.clone())
        .pdf_retry_delay(Duration::ZERO)
        .output_root(dir.path().join("output"))
        .failure_log_path(dir.path().join("logs").join("failed_pdfs.csv"))
        .build()
        .unwrap();

    let rows = vec![
        url_row("GreenCo", "https://greenco.com/about"),
        url_row("GreenCo", "https://greenco.com/files/REPORT.PDF"),
    ];
    let summary = collect_content(&rows, &config).await.unwrap();

    // HEAD failed for both; only the suffix marks the second as a PDF.
    assert_eq!(web.downloads.load(Ordering::SeqCst), 3);
    assert_eq!(summary.pdf_failures, 1);
    assert_eq!(summary.html_failures, 1);
    assert_eq!(summary.saved(), 0);
    assert!(summary.has_errors());

    // The failed probe went to the browser, and the session closed once.
    assert_eq!(renderer.renders.load(Ordering::SeqCst), 1);
    assert_eq!(renderer.closes.load(Ordering::SeqCst), 1);

    // HTML failures are logged only.
    let failures = read_failures(&config.failure_log_path);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, "https://greenco.com/files/REPORT.PDF");
}

#[tokio::test]
async fn unsortable_archive_counts_as_archive_error_only() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("output").join("GreenCo").join(ARCHIVE_FILE);
    std::fs::create_dir_all(archive.parent().unwrap()).unwrap();
    std::fs::write(&archive, "Legacy Column\nold value\n").unwrap();

    let events = Arc::new(UrlEvents::default());
    let config = HarvestConfig::builder()
        .web_client(Arc::new(StubWeb::new(0)))
        .pdf_reader(Arc::new(TwoPages))
        .use_browser(false)
        .progress_callback(events.clone())
        .output_root(dir.path().join("output"))
        .failure_log_path(dir.path().join("logs").join("failed_pdfs.csv"))
        .build()
        .unwrap();

    let rows = vec![url_row("GreenCo", "https://greenco.com/about")];
    let summary = collect_content(&rows, &config).await.unwrap();

    assert_eq!(summary.html_saved, 0);
    assert_eq!(summary.archive_errors, 1);
    assert!(summary.has_errors());
    assert_eq!(events.completed.load(Ordering::SeqCst), 0);
    assert_eq!(events.failed.load(Ordering::SeqCst), 1);
}

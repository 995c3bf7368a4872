//! CLI binary for sdg-harvest.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `HarvestConfig`, runs one pass, and prints the outcome.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sdg_harvest::tables::archive::{is_newest_first, sort_archive};
use sdg_harvest::{
    collect_from_file, generate_urls, load_organizations, FilterInput, HarvestConfig,
    HarvestConfigBuilder, HarvestError, HarvestProgressCallback, OptionLabels, ProgressCallback,
    SearchCredentials,
};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner while querying, a bar while collecting.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn truncate(msg: &str, max: usize) -> String {
        if msg.chars().count() > max {
            let cut: String = msg.chars().take(max - 1).collect();
            format!("{cut}\u{2026}")
        } else {
            msg.to_string()
        }
    }
}

impl HarvestProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, organizations: usize) {
        self.bar.set_prefix("Searching");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating URLs for {organizations} organisations…"))
        ));
    }

    fn on_query(&self, index: usize, query: &str) {
        self.bar
            .set_message(format!("#{index} {}", dim(&Self::truncate(query, 70))));
    }

    fn on_generation_complete(&self, rows: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} {} URLs kept", green("✔"), bold(&rows.to_string()));
    }

    fn on_collection_start(&self, total_urls: usize) {
        self.bar.set_length(total_urls as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} URLs  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&TICKS),
        );
        self.bar.set_prefix("Collecting");
        self.bar.reset_eta();
    }

    fn on_url_start(&self, _index: usize, _total: usize, url: &str) {
        self.bar.set_message(Self::truncate(url, 60));
    }

    fn on_url_complete(&self, index: usize, total: usize, chars: usize) {
        self.bar.println(format!(
            "  {} URL {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{chars:>7} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_url_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} URL {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total,
            red(&Self::truncate(error, 80)),
        ));
        self.bar.inc(1);
    }

    fn on_collection_complete(&self, total: usize, saved: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} URLs archived  ({} failed)",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&saved.to_string()),
            total,
            failed,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Find report URLs for two SDGs, 2022 to now
  sdg-harvest generate --country Australia --industry "Division D" \
      --sdg 7,13 --year 2022 --doc-type "Annual Report" --frequency Annual

  # Archive the content behind every generated URL
  sdg-harvest collect --input generated_urls.csv --output-dir output

  # Without a browser (script-heavy pages keep their raw HTML text)
  sdg-harvest collect --no-browser

  # Which organisations belong to a division?
  sdg-harvest orgs --industry "Division A"

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Search API key
  GOOGLE_CX_ID            Programmable search engine id
  SDG_HARVEST_WEBDRIVER   WebDriver endpoint (default http://localhost:4444)
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
  RUST_LOG                Log filter, overrides -v / -q

A .env file in the working directory is loaded at start-up.
"#;

/// Find sustainability reports and archive their content.
#[derive(Parser, Debug)]
#[command(
    name = "sdg-harvest",
    version,
    about = "Find organisations' sustainability reports and archive their raw content",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SDG_HARVEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SDG_HARVEST_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "SDG_HARVEST_NO_PROGRESS")]
    no_progress: bool,

    /// Also append plain-text logs to this file.
    #[arg(long, global = true, env = "SDG_HARVEST_LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search for report URLs and write the generated-URL table.
    Generate(GenerateArgs),
    /// Fetch every URL in the table and archive its text.
    Collect(CollectArgs),
    /// List loaded organisations, optionally filtered by division.
    Orgs(OrgsArgs),
    /// Re-sort one content archive newest-first.
    SortArchive {
        /// Path to a `content.csv` archive.
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Country (repeat or comma-separate).
    #[arg(long, value_delimiter = ',')]
    country: Vec<String>,

    /// Industry division code, e.g. "Division A".
    #[arg(long, value_delimiter = ',')]
    industry: Vec<String>,

    /// SDG goal code, 1-17.
    #[arg(long, value_delimiter = ',')]
    sdg: Vec<String>,

    /// First year to search; queries run from the current year down to it.
    #[arg(long)]
    year: Option<i32>,

    /// Document type code.
    #[arg(long = "doc-type", value_delimiter = ',')]
    doc_type: Vec<String>,

    /// Reporting frequency code.
    #[arg(long)]
    frequency: Option<String>,

    /// Directory of per-division organisation JSON files.
    #[arg(long, env = "SDG_HARVEST_ORGS_DIR", default_value = "AUSTRALIA_ANZSIC")]
    orgs_dir: PathBuf,

    /// JSON file with code → label maps.
    #[arg(long, env = "SDG_HARVEST_OPTIONS")]
    options: Option<PathBuf>,

    /// Generated-URL table to write.
    #[arg(short, long, default_value = "generated_urls.csv")]
    output: PathBuf,

    /// Submission audit log.
    #[arg(long, default_value = "user_input_log.csv")]
    audit_log: PathBuf,

    /// Do not write the submission audit log.
    #[arg(long)]
    no_audit: bool,

    /// Maximum results requested per query.
    #[arg(long, env = "SDG_HARVEST_MAX_RESULTS", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=100))]
    max_results: u64,

    /// Report keyword (repeatable; replaces the defaults).
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Keep links outside the organisation's domain, flagged Third-party.
    #[arg(long)]
    include_third_party: bool,

    /// Search API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Search engine id.
    #[arg(long, env = "GOOGLE_CX_ID")]
    cx: Option<String>,

    /// Search endpoint.
    #[arg(long, env = "SDG_HARVEST_SEARCH_ENDPOINT")]
    endpoint: Option<String>,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[derive(Args, Debug)]
struct CollectArgs {
    /// Generated-URL table to read.
    #[arg(short, long, default_value = "generated_urls.csv")]
    input: PathBuf,

    /// Root directory for per-organisation archives.
    #[arg(long, env = "SDG_HARVEST_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// PDF failure log (reset every run).
    #[arg(long, default_value = "logs/failed_pdfs.csv")]
    failures: PathBuf,

    /// WebDriver endpoint for the headless browser.
    #[arg(long, env = "SDG_HARVEST_WEBDRIVER", default_value = "http://localhost:4444")]
    webdriver_url: String,

    /// Never start a browser.
    #[arg(long)]
    no_browser: bool,

    /// Wait after page load before reading the rendered source.
    #[arg(long, default_value_t = 3000)]
    settle_ms: u64,

    /// Attempts per PDF, first try included.
    #[arg(long, default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    pdf_attempts: u32,

    /// Fixed delay between PDF attempts.
    #[arg(long, default_value_t = 2000)]
    retry_delay_ms: u64,

    /// HTTP timeout in seconds for HEAD / HTML requests.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// PDF download timeout in seconds.
    #[arg(long, default_value_t = 15)]
    pdf_timeout: u64,
}

#[derive(Args, Debug)]
struct OrgsArgs {
    /// Directory of per-division organisation JSON files.
    #[arg(long, env = "SDG_HARVEST_ORGS_DIR", default_value = "AUSTRALIA_ANZSIC")]
    orgs_dir: PathBuf,

    /// Only organisations in these divisions.
    #[arg(long, value_delimiter = ',')]
    industry: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    init_tracing(&cli)?;
    let show_progress = !cli.quiet && !cli.no_progress;
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn HarvestProgressCallback>)
    } else {
        None
    };

    match cli.command {
        Command::Generate(ref args) => run_generate(args, progress_cb, cli.quiet).await,
        Command::Collect(ref args) => run_collect(args, progress_cb, cli.quiet).await,
        Command::Orgs(ref args) => run_orgs(args),
        Command::SortArchive { ref path } => {
            let rows = sort_archive(path)
                .with_context(|| format!("Failed to sort {}", path.display()))?;
            let ordered = is_newest_first(path)?;
            if !cli.quiet {
                eprintln!(
                    "{} {} rows, newest first: {}",
                    if ordered { green("✔") } else { red("✘") },
                    rows,
                    ordered
                );
            }
            Ok(())
        }
    }
}

/// Default level for the stderr layer. The progress bar carries the
/// per-URL feedback, so library INFO logs are hidden behind it unless -v
/// is given.
fn stderr_level(verbose: bool, quiet: bool, show_progress: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet || show_progress {
        "error"
    } else {
        "info"
    }
}

/// Default level for the `--log-file` layer. Never drops below INFO.
fn file_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// `RUST_LOG` when set, else `default`.
fn level_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// stderr layer plus an optional non-ANSI file layer, each with its own filter.
fn init_tracing(cli: &Cli) -> Result<()> {
    let show_progress = !cli.quiet && !cli.no_progress;
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(level_filter(stderr_level(cli.verbose, cli.quiet, show_progress)));

    let file_layer = match cli.log_file {
        Some(ref path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(level_filter(file_level(cli.verbose))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

async fn run_generate(
    args: &GenerateArgs,
    progress: Option<ProgressCallback>,
    quiet: bool,
) -> Result<()> {
    let labels = match args.options {
        Some(ref path) => OptionLabels::from_file(path)?,
        None => OptionLabels::default(),
    };

    let input = FilterInput {
        countries: args.country.clone(),
        industries: args.industry.clone(),
        sdgs: args.sdg.clone(),
        year: args.year,
        document_types: args.doc_type.clone(),
        frequency: args.frequency.clone(),
    };
    let selection = match input.validate(&labels) {
        Ok(selection) => selection,
        Err(e @ HarvestError::MissingFilters { .. }) => {
            eprintln!("{}", red(&e.to_string()));
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let loaded = load_organizations(&args.orgs_dir)?;

    let mut builder = HarvestConfig::builder()
        .max_results(args.max_results as usize)
        .include_third_party(args.include_third_party)
        .request_timeout_secs(args.timeout)
        .urls_path(&args.output)
        .audit_log_path((!args.no_audit).then(|| args.audit_log.clone()));
    if !args.keywords.is_empty() {
        builder = builder.report_keywords(args.keywords.clone());
    }
    if let Some(ref endpoint) = args.endpoint {
        builder = builder.search_endpoint(endpoint.clone());
    }
    if let (Some(key), Some(cx)) = (&args.api_key, &args.cx) {
        builder = builder.credentials(SearchCredentials::new(key.clone(), cx.clone()));
    }
    let config = with_progress(builder, progress)
        .build()
        .context("Invalid configuration")?;

    let output = generate_urls(&selection, &loaded.organizations, &config)
        .await
        .context("URL generation failed")?;

    if !quiet {
        let s = &output.stats;
        eprintln!(
            "{}  {} URLs  →  {}",
            if s.aborted_queries == 0 { green("✔") } else { cyan("⚠") },
            output.rows.len(),
            bold(&output.path.display().to_string()),
        );
        eprintln!(
            "   {} queries  /  {} pages  /  {} duplicates  /  {} discarded  /  {}ms",
            dim(&s.queries.to_string()),
            dim(&s.pages_requested.to_string()),
            dim(&s.duplicates_skipped.to_string()),
            dim(&s.discarded.to_string()),
            s.total_duration_ms,
        );
    }
    Ok(())
}

async fn run_collect(
    args: &CollectArgs,
    progress: Option<ProgressCallback>,
    quiet: bool,
) -> Result<()> {
    // ── Ensure PDFium engine is available ────────────────────────────────
    ensure_pdf_engine(quiet)?;

    let builder = HarvestConfig::builder()
        .output_root(&args.output_dir)
        .failure_log_path(&args.failures)
        .webdriver_url(args.webdriver_url.clone())
        .use_browser(!args.no_browser)
        .render_settle(Duration::from_millis(args.settle_ms))
        .pdf_attempts(args.pdf_attempts)
        .pdf_retry_delay(Duration::from_millis(args.retry_delay_ms))
        .request_timeout_secs(args.timeout)
        .pdf_timeout_secs(args.pdf_timeout);
    let config = with_progress(builder, progress)
        .build()
        .context("Invalid configuration")?;

    let summary = collect_from_file(&args.input, &config)
        .await
        .context("Collection failed")?;

    if summary.has_errors() {
        println!("Data collection complete. Some errors occurred. Please check the log.");
        if summary.pdf_failures > 0 {
            println!(
                "See also {} for failed PDF URLs.",
                config.failure_log_path.display()
            );
        }
    } else {
        println!("Data collection complete. No errors detected.");
    }
    Ok(())
}

fn run_orgs(args: &OrgsArgs) -> Result<()> {
    let loaded = load_organizations(&args.orgs_dir)?;
    for org in loaded
        .organizations
        .iter()
        .filter(|o| args.industry.is_empty() || args.industry.contains(&o.division))
    {
        println!("{}\t{}\t{}", org.division, org.industry, org.organisation_name);
    }
    for skipped in &loaded.skipped_files {
        eprintln!("{} skipped {}", cyan("⚠"), skipped.display());
    }
    Ok(())
}

fn with_progress(builder: HarvestConfigBuilder, progress: Option<ProgressCallback>) -> HarvestConfigBuilder {
    match progress {
        Some(cb) => builder.progress_callback(cb),
        None => builder,
    }
}

/// Download and cache libpdfium on first use (~30 MB), showing a bar.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    if std::env::var_os("PDFIUM_LIB_PATH").is_some_and(|p| Path::new(&p).exists())
        || pdfium_auto::is_pdfium_cached()
    {
        return Ok(());
    }

    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

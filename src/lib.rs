//! # sdg-harvest
//!
//! Find organisations' sustainability and annual reports through a web
//! search API, then archive the raw text behind every link.
//!
//! ## Two Passes
//!
//! The work is split into two batch jobs joined by one CSV file, so either
//! can be re-run on its own:
//!
//! ```text
//! FilterSelection + organisations
//!  │
//!  ├─ generate  query builder ─▶ search API (paged) ─▶ link classifier
//!  │            └─▶ generated_urls.csv   (overwritten each run)
//!  │
//!  └─ collect   generated_urls.csv ─▶ HEAD: PDF or HTML?
//!               ├─ PDF   download ─▶ pdfium page text   (fixed retries)
//!               └─ HTML  probe ─▶ headless browser if script-heavy
//!               └─▶ output/<org>/content.csv   (newest first)
//!                   logs/failed_pdfs.csv       (reset each run)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sdg_harvest::{
//!     collect_from_file, generate_urls, load_organizations, FilterInput, HarvestConfig,
//!     OptionLabels,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from GOOGLE_API_KEY / GOOGLE_CX_ID
//!     let config = HarvestConfig::builder().use_browser(false).build()?;
//!
//!     let selection = FilterInput {
//!         countries: vec!["Australia".into()],
//!         industries: vec!["Division D".into()],
//!         sdgs: vec!["7".into(), "13".into()],
//!         year: Some(2023),
//!         document_types: vec!["Annual Report".into()],
//!         frequency: Some("Annual".into()),
//!     }
//!     .validate(&OptionLabels::default())?;
//!
//!     let orgs = load_organizations(Path::new("organisations"))?;
//!     let generated = generate_urls(&selection, &orgs.organizations, &config).await?;
//!     eprintln!("{} URLs", generated.rows.len());
//!
//!     let summary = collect_from_file(&generated.path, &config).await?;
//!     eprintln!("{} saved, errors: {}", summary.saved(), summary.has_errors());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sdg-harvest` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! sdg-harvest = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Services
//!
//! | Service | Used by | Default |
//! |---------|---------|---------|
//! | Google Programmable Search | `generate` | `https://www.googleapis.com/customsearch/v1` |
//! | WebDriver (chromedriver) | `collect` | `http://localhost:4444` |
//! | PDFium shared library | `collect` | downloaded and cached on first use |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod collect;
pub mod config;
pub mod error;
pub mod generate;
pub mod model;
pub mod organizations;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod selection;
pub mod tables;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use collect::{collect_content, collect_from_file};
pub use config::{HarvestConfig, HarvestConfigBuilder, SearchCredentials};
pub use error::{FetchError, HarvestError};
pub use generate::generate_urls;
pub use model::{ContentRecord, FailureRecord, FileType, LinkFlag, Organization, UrlRow};
pub use organizations::{load_organizations, LoadedOrganizations};
pub use output::{CollectionSummary, GenerationOutput, GenerationStats};
pub use pipeline::classify::{detect_file_type, is_trusted_link};
pub use progress::{HarvestProgressCallback, NoopProgressCallback, ProgressCallback};
pub use selection::{FilterInput, FilterSelection, OptionLabels};

//! Pipeline stages for both batch passes.
//!
//! Each submodule implements one step. Network-facing stages expose a trait
//! seam ([`search::SearchProvider`], [`fetch::WebClient`],
//! [`pdf::PdfReader`], [`browser::ScriptRenderer`]) with a production
//! implementation next to it.
//!
//! ## Data Flow
//!
//! ```text
//! generation:  query ──▶ search ──▶ classify ──▶ tables::urls
//!              (cross     (paged     (type +
//!               product)   API)       trust)
//!
//! collection:  tables::urls ──▶ fetch ──▶ html / pdf / browser ──▶ tables::archive
//! ```
//!
//! 1. [`query`]:    lazy organisation × year × SDG × keyword queries
//! 2. [`search`]:   page through the search API, stop on a short page
//! 3. [`classify`]: file type from the path suffix, trust from the host
//! 4. [`fetch`]:    PDF-or-HTML state machine with PDF retries
//! 5. [`html`]:     script probe and visible-text extraction
//! 6. [`pdf`]:      pdfium page text in `spawn_blocking`
//! 7. [`browser`]:  shared headless-browser session

pub mod browser;
pub mod classify;
pub mod fetch;
pub mod html;
pub mod pdf;
pub mod query;
pub mod search;

//! Progress-callback trait for generation and collection events.
//!
//! Inject an [`Arc<dyn HarvestProgressCallback>`] via
//! [`crate::config::HarvestConfigBuilder::progress_callback`] to receive
//! events as each query is searched and each URL is fetched. The CLI uses it
//! to drive a terminal progress bar; the library itself never prints.
//!
//! # Example
//!
//! ```rust
//! use sdg_harvest::{HarvestConfig, HarvestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     saved: AtomicUsize,
//! }
//!
//! impl HarvestProgressCallback for CountingCallback {
//!     fn on_url_complete(&self, index: usize, total: usize, chars: usize) {
//!         self.saved.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("URL {}/{} saved ({} chars)", index, total, chars);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { saved: AtomicUsize::new(0) });
//!
//! let config = HarvestConfig::builder()
//!     .progress_callback(counter as Arc<dyn HarvestProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch passes as they work.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based.
pub trait HarvestProgressCallback: Send + Sync {
    /// Called once before the first query of a generation run.
    fn on_generation_start(&self, organizations: usize) {
        let _ = organizations;
    }

    /// Called just before a query is sent to the search API.
    fn on_query(&self, index: usize, query: &str) {
        let _ = (index, query);
    }

    /// Called once after the URL table has been written.
    fn on_generation_complete(&self, rows: usize) {
        let _ = rows;
    }

    /// Called once before the first URL of a collection run.
    fn on_collection_start(&self, total_urls: usize) {
        let _ = total_urls;
    }

    /// Called just before a URL is fetched.
    fn on_url_start(&self, index: usize, total: usize, url: &str) {
        let _ = (index, total, url);
    }

    /// Called when a URL's content has been archived.
    ///
    /// `chars` is the length of the stored text.
    fn on_url_complete(&self, index: usize, total: usize, chars: usize) {
        let _ = (index, total, chars);
    }

    /// Called when a URL could not be fetched or archived.
    fn on_url_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every URL has been attempted.
    fn on_collection_complete(&self, total: usize, saved: usize) {
        let _ = (total, saved);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl HarvestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::HarvestConfig`].
pub type ProgressCallback = Arc<dyn HarvestProgressCallback>;

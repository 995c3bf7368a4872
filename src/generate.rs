//! Generation pass: selection + organisations → generated-URL table.
//!
//! One query at a time: build the query, page through the search API,
//! offer every returned link to the run's [`UrlStore`]. The table is written
//! once at the end and replaces any earlier one.

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::model::{LinkFlag, Organization};
use crate::output::{GenerationOutput, GenerationStats};
use crate::pipeline::query::build_queries;
use crate::pipeline::search::{GoogleSearchProvider, SearchClient, SearchProvider};
use crate::selection::FilterSelection;
use crate::tables::audit::{append_audit, AuditRow};
use crate::tables::urls::{Admission, UrlStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Search for report URLs for every organisation matching `selection`.
///
/// # Errors
/// Only fatal problems are returned: missing credentials, an unwritable
/// audit log or URL table. Failed or malformed search pages end that
/// query's pagination and are counted in
/// [`GenerationStats::aborted_queries`].
pub async fn generate_urls(
    selection: &FilterSelection,
    organizations: &[Organization],
    config: &HarvestConfig,
) -> Result<GenerationOutput, HarvestError> {
    let total_start = Instant::now();

    // ── Step 1: Match organisations ──────────────────────────────────────
    let matched = selection.matched_organizations(organizations);
    info!(
        "Generating URLs for {} organisations ({} loaded)",
        matched.len(),
        organizations.len()
    );
    if matched.is_empty() {
        warn!(
            "No organisation belongs to the selected industries: {}",
            selection.industries().join(", ")
        );
    }

    // ── Step 2: Resolve search provider ──────────────────────────────────
    let provider = resolve_search_provider(config)?;
    let client = SearchClient::new(provider, config.max_results);

    // ── Step 3: Record the submission ────────────────────────────────────
    if let Some(ref audit_path) = config.audit_log_path {
        append_audit(audit_path, &AuditRow::new(selection, &matched))?;
        debug!("Submission logged to {}", audit_path.display());
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(matched.len());
    }

    // ── Step 4: Query, search, classify ──────────────────────────────────
    let mut stats = GenerationStats {
        organizations: matched.len(),
        ..Default::default()
    };
    let mut store = UrlStore::new(config.include_third_party);
    let queries = build_queries(
        selection,
        &matched,
        &config.report_keywords,
        config.effective_current_year(),
    );

    for query in queries {
        stats.queries += 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_query(stats.queries, &query.text);
        }
        debug!("Query {}: {}", stats.queries, query.text);

        let outcome = client.search(&query.text).await;
        stats.pages_requested += outcome.pages_requested;
        stats.links_returned += outcome.links.len();
        if outcome.aborted {
            stats.aborted_queries += 1;
        }

        for link in &outcome.links {
            match store.offer(&query.organization, query.year, link) {
                Admission::Added(LinkFlag::Trusted) => stats.trusted += 1,
                Admission::Added(LinkFlag::ThirdParty) => stats.third_party += 1,
                Admission::Duplicate => stats.duplicates_skipped += 1,
                Admission::Discarded => stats.discarded += 1,
            }
        }
    }

    // ── Step 5: Write the table ──────────────────────────────────────────
    store.save(&config.urls_path)?;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Saved {} URLs to {} ({} queries, {} duplicates, {} discarded)",
        store.len(),
        config.urls_path.display(),
        stats.queries,
        stats.duplicates_skipped,
        stats.discarded
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(store.len());
    }

    Ok(GenerationOutput {
        rows: store.into_rows(),
        path: config.urls_path.clone(),
        stats,
    })
}

/// Use the injected provider when present, otherwise build the Google one
/// from config or environment credentials.
fn resolve_search_provider(
    config: &HarvestConfig,
) -> Result<Arc<dyn SearchProvider>, HarvestError> {
    if let Some(ref provider) = config.search_provider {
        return Ok(Arc::clone(provider));
    }
    Ok(Arc::new(GoogleSearchProvider::from_config(config)?))
}

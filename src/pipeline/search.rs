//! Search client: paginated requests against a web search JSON API.
//!
//! The HTTP call sits behind [`SearchProvider`] so the pagination rules can
//! be exercised against a stub. [`GoogleSearchProvider`] is the production
//! implementation.
//!
//! ## Pagination
//!
//! Pages of [`PAGE_SIZE`] results are requested at start offsets
//! `1, 11, 21, …` until `max_results` is covered, or until a page comes back
//! with fewer than [`PAGE_SIZE`] items. A malformed body or a failed request
//! ends pagination for that query only; the links gathered so far are still
//! returned.

use crate::config::{HarvestConfig, SearchCredentials};
use crate::error::{FetchError, HarvestError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Results per page the API returns at most.
pub const PAGE_SIZE: usize = 10;

/// One HTTP response from the search API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub status: u16,
    pub body: String,
}

/// Fetches one page of search results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Request the page starting at the 1-based offset `start`.
    async fn fetch_page(&self, query: &str, start: usize) -> Result<RawPage, FetchError>;
}

/// Google Programmable Search JSON API.
pub struct GoogleSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    credentials: SearchCredentials,
    timeout_secs: u64,
}

impl GoogleSearchProvider {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: SearchCredentials,
        timeout_secs: u64,
    ) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HarvestError::Internal(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            credentials,
            timeout_secs,
        })
    }

    /// Build from config, reading credentials from the environment when the
    /// config carries none.
    pub fn from_config(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let credentials = match &config.credentials {
            Some(c) => c.clone(),
            None => SearchCredentials::from_env()?,
        };
        Self::new(
            config.search_endpoint.clone(),
            credentials,
            config.request_timeout_secs,
        )
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    async fn fetch_page(&self, query: &str, start: usize) -> Result<RawPage, FetchError> {
        let start = start.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("cx", self.credentials.engine_id.as_str()),
                ("q", query),
                ("start", start.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&self.endpoint, self.timeout_secs, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&self.endpoint, self.timeout_secs, e))?;
        Ok(RawPage { status, body })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    link: Option<String>,
}

/// Links parsed from one result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// Items on the page, including any without a `link`.
    pub item_count: usize,
    pub links: Vec<String>,
}

/// Parse a search API body. A missing `items` array is an empty page.
pub fn parse_search_page(body: &str) -> Result<ParsedPage, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let item_count = response.items.len();
    let links = response.items.into_iter().filter_map(|i| i.link).collect();
    Ok(ParsedPage { item_count, links })
}

/// 1-based start offsets covering the first `max_results` results.
pub fn page_offsets(max_results: usize) -> impl Iterator<Item = usize> {
    (0..max_results).step_by(PAGE_SIZE).map(|o| o + 1)
}

/// Links gathered for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Page order, then per-page order. May contain duplicates.
    pub links: Vec<String>,
    pub pages_requested: usize,
    /// Pagination ended on a failed request or malformed page.
    pub aborted: bool,
}

/// Drives a [`SearchProvider`] through the pagination rules.
pub struct SearchClient {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl SearchClient {
    pub fn new(provider: Arc<dyn SearchProvider>, max_results: usize) -> Self {
        Self {
            provider,
            max_results,
        }
    }

    /// Collect up to `max_results` links for `query`. Never fails.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();

        for start in page_offsets(self.max_results) {
            outcome.pages_requested += 1;
            let page = match self.provider.fetch_page(query, start).await {
                Ok(page) => page,
                Err(e) => {
                    error!("Search request failed for '{}': {}", query, e);
                    outcome.aborted = true;
                    break;
                }
            };
            info!("[API] {} :: {}", page.status, query);

            let parsed = match parse_search_page(&page.body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("Failed to parse search response for '{}': {}", query, e);
                    outcome.aborted = true;
                    break;
                }
            };
            debug!(
                "start={} returned {} items ({} links)",
                start,
                parsed.item_count,
                parsed.links.len()
            );

            outcome.links.extend(parsed.links);
            if parsed.item_count < PAGE_SIZE {
                break;
            }
        }

        outcome.links.truncate(self.max_results);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_for_default_max_results() {
        assert_eq!(page_offsets(30).collect::<Vec<_>>(), vec![1, 11, 21]);
        assert_eq!(page_offsets(25).collect::<Vec<_>>(), vec![1, 11, 21]);
        assert_eq!(page_offsets(1).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn parse_page_with_items() {
        let body = r#"{"items": [{"link": "https://a.org/1"}, {"title": "no link"}]}"#;
        let page = parse_search_page(body).unwrap();
        assert_eq!(page.item_count, 2);
        assert_eq!(page.links, vec!["https://a.org/1"]);
    }

    #[test]
    fn missing_items_is_empty_page() {
        let page = parse_search_page(r#"{"searchInformation": {}}"#).unwrap();
        assert_eq!(page.item_count, 0);
        assert!(page.links.is_empty());
    }

    #[test]
    fn malformed_body_is_error() {
        assert!(parse_search_page("<html>quota exceeded</html>").is_err());
    }
}

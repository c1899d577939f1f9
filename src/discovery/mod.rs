//! Website discovery: search-based URL resolution and in-site page discovery.
//!
//! The resolver turns an email domain or a business name into candidate
//! site URLs through a pluggable [`SearchProvider`]. Page discovery then
//! works from a fetched homepage to find its services, products and
//! contact pages.

pub mod filter;
pub mod pages;
pub mod query;
mod search;

pub use filter::{filter_results, is_valid_result_url};
pub use pages::{discover_pages, extract_page_links, ClassifiedPages, LinkOrigin, PageLink};
pub use query::{business_query_variants, domain_query, normalize_domain, QueryBuilder};
pub use search::{GoogleSearchProvider, SearchResolver, Throttle};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a search provider.
///
/// These never leave the resolver; they become failed outcomes.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// One search hit. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl SearchResult {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// Raw page of results from a provider, before filtering.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub total_results: u64,
}

/// What a resolver query produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// The query string that produced this outcome.
    pub query: String,
    pub query_succeeded: bool,
    /// Results that passed the validity filter, in rank order.
    pub results: Vec<SearchResult>,
    /// Total hits reported by the provider (before filtering).
    pub total_results: u64,
}

impl SearchOutcome {
    pub fn failed(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            query_succeeded: false,
            results: Vec::new(),
            total_results: 0,
        }
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    /// Candidate URLs in rank order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.url.as_str())
    }
}

/// Keyword search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<SearchPage, SearchError>;
}

//! Search resolver backed by the Google Custom Search JSON API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::filter::filter_results;
use super::query::{business_query_variants, domain_query, normalize_domain};
use super::{SearchError, SearchOutcome, SearchPage, SearchProvider, SearchResult};
use crate::config::{ScraperSettings, SearchConfig};
use crate::scrapers::{resolve_user_agent, ScrapeError};

/// Serialises calls and keeps a minimum spacing between them.
///
/// The lock is held across the wait, so concurrent callers queue up in
/// arrival order.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Run `task` once the interval since the previous call has passed.
    pub async fn run<F, T>(&self, task: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        let output = task.await;
        *last = Some(Instant::now());
        output
    }
}

/// Google Custom Search JSON API.
pub struct GoogleSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    results_per_query: u8,
}

impl GoogleSearchProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        engine_id: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .user_agent(resolve_user_agent(Some("identify")))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            results_per_query: 10,
        })
    }

    /// Build from config; `None` when credentials are missing.
    pub fn from_config(config: &SearchConfig) -> Option<Result<Self, SearchError>> {
        if !config.is_configured() {
            return None;
        }
        let api_key = config.api_key.clone()?;
        let engine_id = config.engine_id.clone()?;
        Some(
            Self::new(config.endpoint.clone(), api_key, engine_id).map(|mut provider| {
                provider.results_per_query = config.results_per_query.clamp(1, 10);
                provider
            }),
        )
    }

    /// Parse a Custom Search response body.
    pub fn parse_response(body: &str) -> Result<SearchPage, SearchError> {
        let response: ApiResponse =
            serde_json::from_str(body).map_err(|e| SearchError::Parse(e.to_string()))?;

        let total_results = response
            .search_information
            .and_then(|info| info.total_results)
            .and_then(|total| total.parse().ok())
            .unwrap_or(0);

        let results = response
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| {
                let url = item.link?;
                let mut result = SearchResult::new(url, item.title.unwrap_or_default());
                if let Some(snippet) = item.snippet {
                    result = result.with_snippet(snippet);
                }
                Some(result)
            })
            .collect();

        Ok(SearchPage {
            results,
            total_results,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "searchInformation")]
    search_information: Option<SearchInformation>,
    items: Option<Vec<ApiItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchInformation {
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn search(&self, query: &str) -> Result<SearchPage, SearchError> {
        debug!("Google search: {}", query);

        let num = self.results_per_query.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message: String = body.chars().take(200).collect();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Self::parse_response(&body)
    }
}

/// Turns domains and business names into candidate site URLs.
pub struct SearchResolver {
    provider: Option<Arc<dyn SearchProvider>>,
    throttle: Throttle,
}

impl SearchResolver {
    pub fn new(provider: Arc<dyn SearchProvider>, min_interval: Duration) -> Self {
        Self {
            provider: Some(provider),
            throttle: Throttle::new(min_interval),
        }
    }

    /// A resolver with no credentials. Every search reports `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            throttle: Throttle::new(Duration::ZERO),
        }
    }

    pub fn from_config(search: &SearchConfig, settings: &ScraperSettings) -> Self {
        match GoogleSearchProvider::from_config(search) {
            Some(Ok(provider)) => Self::new(Arc::new(provider), settings.search_delay()),
            Some(Err(e)) => {
                warn!("Search provider could not be created: {}", e);
                Self::unconfigured()
            }
            None => Self::unconfigured(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> Result<&Arc<dyn SearchProvider>, ScrapeError> {
        self.provider.as_ref().ok_or_else(|| {
            ScrapeError::NotConfigured(
                "search API key and engine id are not set (GOOGLE_SEARCH_API_KEY, GOOGLE_SEARCH_ENGINE_ID)"
                    .to_string(),
            )
        })
    }

    /// One `site:<domain>` query.
    pub async fn search_by_domain(&self, domain: &str) -> Result<SearchOutcome, ScrapeError> {
        let provider = self.provider()?;
        let Some(domain) = normalize_domain(domain) else {
            warn!("Cannot search for invalid domain {:?}", domain);
            return Ok(SearchOutcome::failed(domain.trim()));
        };
        Ok(self.run(provider.as_ref(), &domain_query(&domain)).await)
    }

    /// Try query variants until one yields a usable result.
    ///
    /// Returns the last variant's (possibly empty) outcome when none do.
    pub async fn search_by_business_name(
        &self,
        name: &str,
        state: Option<&str>,
        zip: Option<&str>,
    ) -> Result<SearchOutcome, ScrapeError> {
        let provider = self.provider()?;
        let variants = business_query_variants(name, state, zip);
        if variants.is_empty() {
            warn!("Cannot search without a business name");
            return Ok(SearchOutcome::failed(""));
        }

        let mut outcome = SearchOutcome::default();
        for (i, query) in variants.iter().enumerate() {
            outcome = self.run(provider.as_ref(), query).await;
            if outcome.has_results() {
                info!(
                    "Business search matched on variant {}/{}: {}",
                    i + 1,
                    variants.len(),
                    query
                );
                return Ok(outcome);
            }
            debug!("No usable results for {:?}", query);
        }
        Ok(outcome)
    }

    async fn run(&self, provider: &dyn SearchProvider, query: &str) -> SearchOutcome {
        match self.throttle.run(provider.search(query)).await {
            Ok(page) => {
                let raw = page.results.len();
                let results = filter_results(page.results);
                debug!(
                    "{} returned {} results for {:?}, {} usable",
                    provider.name(),
                    raw,
                    query,
                    results.len()
                );
                SearchOutcome {
                    query: query.to_string(),
                    query_succeeded: true,
                    results,
                    total_results: page.total_results,
                }
            }
            Err(e) => {
                warn!("{} search failed for {:?}: {}", provider.name(), query, e);
                SearchOutcome::failed(query)
            }
        }
    }
}

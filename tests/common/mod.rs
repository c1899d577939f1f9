//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};

use siteacquire::config::ScraperSettings;
use siteacquire::discovery::{SearchError, SearchPage, SearchProvider, SearchResolver, SearchResult};
use siteacquire::models::{ContactStatus, PageResult};
use siteacquire::repository::{ContactStore, DieselDbContext};
use siteacquire::scrapers::extract::parse_page;
use siteacquire::scrapers::{PageFetcher, ScrapeError};
use siteacquire::services::ScrapingService;

/// Static site served from memory. Unknown URLs are 404s.
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, PageResult>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn page(mut self, url: &str, markup: &str) -> Self {
        self.pages.insert(url.to_string(), parse_page(url, markup));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    fn name(&self) -> &str {
        "fake-site"
    }

    async fn fetch(&self, url: &str) -> Result<PageResult, ScrapeError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or(ScrapeError::HttpStatus(404))
    }
}

/// A rendered fetcher with no browser behind it.
pub struct NoBrowser;

#[async_trait]
impl PageFetcher for NoBrowser {
    fn name(&self) -> &str {
        "no-browser"
    }

    async fn fetch(&self, _url: &str) -> Result<PageResult, ScrapeError> {
        Err(ScrapeError::Browser("no browser in tests".to_string()))
    }
}

/// Search provider answering from a query table and recording every query.
#[derive(Default)]
pub struct FakeSearch {
    answers: HashMap<String, Vec<SearchResult>>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn answer(mut self, query: &str, urls: &[&str]) -> Self {
        let results = urls
            .iter()
            .map(|u| SearchResult::new(*u, "result"))
            .collect();
        self.answers.insert(query.to_string(), results);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &str {
        "fake-search"
    }

    async fn search(&self, query: &str) -> Result<SearchPage, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        let results = self.answers.get(query).cloned().unwrap_or_default();
        Ok(SearchPage {
            total_results: results.len() as u64,
            results,
        })
    }
}

pub async fn temp_store() -> (TempDir, Arc<DieselDbContext>) {
    let dir = tempdir().unwrap();
    let ctx = DieselDbContext::new(&dir.path().join("siteacquire.db"));
    ctx.init_schema().await.unwrap();
    (dir, Arc::new(ctx))
}

pub fn settings() -> ScraperSettings {
    ScraperSettings::default().without_delays()
}

pub fn resolver(search: Arc<FakeSearch>) -> Arc<SearchResolver> {
    Arc::new(SearchResolver::new(search, Duration::ZERO))
}

pub fn service(
    store: Arc<DieselDbContext>,
    site: Arc<dyn PageFetcher>,
    resolver: Arc<SearchResolver>,
) -> ScrapingService<DieselDbContext> {
    ScrapingService::new(store, site, Arc::new(NoBrowser), resolver, settings())
}

pub async fn status_of(store: &DieselDbContext, id: &str) -> ContactStatus {
    store.get_contact(id).await.unwrap().unwrap().status
}

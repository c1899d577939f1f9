//! Website acquisition for contacts.
//!
//! [`ScrapingService`] drives one contact through
//! `ready_to_scrape → scraping → {scraped, scrape_failed}`: resolve the site,
//! fetch the homepage, discover and fetch secondary pages, enrich missing
//! signals and persist one `ScrapedData` row. Failures are recorded and
//! returned as reports, never raised to the caller.

mod enrich;
mod fetch;
mod types;

use std::borrow::Cow;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ScraperSettings};
use crate::discovery::pages::discover_pages;
use crate::discovery::{SearchOutcome, SearchResolver};
use crate::models::{Contact, ContactStatus, PageResult, ScrapeMethod, ScrapedData, SourcePage};
use crate::repository::ContactStore;
use crate::scrapers::extract::normalize_url;
use crate::scrapers::{
    BrowserFetcher, DetectionInput, DetectorSet, HttpFetcher, PageFetcher, ProxyPool, ScrapeError,
};

pub use enrich::{enrich_signals, Enrichment};
pub use fetch::FetchPolicy;
pub use types::{BatchReport, ScrapeReport};
use types::AttemptContext;

/// Acquires website content for contacts and records every attempt.
pub struct ScrapingService<S: ContactStore> {
    store: Arc<S>,
    static_fetcher: Arc<dyn PageFetcher>,
    rendered_fetcher: Arc<dyn PageFetcher>,
    policy: FetchPolicy,
    resolver: Arc<SearchResolver>,
    settings: ScraperSettings,
}

impl<S: ContactStore> ScrapingService<S> {
    pub fn new(
        store: Arc<S>,
        static_fetcher: Arc<dyn PageFetcher>,
        rendered_fetcher: Arc<dyn PageFetcher>,
        resolver: Arc<SearchResolver>,
        settings: ScraperSettings,
    ) -> Self {
        Self::assemble(
            store,
            static_fetcher,
            rendered_fetcher,
            Arc::new(DetectorSet::default()),
            resolver,
            settings,
        )
    }

    fn assemble(
        store: Arc<S>,
        static_fetcher: Arc<dyn PageFetcher>,
        rendered_fetcher: Arc<dyn PageFetcher>,
        detectors: Arc<DetectorSet>,
        resolver: Arc<SearchResolver>,
        settings: ScraperSettings,
    ) -> Self {
        let policy = FetchPolicy::new(static_fetcher.clone(), rendered_fetcher.clone(), detectors);
        Self {
            store,
            static_fetcher,
            rendered_fetcher,
            policy,
            resolver,
            settings,
        }
    }

    /// Replace the SPA and challenge predicates used by the fetch policy.
    ///
    /// Only the policy sees the new set; a [`BrowserFetcher`] passed to
    /// [`new`](Self::new) keeps its own. Use
    /// [`from_config_with_detectors`](Self::from_config_with_detectors) to
    /// give both the same one.
    pub fn with_detectors(mut self, detectors: DetectorSet) -> Self {
        self.policy = FetchPolicy::new(
            self.static_fetcher.clone(),
            self.rendered_fetcher.clone(),
            Arc::new(detectors),
        );
        self
    }

    /// Wire the stock fetchers and resolver. Both fetchers share one proxy pool.
    pub fn from_config(store: Arc<S>, config: &Config) -> Self {
        Self::from_config_with_detectors(store, config, DetectorSet::default())
    }

    /// [`from_config`](Self::from_config) with custom predicates, shared by
    /// the fetch policy and the browser's challenge negotiation.
    pub fn from_config_with_detectors(
        store: Arc<S>,
        config: &Config,
        detectors: DetectorSet,
    ) -> Self {
        let detectors = Arc::new(detectors);
        let (static_fetcher, rendered_fetcher) = stock_fetchers(config, &detectors);
        let resolver = Arc::new(SearchResolver::from_config(&config.search, &config.scraper));
        if !resolver.is_configured() {
            warn!("Search is not configured; email_domain and business_search contacts will fail");
        }

        Self::assemble(
            store,
            static_fetcher,
            rendered_fetcher,
            detectors,
            resolver,
            config.scraper.clone(),
        )
    }

    pub fn resolver(&self) -> &SearchResolver {
        &self.resolver
    }

    /// Fetch one URL with the static-first policy.
    pub async fn fetch_url(&self, url: &str) -> Result<PageResult, ScrapeError> {
        self.policy.fetch_smart(&normalize_url(url)?).await
    }

    /// Fetch one URL in the browser only.
    pub async fn fetch_rendered(&self, url: &str) -> Result<PageResult, ScrapeError> {
        self.policy.fetch_rendered(&normalize_url(url)?).await
    }

    pub async fn get_ready_to_scrape(
        &self,
        upload_id: &str,
        limit: usize,
    ) -> Result<Vec<Contact>, ScrapeError> {
        Ok(self.store.list_ready(upload_id, limit).await?)
    }

    /// Move a `scrape_failed` contact back to `ready_to_scrape`.
    pub async fn reset_status(&self, contact_id: &str) -> Result<(), ScrapeError> {
        let contact = self
            .store
            .get_contact(contact_id)
            .await?
            .ok_or_else(|| ScrapeError::InvalidState(format!("contact {} not found", contact_id)))?;

        if contact.status != ContactStatus::ScrapeFailed {
            return Err(ScrapeError::InvalidState(format!(
                "contact {} is {}; only scrape_failed contacts can be reset",
                contact_id, contact.status
            )));
        }
        if !self.store.reset_failed(contact_id).await? {
            return Err(ScrapeError::InvalidState(format!(
                "contact {} changed status during reset",
                contact_id
            )));
        }

        info!("Contact {} reset to ready_to_scrape", contact_id);
        Ok(())
    }

    /// Scrape one contact.
    ///
    /// `confirmed_url` is a website the caller already verified; for
    /// `business_search` contacts it skips the search step.
    pub async fn scrape_one(&self, contact_id: &str, confirmed_url: Option<String>) -> ScrapeReport {
        let contact = match self.store.get_contact(contact_id).await {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                let err = ScrapeError::InvalidState(format!("contact {} not found", contact_id));
                warn!("{}", err);
                return ScrapeReport::rejected(contact_id, None, &err);
            }
            Err(e) => {
                error!("Failed to load contact {}: {}", contact_id, e);
                return ScrapeReport::rejected(contact_id, None, &ScrapeError::Database(e));
            }
        };

        let method = match contact.scrape_method {
            Some(method) if contact.is_scrapable() => method,
            _ => {
                let err = ScrapeError::InvalidState(format!(
                    "contact {} is {} with {} scrape method",
                    contact_id,
                    contact.status,
                    contact.scrape_method.map_or("no", |m| m.as_str())
                ));
                warn!("Rejected scrape: {}", err);
                return ScrapeReport::rejected(contact_id, contact.scrape_method, &err);
            }
        };

        match self.store.claim_for_scraping(contact_id).await {
            Ok(true) => debug!("Contact {} moved to scraping", contact_id),
            Ok(false) => {
                let err = ScrapeError::InvalidState(format!(
                    "contact {} was claimed by another task",
                    contact_id
                ));
                warn!("Rejected scrape: {}", err);
                return ScrapeReport::rejected(contact_id, Some(method), &err);
            }
            Err(e) => {
                error!("Failed to claim contact {}: {}", contact_id, e);
                return ScrapeReport::rejected(contact_id, Some(method), &ScrapeError::Database(e));
            }
        }

        info!("Scraping contact {} via {}", contact_id, method);
        let mut ctx = AttemptContext::default();
        match self
            .acquire(&contact, method, confirmed_url.as_deref(), &mut ctx)
            .await
        {
            Ok(data) => self.finish_success(data, ctx).await,
            Err(err) => self.finish_failure(contact_id, method, &err, ctx).await,
        }
    }

    /// Scrape up to `limit` ready contacts of an upload in concurrent chunks.
    pub async fn scrape_batch(&self, upload_id: &str, limit: usize) -> Result<BatchReport, ScrapeError> {
        let contacts = self.store.list_ready(upload_id, limit).await?;
        let mut report = BatchReport::default();
        if contacts.is_empty() {
            info!("No contacts ready to scrape in upload {}", upload_id);
            return Ok(report);
        }

        let chunk_size = self.settings.batch_concurrency.max(1);
        let chunk_count = contacts.len().div_ceil(chunk_size);
        info!(
            "Scraping {} contacts from upload {} in {} chunks of {}",
            contacts.len(),
            upload_id,
            chunk_count,
            chunk_size
        );

        for (i, chunk) in contacts.chunks(chunk_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.batch_delay()).await;
            }
            let results = join_all(chunk.iter().map(|c| self.scrape_one(&c.id, None))).await;
            for result in results {
                report.push(result);
            }
            info!(
                "Chunk {}/{} done: {} succeeded, {} failed so far",
                i + 1,
                chunk_count,
                report.succeeded,
                report.failed
            );
        }

        Ok(report)
    }

    /// Release fetcher resources (the shared browser).
    pub async fn cleanup(&self) {
        self.policy.cleanup().await;
    }

    async fn acquire(
        &self,
        contact: &Contact,
        method: ScrapeMethod,
        confirmed_url: Option<&str>,
        ctx: &mut AttemptContext,
    ) -> Result<ScrapedData, ScrapeError> {
        let candidates = self
            .resolve_candidates(contact, method, confirmed_url, ctx)
            .await?;
        let homepage = self.fetch_first_candidate(&candidates, ctx).await?;

        let mut data = ScrapedData::success(&contact.id, method, &homepage)
            .with_search_query(ctx.search_query.clone());
        self.collect_secondary_pages(&homepage, &mut data).await;
        Ok(data)
    }

    async fn resolve_candidates(
        &self,
        contact: &Contact,
        method: ScrapeMethod,
        confirmed_url: Option<&str>,
        ctx: &mut AttemptContext,
    ) -> Result<Vec<String>, ScrapeError> {
        match method {
            ScrapeMethod::DirectUrl => {
                let website = non_blank(contact.website.as_deref()).ok_or_else(|| {
                    ScrapeError::Resolution("contact has no website".to_string())
                })?;
                Ok(vec![normalize_url(website)?])
            }
            ScrapeMethod::EmailDomain => {
                let domain = contact.email_domain().ok_or_else(|| {
                    ScrapeError::Resolution("contact has no usable email domain".to_string())
                })?;
                let outcome = self.resolver.search_by_domain(&domain).await?;
                self.candidates_from(outcome, ctx)
            }
            ScrapeMethod::BusinessSearch => {
                if let Some(url) = non_blank(confirmed_url) {
                    info!("Using confirmed URL {} for contact {}", url, contact.id);
                    return Ok(vec![normalize_url(url)?]);
                }
                let name = non_blank(contact.business_name.as_deref()).ok_or_else(|| {
                    ScrapeError::Resolution("contact has no business name".to_string())
                })?;
                let outcome = self
                    .resolver
                    .search_by_business_name(name, contact.state.as_deref(), contact.zip.as_deref())
                    .await?;
                self.candidates_from(outcome, ctx)
            }
        }
    }

    fn candidates_from(
        &self,
        outcome: SearchOutcome,
        ctx: &mut AttemptContext,
    ) -> Result<Vec<String>, ScrapeError> {
        if !outcome.query.is_empty() {
            ctx.search_query = Some(outcome.query.clone());
        }
        if !outcome.query_succeeded {
            return Err(ScrapeError::Resolution(format!(
                "search for {:?} failed",
                outcome.query
            )));
        }
        let candidates: Vec<String> = outcome
            .urls()
            .take(self.settings.max_candidates.max(1))
            .map(str::to_string)
            .collect();
        if candidates.is_empty() {
            return Err(ScrapeError::Resolution(format!(
                "no usable results for {:?}",
                outcome.query
            )));
        }
        debug!("Candidates for {:?}: {:?}", outcome.query, candidates);
        Ok(candidates)
    }

    /// First candidate whose homepage fetch yields a usable page.
    async fn fetch_first_candidate(
        &self,
        candidates: &[String],
        ctx: &mut AttemptContext,
    ) -> Result<PageResult, ScrapeError> {
        let mut last_err = None;
        for (i, url) in candidates.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.settings.page_delay()).await;
            }
            ctx.discovered_url = Some(url.clone());

            match self.policy.fetch_smart(url).await {
                Ok(mut page) => {
                    if page.url.is_empty() {
                        page.url = url.clone();
                    }
                    if page.has_signal() {
                        ctx.discovered_url = Some(page.url.clone());
                        return Ok(page);
                    }
                    warn!("Candidate {} has no readable content", url);
                    last_err = Some(ScrapeError::NoContent(page.url));
                }
                Err(e) => {
                    warn!(
                        "Candidate {}/{} {} failed: {}",
                        i + 1,
                        candidates.len(),
                        url,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ScrapeError::Resolution("no candidate URLs".to_string())))
    }

    /// Fetch classified secondary pages one at a time, then fill signal gaps.
    async fn collect_secondary_pages(&self, homepage: &PageResult, data: &mut ScrapedData) {
        let link_source = self.link_source(homepage).await;
        let pages = discover_pages(&link_source.url, &link_source.markup);
        debug!(
            "Secondary pages for {} ({}): {:?}",
            homepage.url,
            if pages.guessed { "guessed" } else { "linked" },
            pages.targets()
        );

        let mut contact_page = None;
        for (kind, url) in pages.targets() {
            tokio::time::sleep(self.settings.page_delay()).await;
            match self.policy.fetch_smart(url).await {
                Ok(page) if page.has_signal() => {
                    debug!("Fetched {} page {}", kind.as_str(), url);
                    data.set_page(kind, &page);
                    if kind == SourcePage::Contact {
                        contact_page = Some(page);
                    }
                }
                Ok(_) => debug!("{} page {} had no content", kind.as_str(), url),
                Err(e) => debug!("{} page {} failed: {}", kind.as_str(), url, e),
            }
        }

        let filled = enrich_signals(data, &link_source.markup, contact_page.as_ref());
        if filled.any() {
            debug!("Enriched signals for {}: {:?}", homepage.url, filled);
        }
    }

    /// Markup to discover links from. Sparse or script-built homepages get
    /// a rendered re-fetch used only for discovery.
    async fn link_source<'a>(&self, homepage: &'a PageResult) -> Cow<'a, PageResult> {
        if homepage.rendered {
            return Cow::Borrowed(homepage);
        }
        let few_links = homepage.internal_links.len() < self.settings.min_internal_links;
        let spa = self
            .policy
            .detectors()
            .looks_like_spa(&DetectionInput::from_page(homepage));
        if !few_links && !spa {
            return Cow::Borrowed(homepage);
        }

        info!(
            "Rendering {} for link discovery ({} internal links)",
            homepage.url,
            homepage.internal_links.len()
        );
        tokio::time::sleep(self.settings.page_delay()).await;
        match self.policy.fetch_rendered(&homepage.url).await {
            Ok(rendered) if rendered.internal_links.len() > homepage.internal_links.len() => {
                Cow::Owned(rendered)
            }
            Ok(_) => Cow::Borrowed(homepage),
            Err(e) => {
                debug!("Rendered discovery fetch of {} failed: {}", homepage.url, e);
                Cow::Borrowed(homepage)
            }
        }
    }

    async fn finish_success(&self, data: ScrapedData, ctx: AttemptContext) -> ScrapeReport {
        match self.store.insert_scraped_data(&data).await {
            Ok(()) => {
                self.finalize(&data.contact_id, ContactStatus::Scraped).await;
                info!(
                    "Scraped contact {} from {}",
                    data.contact_id,
                    data.discovered_url.as_deref().unwrap_or("-")
                );
                ScrapeReport::from_data(&data, None)
            }
            Err(e) => {
                error!("Failed to save scrape result for {}: {}", data.contact_id, e);
                self.finish_failure(&data.contact_id, data.method, &ScrapeError::Database(e), ctx)
                    .await
            }
        }
    }

    async fn finish_failure(
        &self,
        contact_id: &str,
        method: ScrapeMethod,
        err: &ScrapeError,
        ctx: AttemptContext,
    ) -> ScrapeReport {
        warn!("Scrape failed for contact {}: {}", contact_id, err);
        let data = ScrapedData::failure(contact_id, method, err.user_message())
            .with_search_query(ctx.search_query)
            .with_discovered_url(ctx.discovered_url);

        let saved = match self.store.insert_scraped_data(&data).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save failure record for {}: {}", contact_id, e);
                false
            }
        };
        self.finalize(contact_id, ContactStatus::ScrapeFailed).await;

        let mut report = ScrapeReport::from_data(&data, Some(err.to_string()));
        if !saved {
            report.scraped_data_id = None;
        }
        report
    }

    /// Final status write. Errors are logged; the attempt is over either way.
    async fn finalize(&self, contact_id: &str, status: ContactStatus) {
        match self.store.set_status(contact_id, &status).await {
            Ok(true) => debug!("Contact {} moved to {}", contact_id, status),
            Ok(false) => warn!("Contact {} disappeared before status {}", contact_id, status),
            Err(e) => error!("Failed to set contact {} to {}: {}", contact_id, status, e),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn stock_fetchers(
    config: &Config,
    detectors: &Arc<DetectorSet>,
) -> (Arc<HttpFetcher>, Arc<BrowserFetcher>) {
    let proxies = Arc::new(ProxyPool::new(config.proxy_configs()));
    if proxies.has_proxies() {
        info!("Using {} proxies", proxies.len());
    } else {
        info!("No proxies configured, fetching directly");
    }

    let static_fetcher = Arc::new(HttpFetcher::new(proxies.clone(), &config.scraper));
    let rendered_fetcher = Arc::new(
        BrowserFetcher::new(config.browser.clone(), proxies, &config.scraper)
            .with_detectors(detectors.clone()),
    );
    (static_fetcher, rendered_fetcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{SearchError, SearchPage, SearchProvider, SearchResult};
    use crate::repository::DieselDbContext;
    use crate::scrapers::TransportKind;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    /// Serves canned pages by URL and records what was asked for.
    #[derive(Default)]
    struct SiteFake {
        pages: HashMap<String, PageResult>,
        requests: Mutex<Vec<String>>,
    }

    impl SiteFake {
        fn with_page(mut self, url: &str, markup: &str) -> Self {
            let page = crate::scrapers::extract::parse_page(url, markup);
            self.pages.insert(url.to_string(), page);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for SiteFake {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch(&self, url: &str) -> Result<PageResult, ScrapeError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or(ScrapeError::HttpStatus(404))
        }
    }

    struct NoBrowser;

    #[async_trait]
    impl PageFetcher for NoBrowser {
        fn name(&self) -> &str {
            "no-browser"
        }

        async fn fetch(&self, _url: &str) -> Result<PageResult, ScrapeError> {
            Err(ScrapeError::Browser("not available in tests".to_string()))
        }
    }

    struct SlowSite;

    #[async_trait]
    impl PageFetcher for SlowSite {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, _url: &str) -> Result<PageResult, ScrapeError> {
            Err(ScrapeError::transport(TransportKind::Timeout, "operation timed out"))
        }
    }

    struct OneResult(&'static str);

    #[async_trait]
    impl SearchProvider for OneResult {
        fn name(&self) -> &str {
            "one"
        }

        async fn search(&self, _query: &str) -> Result<SearchPage, SearchError> {
            Ok(SearchPage {
                results: vec![SearchResult::new(self.0, "Acme")],
                total_results: 1,
            })
        }
    }

    const HOME: &str = r#"<html><head><title>Acme Plumbing</title></head><body>
        <nav><a href="/services">Services</a><a href="/about">About</a>
        <a href="/reach-us">Get In Touch</a></nav>
        <main>Acme Plumbing has fixed pipes across the Bay Area since 1984.</main>
        <footer>Call (415) 555-0199</footer></body></html>"#;

    const CONTACT: &str = r#"<html><body><main>Email hello@acme.test to book a visit.</main></body></html>"#;

    const SERVICES: &str = r#"<html><body><main>Drain cleaning and water heaters.</main></body></html>"#;

    fn acme_site() -> SiteFake {
        SiteFake::default()
            .with_page("https://acme.test/", HOME)
            .with_page("https://acme.test/services", SERVICES)
            .with_page("https://acme.test/reach-us", CONTACT)
    }

    fn settings() -> ScraperSettings {
        ScraperSettings {
            min_internal_links: 0,
            ..ScraperSettings::default()
        }
        .without_delays()
    }

    async fn store() -> (TempDir, Arc<DieselDbContext>) {
        let dir = tempdir().unwrap();
        let ctx = DieselDbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        (dir, Arc::new(ctx))
    }

    fn service(
        store: Arc<DieselDbContext>,
        static_fetcher: Arc<dyn PageFetcher>,
        resolver: SearchResolver,
    ) -> ScrapingService<DieselDbContext> {
        ScrapingService::new(
            store,
            static_fetcher,
            Arc::new(NoBrowser),
            Arc::new(resolver),
            settings(),
        )
        // Fixture pages are short; only judge them by markup.
        .with_detectors(DetectorSet::empty())
    }

    async fn status_of(store: &DieselDbContext, id: &str) -> ContactStatus {
        store.get_contact(id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_direct_url_collects_pages_and_enriches() {
        let (_dir, store) = store().await;
        let contact = Contact::new("u1", ScrapeMethod::DirectUrl).with_website("acme.test");
        store.contacts().insert(&contact).await.unwrap();

        let site = Arc::new(acme_site());
        let svc = service(store.clone(), site.clone(), SearchResolver::unconfigured());
        let report = svc.scrape_one(&contact.id, None).await;

        assert!(report.success, "{:?}", report);
        assert_eq!(status_of(&store, &contact.id).await, ContactStatus::Scraped);

        let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.method, ScrapeMethod::DirectUrl);
        assert_eq!(row.contact_url.as_deref(), Some("https://acme.test/reach-us"));
        assert_eq!(row.services_url.as_deref(), Some("https://acme.test/services"));
        assert!(row.products_url.is_none());
        assert_eq!(row.phones, vec!["(415) 555-0199"]);
        assert_eq!(row.emails, vec!["hello@acme.test"]);
        assert_eq!(
            site.requests(),
            vec![
                "https://acme.test/",
                "https://acme.test/services",
                "https://acme.test/reach-us"
            ]
        );
    }

    #[tokio::test]
    async fn test_email_domain_records_query_and_url() {
        let (_dir, store) = store().await;
        let contact = Contact::new("u1", ScrapeMethod::EmailDomain).with_email("jane@acme.test");
        store.contacts().insert(&contact).await.unwrap();

        let resolver = SearchResolver::new(Arc::new(OneResult("https://acme.test/")), Duration::ZERO);
        let svc = service(store.clone(), Arc::new(acme_site()), resolver);
        let report = svc.scrape_one(&contact.id, None).await;

        assert!(report.success);
        assert_eq!(report.url.as_deref(), Some("https://acme.test/"));
        let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
        assert_eq!(rows[0].search_query.as_deref(), Some("site:acme.test"));
        assert_eq!(rows[0].method, ScrapeMethod::EmailDomain);
    }

    #[tokio::test]
    async fn test_confirmed_url_skips_search() {
        let (_dir, store) = store().await;
        let contact = Contact::new("u1", ScrapeMethod::BusinessSearch).with_business_name("Acme Plumbing");
        store.contacts().insert(&contact).await.unwrap();

        let svc = service(store.clone(), Arc::new(acme_site()), SearchResolver::unconfigured());
        let report = svc
            .scrape_one(&contact.id, Some("https://acme.test/".to_string()))
            .await;

        assert!(report.success, "{:?}", report);
        let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
        assert!(rows[0].search_query.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_search_fails_the_attempt() {
        let (_dir, store) = store().await;
        let contact = Contact::new("u1", ScrapeMethod::BusinessSearch).with_business_name("Acme Plumbing");
        store.contacts().insert(&contact).await.unwrap();

        let svc = service(store.clone(), Arc::new(acme_site()), SearchResolver::unconfigured());
        let report = svc.scrape_one(&contact.id, None).await;

        assert!(!report.success);
        assert!(report.error.unwrap().contains("not configured"));
        assert_eq!(status_of(&store, &contact.id).await, ContactStatus::ScrapeFailed);
    }

    #[tokio::test]
    async fn test_timeout_is_explained_in_plain_language() {
        let (_dir, store) = store().await;
        let contact = Contact::new("u1", ScrapeMethod::DirectUrl).with_website("https://slow.test");
        store.contacts().insert(&contact).await.unwrap();

        let svc = service(store.clone(), Arc::new(SlowSite), SearchResolver::unconfigured());
        let report = svc.scrape_one(&contact.id, None).await;

        assert!(!report.success);
        assert!(report.scraped_data_id.is_some());
        let rows = store.scraped_data().list_for_contact(&contact.id).await.unwrap();
        assert!(!rows[0].scrape_success);
        assert!(rows[0].error_message.as_deref().unwrap().contains("took too long"));
        assert_eq!(rows[0].discovered_url.as_deref(), Some("https://slow.test/"));
        assert_eq!(status_of(&store, &contact.id).await, ContactStatus::ScrapeFailed);
    }

    #[tokio::test]
    async fn test_rejected_contacts_are_untouched() {
        let (_dir, store) = store().await;
        let mut pending = Contact::new("u1", ScrapeMethod::DirectUrl).with_website("acme.test");
        pending.status = ContactStatus::Other("pending".to_string());
        store.contacts().insert(&pending).await.unwrap();

        let mut no_method = Contact::new("u1", ScrapeMethod::DirectUrl).with_website("acme.test");
        no_method.scrape_method = None;
        store.contacts().insert(&no_method).await.unwrap();

        let svc = service(store.clone(), Arc::new(acme_site()), SearchResolver::unconfigured());
        for id in [&pending.id, &no_method.id] {
            let report = svc.scrape_one(id, None).await;
            assert!(!report.success);
            assert!(report.scraped_data_id.is_none());
            assert!(store.scraped_data().list_for_contact(id).await.unwrap().is_empty());
        }
        assert_eq!(
            status_of(&store, &pending.id).await,
            ContactStatus::Other("pending".to_string())
        );
        assert_eq!(status_of(&store, &no_method.id).await, ContactStatus::ReadyToScrape);

        let missing = svc.scrape_one("nope", None).await;
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn test_reset_only_from_failed() {
        let (_dir, store) = store().await;
        let contact = Contact::new("u1", ScrapeMethod::DirectUrl).with_website("https://slow.test");
        store.contacts().insert(&contact).await.unwrap();

        let svc = service(store.clone(), Arc::new(SlowSite), SearchResolver::unconfigured());
        assert!(matches!(
            svc.reset_status(&contact.id).await,
            Err(ScrapeError::InvalidState(_))
        ));

        svc.scrape_one(&contact.id, None).await;
        svc.reset_status(&contact.id).await.unwrap();
        assert_eq!(status_of(&store, &contact.id).await, ContactStatus::ReadyToScrape);
        assert!(matches!(
            svc.reset_status("missing").await,
            Err(ScrapeError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_scrapes_every_ready_contact() {
        let (_dir, store) = store().await;
        for _ in 0..7 {
            let contact = Contact::new("u1", ScrapeMethod::DirectUrl).with_website("acme.test");
            store.contacts().insert(&contact).await.unwrap();
        }
        let other = Contact::new("u2", ScrapeMethod::DirectUrl).with_website("acme.test");
        store.contacts().insert(&other).await.unwrap();

        let svc = service(store.clone(), Arc::new(acme_site()), SearchResolver::unconfigured());
        assert_eq!(svc.get_ready_to_scrape("u1", 100).await.unwrap().len(), 7);

        let report = svc.scrape_batch("u1", 6).await.unwrap();
        assert_eq!(report.attempted, 6);
        assert_eq!(report.succeeded, 6);
        assert_eq!(svc.get_ready_to_scrape("u1", 100).await.unwrap().len(), 1);
        assert_eq!(status_of(&store, &other.id).await, ContactStatus::ReadyToScrape);
    }

    #[test]
    fn test_stock_fetchers_share_detectors() {
        let detectors = Arc::new(DetectorSet::empty());
        let (_static_fetcher, rendered) = stock_fetchers(&Config::default(), &detectors);
        assert!(Arc::ptr_eq(rendered.detectors(), &detectors));
    }

    #[tokio::test]
    async fn test_custom_detectors_reach_the_policy() {
        let (_dir, store) = store().await;
        let challenge = crate::scrapers::extract::parse_page(
            "https://acme.test/",
            "<html><head><title>Just a moment...</title></head><body></body></html>",
        );
        let input = DetectionInput::from_page(&challenge);

        let stock = ScrapingService::from_config(store.clone(), &Config::default());
        assert!(stock.policy.detectors().is_challenge(&input));

        let custom = ScrapingService::from_config_with_detectors(
            store,
            &Config::default(),
            DetectorSet::empty(),
        );
        assert!(!custom.policy.detectors().is_challenge(&input));
    }
}

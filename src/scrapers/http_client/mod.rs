//! Static HTTP fetcher with proxy rotation and browser-like headers.

mod user_agent;

pub use user_agent::{random_chrome_user_agent, resolve_user_agent, IMPERSONATE_USER_AGENTS};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use super::detection::ChallengeDetector;
use super::extract;
use super::proxy_pool::{ProxyPool, ProxySlot};
use super::rotation::{fetch_with_rotation, RotationPolicy};
use super::{PageFetcher, ScrapeError, TransportKind};
use crate::config::ScraperSettings;
use crate::models::PageResult;

/// Statuses that anti-bot layers answer with.
const CHALLENGE_STATUSES: &[u16] = &[403, 429, 503];

/// Plain HTTP(S) fetcher. Cheap and fast; the first choice for every page.
pub struct HttpFetcher {
    proxies: Arc<ProxyPool>,
    timeout: Duration,
    rotation: RotationPolicy,
    user_agent: Option<String>,
}

impl HttpFetcher {
    pub fn new(proxies: Arc<ProxyPool>, settings: &ScraperSettings) -> Self {
        Self {
            proxies,
            timeout: settings.static_timeout(),
            rotation: RotationPolicy::from_settings(settings),
            user_agent: settings.user_agent.clone(),
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_client(&self, slot: Option<&ProxySlot>) -> Result<Client, ScrapeError> {
        let mut builder = Client::builder()
            .user_agent(resolve_user_agent(self.user_agent.as_deref()))
            .default_headers(browser_headers())
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5));

        builder = match slot {
            Some(slot) => {
                let proxy = reqwest::Proxy::all(slot.config.url_with_credentials()).map_err(
                    |e| {
                        ScrapeError::transport(
                            TransportKind::Other,
                            format!("invalid proxy {}: {}", slot.config, e),
                        )
                    },
                )?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        builder.build().map_err(|e| ScrapeError::from_reqwest(&e))
    }

    async fn attempt(&self, url: &str, slot: Option<&ProxySlot>) -> Result<PageResult, ScrapeError> {
        let client = self.build_client(slot)?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| ScrapeError::from_reqwest(&e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::from_reqwest(&e))?;

        if !status.is_success() {
            if CHALLENGE_STATUSES.contains(&status.as_u16()) {
                if let Some(phrase) = ChallengeDetector::phrase_in(&body) {
                    return Err(ScrapeError::Blocked(format!(
                        "{} returned {} with \"{}\"",
                        url, status, phrase
                    )));
                }
            }
            return Err(ScrapeError::HttpStatus(status.as_u16()));
        }

        Ok(extract::parse_page(&final_url, &body))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, url: &str) -> Result<PageResult, ScrapeError> {
        let url = extract::normalize_url(url)?;
        let target = url.as_str();
        fetch_with_rotation(
            &self.proxies,
            self.rotation,
            "Static",
            target,
            move |slot| async move { self.attempt(target, slot.as_ref()).await },
        )
        .await
    }
}

/// Header set of a desktop browser on a top-level navigation.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate, br"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers
}

//! Page fetchers for business websites.
//!
//! Two implementations share one contract: [`HttpFetcher`] for plain HTML
//! and [`BrowserFetcher`] for pages that need a real browser.

pub mod browser;
pub mod detection;
mod error;
pub mod extract;
mod http_client;
pub mod proxy_pool;
mod rotation;

use async_trait::async_trait;

pub use browser::{BrowserEngineConfig, BrowserFetcher, ChallengeOutcome};
pub use detection::{ChallengeDetector, DetectionInput, DetectorSet, PageDetector, SpaDetector};
pub use error::{error_chain, ScrapeError, TransportKind};
pub use http_client::{resolve_user_agent, HttpFetcher, IMPERSONATE_USER_AGENTS};
pub use proxy_pool::{ProxyConfig, ProxyPool, ProxySlot};

use crate::models::PageResult;

/// Fetch a URL and extract its signals.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn fetch(&self, url: &str) -> Result<PageResult, ScrapeError>;

    /// Release long-lived resources. Called once at shutdown.
    async fn cleanup(&self) {}
}

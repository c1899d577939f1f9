//! Static-first fetch policy with rendered fallback.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::PageResult;
use crate::scrapers::{DetectionInput, DetectorSet, PageFetcher, ScrapeError};

/// Chooses between the static and rendered fetchers for one URL.
#[derive(Clone)]
pub struct FetchPolicy {
    static_fetcher: Arc<dyn PageFetcher>,
    rendered_fetcher: Arc<dyn PageFetcher>,
    detectors: Arc<DetectorSet>,
}

impl FetchPolicy {
    pub fn new(
        static_fetcher: Arc<dyn PageFetcher>,
        rendered_fetcher: Arc<dyn PageFetcher>,
        detectors: Arc<DetectorSet>,
    ) -> Self {
        Self {
            static_fetcher,
            rendered_fetcher,
            detectors,
        }
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// Rendered fetch only, used to improve link discovery.
    pub async fn fetch_rendered(&self, url: &str) -> Result<PageResult, ScrapeError> {
        self.rendered_fetcher.fetch(url).await
    }

    pub async fn cleanup(&self) {
        self.static_fetcher.cleanup().await;
        self.rendered_fetcher.cleanup().await;
    }

    /// Static first. Falls back to the browser when the static fetch fails
    /// or the page looks like it needs scripts to show content.
    pub async fn fetch_smart(&self, url: &str) -> Result<PageResult, ScrapeError> {
        match self.static_fetcher.fetch(url).await {
            Ok(page) => {
                let input = DetectionInput::from_page(&page);
                let Some(detector) = self.detectors.spa_match(&input) else {
                    return Ok(page);
                };
                info!("{} looks client-rendered ({}), rendering", url, detector);
                match self.rendered_fetcher.fetch(url).await {
                    Ok(rendered) if rendered.has_signal() || !page.has_signal() => Ok(rendered),
                    Ok(_) => {
                        debug!("Rendered {} had no more signal, keeping static copy", url);
                        Ok(page)
                    }
                    Err(e) => {
                        warn!("Rendered fetch of {} failed, keeping static copy: {}", url, e);
                        Ok(page)
                    }
                }
            }
            Err(static_err) if !falls_back(&static_err) => Err(static_err),
            Err(static_err) => {
                info!(
                    "Static fetch of {} failed ({}), trying {}",
                    url,
                    static_err,
                    self.rendered_fetcher.name()
                );
                match self.rendered_fetcher.fetch(url).await {
                    Ok(page) => Ok(page),
                    // Browser missing or broken says nothing about the site.
                    Err(ScrapeError::Browser(detail)) => {
                        warn!("Rendered fetch unavailable for {}: {}", url, detail);
                        Err(static_err)
                    }
                    Err(rendered_err) => Err(rendered_err),
                }
            }
        }
    }
}

/// Whether a static failure is worth a browser attempt.
fn falls_back(err: &ScrapeError) -> bool {
    !matches!(
        err,
        ScrapeError::HttpStatus(404 | 410)
            | ScrapeError::Resolution(_)
            | ScrapeError::NotConfigured(_)
            | ScrapeError::InvalidState(_)
            | ScrapeError::Database(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::TransportKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        result: Result<PageResult, fn() -> ScrapeError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn page(content: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(PageResult {
                    url: "https://acme.test/".to_string(),
                    content: content.to_string(),
                    ..Default::default()
                }),
                calls: AtomicUsize::new(0),
            })
        }

        fn error(make: fn() -> ScrapeError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(make),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _url: &str) -> Result<PageResult, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(page) => Ok(page.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn long_text() -> String {
        "Acme Plumbing has served the Bay Area for forty years. ".repeat(10)
    }

    fn policy(static_fetcher: Arc<Fixed>, rendered: Arc<Fixed>) -> FetchPolicy {
        FetchPolicy::new(static_fetcher, rendered, Arc::new(DetectorSet::default()))
    }

    #[tokio::test]
    async fn test_static_page_is_used_when_substantial() {
        let static_fetcher = Fixed::page(&long_text());
        let rendered = Fixed::page("rendered");
        let page = policy(static_fetcher.clone(), rendered.clone())
            .fetch_smart("acme.test")
            .await
            .unwrap();
        assert!(page.content.starts_with("Acme Plumbing"));
        assert_eq!(rendered.calls(), 0);
    }

    #[tokio::test]
    async fn test_thin_page_is_rendered() {
        let rendered = Fixed::page(&long_text());
        let page = policy(Fixed::page("Loading..."), rendered.clone())
            .fetch_smart("acme.test")
            .await
            .unwrap();
        assert_eq!(rendered.calls(), 1);
        assert!(page.content.starts_with("Acme Plumbing"));
    }

    #[tokio::test]
    async fn test_static_copy_kept_when_render_fails() {
        let page = policy(
            Fixed::page("Loading..."),
            Fixed::error(|| ScrapeError::Browser("no chrome".to_string())),
        )
        .fetch_smart("acme.test")
        .await
        .unwrap();
        assert_eq!(page.content, "Loading...");
    }

    #[tokio::test]
    async fn test_blocked_static_falls_back() {
        let rendered = Fixed::page(&long_text());
        let result = policy(
            Fixed::error(|| ScrapeError::Blocked("challenge".to_string())),
            rendered.clone(),
        )
        .fetch_smart("acme.test")
        .await;
        assert!(result.is_ok());
        assert_eq!(rendered.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_does_not_fall_back() {
        let rendered = Fixed::page(&long_text());
        let err = policy(Fixed::error(|| ScrapeError::HttpStatus(404)), rendered.clone())
            .fetch_smart("acme.test/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::HttpStatus(404)));
        assert_eq!(rendered.calls(), 0);
    }

    #[tokio::test]
    async fn test_static_error_reported_when_browser_unavailable() {
        let err = policy(
            Fixed::error(|| ScrapeError::transport(TransportKind::Timeout, "slow")),
            Fixed::error(|| ScrapeError::Browser("no chrome".to_string())),
        )
        .fetch_smart("acme.test")
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::Transport {
                kind: TransportKind::Timeout,
                ..
            }
        ));
    }
}

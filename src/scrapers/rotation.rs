//! Proxy rotation shared by the static and rendered fetchers.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::proxy_pool::{ProxyPool, ProxySlot};
use super::{ScrapeError, TransportKind};
use crate::config::ScraperSettings;

/// How many proxies one fetch may use and how long to wait between them.
#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    pub max_attempts: usize,
    pub retry_delay: Duration,
}

impl RotationPolicy {
    pub fn from_settings(settings: &ScraperSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            retry_delay: settings.proxy_retry_delay(),
        }
    }
}

/// Run `attempt` through successive proxies from `proxies`.
///
/// A failure marks the proxy it went through as failed and moves on to the
/// next one. A block is a property of the site, not the proxy: it ends the
/// loop at once and the proxy stays in rotation.
pub async fn fetch_with_rotation<T, F, Fut>(
    proxies: &ProxyPool,
    policy: RotationPolicy,
    fetcher: &str,
    url: &str,
    mut attempt: F,
) -> Result<T, ScrapeError>
where
    F: FnMut(Option<ProxySlot>) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let attempts = proxies.attempt_budget(policy.max_attempts);
    let mut last_error = None;

    for n in 1..=attempts {
        let slot = proxies.next();
        if let Some(slot) = slot.as_ref().filter(|s| s.after_reset) {
            let backoff = proxies.reset_backoff();
            info!(
                "Proxy pool was reset, backing off {:?} before using {}",
                backoff, slot.config
            );
            tokio::time::sleep(backoff).await;
        }

        debug!(
            "{} fetch {} (attempt {}/{}, proxy: {})",
            fetcher,
            url,
            n,
            attempts,
            slot.as_ref()
                .map(|s| s.config.to_string())
                .unwrap_or_else(|| "direct".to_string())
        );

        match attempt(slot.clone()).await {
            Ok(value) => {
                if let Some(slot) = &slot {
                    proxies.mark_succeeded(slot);
                }
                return Ok(value);
            }
            Err(e) if e.is_blocked() => {
                warn!("{} fetch of {} blocked: {}", fetcher, url, e);
                return Err(e);
            }
            Err(e) => {
                match &slot {
                    Some(slot) => {
                        if matches!(
                            e,
                            ScrapeError::Transport {
                                kind: TransportKind::Tls,
                                ..
                            }
                        ) {
                            warn!(
                                "Proxy {} failed TLS for {}; it likely cannot terminate HTTPS",
                                slot.config, url
                            );
                        } else {
                            warn!("{} fetch of {} via {} failed: {}", fetcher, url, slot.config, e);
                        }
                        proxies.mark_failed(slot);
                    }
                    None => warn!("{} fetch of {} failed: {}", fetcher, url, e),
                }
                last_error = Some(e);
                if n < attempts {
                    tokio::time::sleep(policy.retry_delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ScrapeError::transport(TransportKind::Other, format!("no attempts made for {}", url))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::ProxyConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const URL: &str = "https://acme.test/";

    fn two_proxies() -> ProxyPool {
        ProxyPool::new(vec![
            ProxyConfig::parse("10.0.0.1:8080").unwrap(),
            ProxyConfig::parse("10.0.0.2:8080").unwrap(),
        ])
    }

    fn policy() -> RotationPolicy {
        RotationPolicy {
            max_attempts: 2,
            retry_delay: Duration::ZERO,
        }
    }

    fn timeout() -> ScrapeError {
        ScrapeError::transport(TransportKind::Timeout, "operation timed out")
    }

    #[tokio::test]
    async fn test_block_ends_rotation_and_keeps_proxy() {
        let pool = two_proxies();
        let calls = AtomicUsize::new(0);

        let result: Result<(), ScrapeError> =
            fetch_with_rotation(&pool, policy(), "Rendered", URL, |_slot| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ScrapeError::Blocked("challenge did not clear".to_string())) }
            })
            .await;

        assert!(result.unwrap_err().is_blocked());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_marks_proxy_and_rotates() {
        let pool = two_proxies();
        let seen = Mutex::new(Vec::new());

        let result = fetch_with_rotation(&pool, policy(), "Rendered", URL, |slot| {
            let mut seen = seen.lock().unwrap();
            seen.push(slot.map(|s| s.index));
            let first = seen.len() == 1;
            async move {
                if first {
                    Err(timeout())
                } else {
                    Ok("page")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(*seen.lock().unwrap(), vec![Some(0), Some(1)]);
        assert_eq!(pool.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_block_after_failure_stops_early() {
        let pool = ProxyPool::new(
            (1..=3)
                .map(|i| ProxyConfig::parse(&format!("10.0.0.{}:8080", i)).unwrap())
                .collect(),
        );
        let calls = AtomicUsize::new(0);
        let policy = RotationPolicy {
            max_attempts: 3,
            retry_delay: Duration::ZERO,
        };

        let result: Result<(), ScrapeError> =
            fetch_with_rotation(&pool, policy, "Rendered", URL, |_slot| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(timeout())
                    } else {
                        Err(ScrapeError::Blocked("just a moment".to_string()))
                    }
                }
            })
            .await;

        assert!(result.unwrap_err().is_blocked());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_last_error() {
        let pool = two_proxies();
        let calls = AtomicUsize::new(0);

        let result: Result<(), ScrapeError> =
            fetch_with_rotation(&pool, policy(), "Static", URL, |_slot| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(timeout())
                    } else {
                        Err(ScrapeError::HttpStatus(502))
                    }
                }
            })
            .await;

        assert!(matches!(result.unwrap_err(), ScrapeError::HttpStatus(502)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.failed_count(), 2);
    }

    #[tokio::test]
    async fn test_browser_errors_also_rotate() {
        let pool = two_proxies();
        let calls = AtomicUsize::new(0);

        let result = fetch_with_rotation(&pool, policy(), "Rendered", URL, |_slot| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ScrapeError::Browser("context creation failed".to_string()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(pool.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_direct_connection_gets_one_attempt() {
        let pool = ProxyPool::empty();
        let calls = AtomicUsize::new(0);

        let result: Result<(), ScrapeError> =
            fetch_with_rotation(&pool, policy(), "Static", URL, |slot| {
                assert!(slot.is_none());
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(timeout()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pool.failed_count(), 0);
    }
}

//! Rendered fetcher for JavaScript-built and bot-protected sites.
//!
//! Uses chromiumoxide (CDP). One browser process is shared by every task;
//! each fetch gets its own browser context so proxies, cookies and storage
//! never leak between contacts.

mod challenge;
mod config;
mod stealth;

pub use challenge::{negotiate, ChallengeOutcome, ChallengePage, ChallengePolicy, PageSnapshot};
pub use config::BrowserEngineConfig;

use std::sync::Arc;

use async_trait::async_trait;

use super::detection::DetectorSet;
use super::proxy_pool::ProxyPool;
use super::{PageFetcher, ScrapeError};
use crate::config::ScraperSettings;
use crate::models::PageResult;

#[cfg(feature = "browser")]
pub use imp::BrowserFetcher;

#[cfg(feature = "browser")]
mod imp {
    use super::*;

    use std::time::Duration;

    use chromiumoxide::cdp::browser_protocol::emulation::{
        SetDeviceMetricsOverrideParams, SetGeolocationOverrideParams, SetLocaleOverrideParams,
        SetTimezoneOverrideParams,
    };
    use chromiumoxide::cdp::browser_protocol::fetch::{
        self, AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
        ContinueWithAuthParams, EventAuthRequired, EventRequestPaused, FailRequestParams,
        RequestPattern,
    };
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchMouseEventParams, DispatchMouseEventType,
    };
    use chromiumoxide::cdp::browser_protocol::network::{
        ErrorReason, ResourceType, SetUserAgentOverrideParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
    };
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams,
        DisposeBrowserContextParams,
    };
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use rand::Rng;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    use super::stealth::{random_viewport, STEALTH_SCRIPTS};
    use crate::scrapers::extract;
    use crate::scrapers::http_client::random_chrome_user_agent;
    use crate::scrapers::proxy_pool::ProxySlot;
    use crate::scrapers::rotation::{fetch_with_rotation, RotationPolicy};
    use crate::scrapers::TransportKind;

    /// Search engine referer sent with every navigation.
    const REFERRER: &str = "https://www.google.com/";

    /// Wait for the document to be interactive.
    const WAIT_FOR_READY_SCRIPT: &str = r#"
        new Promise((resolve) => {
            if (document.readyState === 'complete' || document.readyState === 'interactive') {
                resolve(document.readyState);
            } else {
                document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                setTimeout(() => resolve('timeout'), 10000);
            }
        })
    "#;

    /// Settings the rendered fetcher takes from [`ScraperSettings`].
    #[derive(Debug, Clone)]
    struct RenderTiming {
        navigation_timeout: Duration,
        rotation: RotationPolicy,
        challenge: ChallengePolicy,
    }

    impl RenderTiming {
        fn from_settings(settings: &ScraperSettings) -> Self {
            Self {
                navigation_timeout: settings.navigation_timeout(),
                rotation: RotationPolicy::from_settings(settings),
                challenge: ChallengePolicy {
                    timeout: settings.challenge_timeout(),
                    poll: settings.challenge_poll(),
                    ..ChallengePolicy::default()
                },
            }
        }
    }

    struct SharedBrowser {
        browser: Arc<Browser>,
        handler: JoinHandle<()>,
    }

    /// Browser-based fetcher with stealth and challenge negotiation.
    pub struct BrowserFetcher {
        config: BrowserEngineConfig,
        proxies: Arc<ProxyPool>,
        detectors: Arc<DetectorSet>,
        timing: RenderTiming,
        browser: Mutex<Option<SharedBrowser>>,
    }

    impl BrowserFetcher {
        /// Common Chrome executable paths to check.
        const CHROME_PATHS: &'static [&'static str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/google/chrome/google-chrome",
        ];

        pub fn new(
            config: BrowserEngineConfig,
            proxies: Arc<ProxyPool>,
            settings: &ScraperSettings,
        ) -> Self {
            Self {
                config,
                proxies,
                detectors: Arc::new(DetectorSet::default()),
                timing: RenderTiming::from_settings(settings),
                browser: Mutex::new(None),
            }
        }

        /// Challenge predicates used while negotiating interstitials.
        pub fn with_detectors(mut self, detectors: Arc<DetectorSet>) -> Self {
            self.detectors = detectors;
            self
        }

        pub fn detectors(&self) -> &Arc<DetectorSet> {
            &self.detectors
        }

        fn find_chrome(&self) -> Result<std::path::PathBuf, ScrapeError> {
            if let Some(path) = &self.config.chrome_path {
                return Ok(path.clone());
            }
            for path in Self::CHROME_PATHS {
                let p = std::path::Path::new(path);
                if p.exists() {
                    info!("Found Chrome at: {}", path);
                    return Ok(p.to_path_buf());
                }
            }
            for cmd in [
                "google-chrome",
                "google-chrome-stable",
                "chromium",
                "chromium-browser",
            ] {
                if let Ok(path) = which::which(cmd) {
                    info!("Found Chrome in PATH: {}", path.display());
                    return Ok(path);
                }
            }
            Err(ScrapeError::Browser(
                "Chrome/Chromium not found; install it or set BROWSER_URL".to_string(),
            ))
        }

        /// Launch or connect to the shared browser if not already running.
        async fn ensure_browser(&self) -> Result<Arc<Browser>, ScrapeError> {
            let mut guard = self.browser.lock().await;
            if let Some(shared) = guard.as_ref() {
                return Ok(shared.browser.clone());
            }

            let (browser, mut handler) = match self.config.remote_url.clone() {
                Some(url) => self.connect_remote(&url).await?,
                None => self.launch().await?,
            };

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let browser = Arc::new(browser);
            *guard = Some(SharedBrowser {
                browser: browser.clone(),
                handler,
            });
            Ok(browser)
        }

        async fn launch(&self) -> Result<(Browser, chromiumoxide::Handler), ScrapeError> {
            info!("Launching browser (headless={})", self.config.headless);
            let chrome_path = self.find_chrome()?;

            let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
            if !self.config.headless {
                builder = builder.with_head();
            }

            builder = builder
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-infobars")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-default-browser-check")
                .arg("--disable-background-networking")
                .arg("--disable-sync")
                .arg("--disable-translate")
                .arg("--no-sandbox")
                .arg("--disable-gpu")
                .arg(format!("--lang={}", self.config.locale));
            for arg in &self.config.chrome_args {
                builder = builder.arg(arg);
            }

            let config = builder
                .build()
                .map_err(|e| ScrapeError::Browser(format!("invalid browser config: {}", e)))?;

            Browser::launch(config)
                .await
                .map_err(|e| ScrapeError::Browser(format!("failed to launch browser: {}", e)))
        }

        /// Connect to a remote Chrome via its `/json/version` endpoint.
        async fn connect_remote(
            &self,
            url: &str,
        ) -> Result<(Browser, chromiumoxide::Handler), ScrapeError> {
            info!("Connecting to remote browser at {}", url);

            let http_url = url
                .replace("ws://", "http://")
                .replace("wss://", "https://");
            let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

            let version: serde_json::Value = reqwest::Client::new()
                .get(&version_url)
                .send()
                .await
                .map_err(|e| ScrapeError::Browser(format!("remote browser unreachable: {}", e)))?
                .json()
                .await
                .map_err(|e| ScrapeError::Browser(format!("bad version info: {}", e)))?;

            let ws_url = version
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    ScrapeError::Browser("no webSocketDebuggerUrl in response".to_string())
                })?;

            let handler_config = chromiumoxide::handler::HandlerConfig {
                request_timeout: self.timing.navigation_timeout,
                ..Default::default()
            };

            Browser::connect_with_config(ws_url, handler_config)
                .await
                .map_err(|e| ScrapeError::Browser(format!("failed to connect: {}", e)))
        }

        /// One attempt in a fresh context. The page and context are released
        /// on every path.
        async fn fetch_in_context(
            &self,
            browser: &Browser,
            url: &str,
            slot: Option<&ProxySlot>,
        ) -> Result<PageResult, ScrapeError> {
            let mut params = CreateBrowserContextParams::builder().dispose_on_detach(true);
            if let Some(slot) = slot {
                params = params.proxy_server(slot.config.server.clone());
            }
            let context_id = browser
                .execute(params.build())
                .await
                .map_err(|e| ScrapeError::Browser(format!("create context: {}", e)))?
                .result
                .browser_context_id;

            let result = self.fetch_in_page(browser, &context_id, url, slot).await;

            if let Err(e) = browser
                .execute(DisposeBrowserContextParams::new(context_id))
                .await
            {
                debug!("Failed to dispose browser context: {}", e);
            }

            result
        }

        async fn fetch_in_page(
            &self,
            browser: &Browser,
            context_id: &BrowserContextId,
            url: &str,
            slot: Option<&ProxySlot>,
        ) -> Result<PageResult, ScrapeError> {
            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context_id.clone())
                .build()
                .map_err(ScrapeError::Browser)?;
            let page = browser
                .new_page(target)
                .await
                .map_err(|e| ScrapeError::Browser(format!("open page: {}", e)))?;

            let interceptors = self.install_interception(&page, slot).await;
            let result = match interceptors {
                Ok(_) => self.drive(&page, url).await,
                Err(ref e) => Err(ScrapeError::Browser(e.to_string())),
            };

            for task in interceptors.unwrap_or_default() {
                task.abort();
            }
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }

            result
        }

        async fn prepare(&self, page: &Page) -> Result<(), ScrapeError> {
            let user_agent = SetUserAgentOverrideParams::builder()
                .user_agent(random_chrome_user_agent())
                .accept_language("en-US,en;q=0.9")
                .build()
                .map_err(ScrapeError::Browser)?;
            page.execute(user_agent).await.map_err(browser_error)?;

            let (width, height) = random_viewport();
            page.execute(SetDeviceMetricsOverrideParams::new(
                width as i64,
                height as i64,
                1.0,
                false,
            ))
            .await
            .map_err(browser_error)?;

            let (latitude, longitude) = self.config.geolocation;
            let emulation = async {
                page.execute(
                    SetLocaleOverrideParams::builder()
                        .locale(self.config.locale.clone())
                        .build(),
                )
                .await?;
                page.execute(SetTimezoneOverrideParams::new(self.config.timezone.clone()))
                    .await?;
                page.execute(
                    SetGeolocationOverrideParams::builder()
                        .latitude(latitude)
                        .longitude(longitude)
                        .accuracy(50.0)
                        .build(),
                )
                .await?;
                Ok::<_, chromiumoxide::error::CdpError>(())
            };
            if let Err(e) = emulation.await {
                debug!("Locale/timezone/geolocation override skipped: {}", e);
            }

            for script in STEALTH_SCRIPTS {
                page.execute(AddScriptToEvaluateOnNewDocumentParams::new(*script))
                    .await
                    .map_err(browser_error)?;
            }

            Ok(())
        }

        /// Pause every request so images/fonts/media can be failed and proxy
        /// auth challenges answered.
        async fn install_interception(
            &self,
            page: &Page,
            slot: Option<&ProxySlot>,
        ) -> Result<Vec<JoinHandle<()>>, chromiumoxide::error::CdpError> {
            let credentials = slot
                .filter(|s| s.config.has_credentials())
                .map(|s| {
                    (
                        s.config.username.clone().unwrap_or_default(),
                        s.config.password.clone().unwrap_or_default(),
                    )
                });
            let block = self.config.block_resources;
            if !block && credentials.is_none() {
                return Ok(Vec::new());
            }

            let mut tasks = Vec::new();

            let mut paused = page.event_listener::<EventRequestPaused>().await?;
            let p = page.clone();
            tasks.push(tokio::spawn(async move {
                while let Some(event) = paused.next().await {
                    let skip = block
                        && matches!(
                            event.resource_type,
                            ResourceType::Image | ResourceType::Font | ResourceType::Media
                        );
                    let outcome = if skip {
                        p.execute(FailRequestParams::new(
                            event.request_id.clone(),
                            ErrorReason::BlockedByClient,
                        ))
                        .await
                        .map(|_| ())
                    } else {
                        p.execute(ContinueRequestParams::new(event.request_id.clone()))
                            .await
                            .map(|_| ())
                    };
                    if let Err(e) = outcome {
                        debug!("Paused request not released: {}", e);
                    }
                }
            }));

            let handle_auth = credentials.is_some();
            if let Some((username, password)) = credentials {
                let mut auth = page.event_listener::<EventAuthRequired>().await?;
                let p = page.clone();
                tasks.push(tokio::spawn(async move {
                    while let Some(event) = auth.next().await {
                        let response = AuthChallengeResponse::builder()
                            .response(AuthChallengeResponseResponse::ProvideCredentials)
                            .username(username.clone())
                            .password(password.clone())
                            .build();
                        match response {
                            Ok(response) => {
                                if let Err(e) = p
                                    .execute(ContinueWithAuthParams::new(
                                        event.request_id.clone(),
                                        response,
                                    ))
                                    .await
                                {
                                    debug!("Proxy auth reply failed: {}", e);
                                }
                            }
                            Err(e) => debug!("Proxy auth response invalid: {}", e),
                        }
                    }
                }));
            }

            page.execute(
                fetch::EnableParams::builder()
                    .patterns(vec![RequestPattern::builder().url_pattern("*").build()])
                    .handle_auth_requests(handle_auth)
                    .build(),
            )
            .await?;

            Ok(tasks)
        }

        async fn drive(&self, page: &Page, url: &str) -> Result<PageResult, ScrapeError> {
            self.prepare(page).await?;

            info!("Navigating to {}", url);
            let navigate = NavigateParams::builder()
                .url(url)
                .referrer(REFERRER)
                .build()
                .map_err(|e| ScrapeError::Resolution(format!("invalid URL {}: {}", url, e)))?;

            let response = tokio::time::timeout(self.timing.navigation_timeout, page.execute(navigate))
                .await
                .map_err(|_| {
                    ScrapeError::transport(
                        TransportKind::Timeout,
                        format!(
                            "navigation timed out after {:?} for {}",
                            self.timing.navigation_timeout, url
                        ),
                    )
                })?
                .map_err(|e| ScrapeError::from_message(&e.to_string()))?;

            if let Some(error_text) = response.result.error_text.as_deref() {
                return Err(ScrapeError::from_message(error_text));
            }

            wait_for_page_ready(page, self.timing.navigation_timeout).await;

            let live = LivePage { page };
            match negotiate(&live, &self.detectors, &self.timing.challenge).await? {
                ChallengeOutcome::Unresolved => {
                    return Err(ScrapeError::Blocked(format!(
                        "challenge on {} did not clear within {:?}",
                        url, self.timing.challenge.timeout
                    )));
                }
                ChallengeOutcome::Resolved => {
                    wait_for_page_ready(page, self.timing.navigation_timeout).await;
                }
                ChallengeOutcome::Clear => {}
            }

            let final_url = page
                .url()
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| url.to_string());
            let html = page.content().await.map_err(browser_error)?;

            Ok(extract::parse_rendered_page(&final_url, &html))
        }

        async fn close_browser(&self) {
            let Some(shared) = self.browser.lock().await.take() else {
                return;
            };
            match Arc::try_unwrap(shared.browser) {
                Ok(mut browser) => {
                    if let Err(e) = browser.close().await {
                        debug!("Browser close failed: {}", e);
                    }
                    let _ = browser.wait().await;
                }
                Err(_) => warn!("Browser still in use at cleanup; dropping handle"),
            }
            shared.handler.abort();
            info!("Browser closed");
        }
    }

    #[async_trait]
    impl PageFetcher for BrowserFetcher {
        fn name(&self) -> &str {
            "rendered"
        }

        async fn fetch(&self, url: &str) -> Result<PageResult, ScrapeError> {
            let url = extract::normalize_url(url)?;
            let browser = self.ensure_browser().await?;
            let browser = browser.as_ref();
            let target = url.as_str();

            fetch_with_rotation(
                &self.proxies,
                self.timing.rotation,
                "Rendered",
                target,
                move |slot| async move {
                    self.fetch_in_context(browser, target, slot.as_ref()).await
                },
            )
            .await
        }

        async fn cleanup(&self) {
            self.close_browser().await;
        }
    }

    /// [`ChallengePage`] over a live CDP page.
    struct LivePage<'a> {
        page: &'a Page,
    }

    #[async_trait]
    impl ChallengePage for LivePage<'_> {
        async fn snapshot(&self) -> Result<PageSnapshot, ScrapeError> {
            let title: String = self
                .page
                .evaluate("document.title")
                .await
                .map_err(browser_error)?
                .into_value()
                .unwrap_or_default();
            let text: String = self
                .page
                .evaluate("document.body ? document.body.innerText : ''")
                .await
                .map_err(browser_error)?
                .into_value()
                .unwrap_or_default();
            Ok(PageSnapshot { title, text })
        }

        async fn simulate_input(&self) {
            let moves: Vec<(f64, f64)> = {
                let mut rng = rand::thread_rng();
                (0..4)
                    .map(|_| (rng.gen_range(100.0..1200.0), rng.gen_range(100.0..700.0)))
                    .collect()
            };
            for (x, y) in moves {
                let event = DispatchMouseEventParams::new(DispatchMouseEventType::MouseMoved, x, y);
                if let Err(e) = self.page.execute(event).await {
                    debug!("Mouse move failed: {}", e);
                    return;
                }
                tokio::time::sleep(Duration::from_millis(120)).await;
            }
            if let Err(e) = self.page.evaluate("window.scrollBy(0, 400)").await {
                debug!("Scroll failed: {}", e);
            }
        }
    }

    async fn wait_for_page_ready(page: &Page, timeout: Duration) {
        match tokio::time::timeout(timeout, page.evaluate(WAIT_FOR_READY_SCRIPT)).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }
    }

    fn browser_error(e: chromiumoxide::error::CdpError) -> ScrapeError {
        ScrapeError::Browser(e.to_string())
    }
}

/// Stub for when the browser feature is disabled.
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    detectors: Arc<DetectorSet>,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(
        _config: BrowserEngineConfig,
        _proxies: Arc<ProxyPool>,
        _settings: &ScraperSettings,
    ) -> Self {
        Self {
            detectors: Arc::new(DetectorSet::default()),
        }
    }

    pub fn with_detectors(mut self, detectors: Arc<DetectorSet>) -> Self {
        self.detectors = detectors;
        self
    }

    pub fn detectors(&self) -> &Arc<DetectorSet> {
        &self.detectors
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn name(&self) -> &str {
        "rendered"
    }

    async fn fetch(&self, _url: &str) -> Result<PageResult, ScrapeError> {
        Err(ScrapeError::Browser(
            "browser support not compiled; rebuild with --features browser".to_string(),
        ))
    }
}

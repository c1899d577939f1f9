//! Fingerprint patches injected into every new document.

use rand::seq::SliceRandom;

/// Scripts registered with `Page.addScriptToEvaluateOnNewDocument`, so they
/// run before any page script can inspect the environment. Each is wrapped in
/// try/catch because some properties are non-configurable in newer Chrome.
pub const STEALTH_SCRIPTS: &[&str] = &[
    // navigator.webdriver
    r#"
    try {
        Object.defineProperty(Navigator.prototype, 'webdriver', {
            get: () => undefined,
            configurable: true
        });
    } catch (e) {}
    "#,
    // window.chrome runtime object that headless Chrome lacks
    r#"
    try {
        if (!window.chrome) { window.chrome = {}; }
        window.chrome.runtime = window.chrome.runtime || {};
        window.chrome.loadTimes = window.chrome.loadTimes || function() {};
        window.chrome.csi = window.chrome.csi || function() {};
        window.chrome.app = window.chrome.app || { isInstalled: false };
    } catch (e) {}
    "#,
    // Notification permission query consistency
    r#"
    try {
        const originalQuery = window.navigator.permissions.query.bind(window.navigator.permissions);
        window.navigator.permissions.query = (parameters) => (
            parameters && parameters.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : originalQuery(parameters)
        );
    } catch (e) {}
    "#,
    // Plugin list of a desktop Chrome
    r#"
    try {
        Object.defineProperty(navigator, 'plugins', {
            get: () => [
                { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
                { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
                { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
            ],
            configurable: true
        });
    } catch (e) {}
    "#,
    // Languages matching the locale override
    r#"
    try {
        Object.defineProperty(navigator, 'languages', {
            get: () => ['en-US', 'en'],
            configurable: true
        });
    } catch (e) {}
    "#,
    // Headless reports a single core
    r#"
    try {
        Object.defineProperty(navigator, 'hardwareConcurrency', {
            get: () => 8,
            configurable: true
        });
    } catch (e) {}
    "#,
    // ChromeDriver leftovers
    r#"
    try {
        for (const key of Object.keys(window)) {
            if (key.startsWith('cdc_')) { delete window[key]; }
        }
    } catch (e) {}
    "#,
    // WebGL vendor and renderer
    r#"
    try {
        const getParameter = WebGLRenderingContext.prototype.getParameter;
        WebGLRenderingContext.prototype.getParameter = function(parameter) {
            if (parameter === 37445) { return 'Intel Inc.'; }
            if (parameter === 37446) { return 'Intel Iris OpenGL Engine'; }
            return getParameter.call(this, parameter);
        };
    } catch (e) {}
    "#,
];

/// Common desktop resolutions.
pub const VIEWPORTS: &[(u32, u32)] = &[(1366, 768), (1440, 900), (1536, 864), (1920, 1080)];

pub fn random_viewport() -> (u32, u32) {
    VIEWPORTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or((1366, 768))
}

//! Browser user agents used for impersonation.

use rand::seq::SliceRandom;

/// Identifying agent used only when impersonation is switched off.
pub const USER_AGENT: &str = "siteacquire/0.3 (business website research)";

/// Real browser user agents. Rotated per request so consecutive fetches
/// through the same proxy do not share a fingerprint.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Edge
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Chromium-family agents only; the rendered fetcher must not claim to be
/// Firefox or Safari while running Chrome.
pub fn random_chrome_user_agent() -> &'static str {
    let chrome: Vec<&&str> = IMPERSONATE_USER_AGENTS
        .iter()
        .filter(|ua| ua.contains("Chrome/"))
        .collect();
    chrome
        .choose(&mut rand::thread_rng())
        .map(|ua| **ua)
        .unwrap_or(IMPERSONATE_USER_AGENTS[0])
}

pub fn random_user_agent() -> &'static str {
    IMPERSONATE_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(IMPERSONATE_USER_AGENTS[0])
}

/// Resolve user agent from config value.
/// - None or "impersonate" => random real browser user agent
/// - "identify" => the crate's own agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None | Some("impersonate") => random_user_agent().to_string(),
        Some("identify") => USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}

//! Browser engine configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::env_non_empty;

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch challenge negotiation.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome executable; otherwise common paths and PATH are searched.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Locale reported to pages.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// IANA timezone reported to pages.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Spoofed geolocation as (latitude, longitude).
    #[serde(default = "default_geolocation")]
    pub geolocation: (f64, f64),

    /// Fail image, font and media requests to speed up loads.
    #[serde(default = "default_true")]
    pub block_resources: bool,
}

pub fn default_headless() -> bool {
    true
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_geolocation() -> (f64, f64) {
    (40.7128, -74.0060)
}

fn default_true() -> bool {
    true
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            chrome_args: Vec::new(),
            remote_url: None,
            locale: default_locale(),
            timezone: default_timezone(),
            geolocation: default_geolocation(),
            block_resources: true,
        }
    }
}

impl BrowserEngineConfig {
    /// Apply `BROWSER_HEADLESS` and `BROWSER_URL`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env_non_empty("BROWSER_HEADLESS") {
            self.headless = !matches!(
                value.trim().to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        if let Some(url) = env_non_empty("BROWSER_URL") {
            self.remote_url = Some(url);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrowserEngineConfig::default();
        assert!(config.headless);
        assert!(config.block_resources);
        assert_eq!(config.locale, "en-US");
        assert_eq!(config.timezone, "America/New_York");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BrowserEngineConfig =
            serde_json::from_str(r#"{"headless": false, "remote_url": "ws://chrome:9222"}"#)
                .unwrap();
        assert!(!config.headless);
        assert_eq!(config.remote_url.as_deref(), Some("ws://chrome:9222"));
        assert_eq!(config.geolocation, (40.7128, -74.0060));
    }
}

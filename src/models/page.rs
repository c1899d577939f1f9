//! Fetched page content.

use serde::{Deserialize, Serialize};

/// Which page of a business site a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePage {
    Homepage,
    Services,
    Products,
    Contact,
}

impl SourcePage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::Services => "services",
            Self::Products => "products",
            Self::Contact => "contact",
        }
    }
}

/// Signals extracted from a single fetched page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Final URL of the page (after redirects when known).
    pub url: String,
    pub title: String,
    /// Plain text of the main content region.
    pub content: String,
    /// Full page markup as fetched or rendered.
    pub markup: String,
    pub meta_description: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    /// Absolute same-host links found on the page.
    pub internal_links: Vec<String>,
    /// True when the page was produced by the browser.
    pub rendered: bool,
}

impl PageResult {
    /// Whether the page yielded any usable signal.
    pub fn has_signal(&self) -> bool {
        !self.content.trim().is_empty() || !self.emails.is_empty() || !self.phones.is_empty()
    }
}

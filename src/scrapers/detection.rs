//! Heuristic page predicates.
//!
//! Fetch and retry logic only talks to [`PageDetector`], so rules can be
//! added or tuned here without touching the fetchers.

use crate::models::PageResult;

/// Text shorter than this is treated as a page whose content is built client-side.
pub const THIN_CONTENT_CHARS: usize = 200;

/// Phrases shown by anti-bot interstitials.
pub const CHALLENGE_PHRASES: &[&str] = &[
    "checking your browser",
    "just a moment",
    "verify you are human",
    "please wait while we verify",
    "enable javascript and cookies",
    "attention required",
    "ddos protection by",
    "cf-browser-verification",
    "challenge-platform",
];

/// Markers left in markup by client-side frameworks.
const SPA_MARKERS: &[&str] = &[
    "__next_data__",
    "window.__nuxt__",
    "data-reactroot",
    "ng-version",
    "ng-app",
    "data-v-app",
    "react-dom",
    "vue.runtime",
    "/_next/static/",
    "/_nuxt/",
    "svelte-",
];

/// Empty mount elements that a framework fills at runtime.
const MOUNT_MARKERS: &[&str] = &[
    "id=\"root\"",
    "id='root'",
    "id=\"app\"",
    "id='app'",
    "id=\"__next\"",
    "id='__next'",
];

/// What a detector gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct DetectionInput<'a> {
    pub title: &'a str,
    pub markup: &'a str,
    /// Visible text (main content for parsed pages, body text for live DOMs).
    pub text: &'a str,
}

impl<'a> DetectionInput<'a> {
    pub fn from_page(page: &'a PageResult) -> Self {
        Self {
            title: &page.title,
            markup: &page.markup,
            text: &page.content,
        }
    }
}

/// A named predicate over a fetched page.
pub trait PageDetector: Send + Sync {
    fn name(&self) -> &str;
    fn matches(&self, input: &DetectionInput<'_>) -> bool;
}

/// Fires for pages that probably need script execution to show content.
#[derive(Debug, Clone)]
pub struct SpaDetector {
    pub min_text_chars: usize,
}

impl Default for SpaDetector {
    fn default() -> Self {
        Self {
            min_text_chars: THIN_CONTENT_CHARS,
        }
    }
}

impl PageDetector for SpaDetector {
    fn name(&self) -> &str {
        "spa"
    }

    fn matches(&self, input: &DetectionInput<'_>) -> bool {
        if input.text.trim().chars().count() < self.min_text_chars {
            return true;
        }
        let markup = input.markup.to_lowercase();
        MOUNT_MARKERS.iter().any(|m| markup.contains(m))
            || SPA_MARKERS.iter().any(|m| markup.contains(m))
    }
}

/// Fires while an anti-bot interstitial is showing.
#[derive(Debug, Clone, Default)]
pub struct ChallengeDetector;

impl ChallengeDetector {
    pub fn phrase_in(haystack: &str) -> Option<&'static str> {
        let lower = haystack.to_lowercase();
        CHALLENGE_PHRASES.iter().copied().find(|p| lower.contains(p))
    }
}

impl PageDetector for ChallengeDetector {
    fn name(&self) -> &str {
        "challenge"
    }

    fn matches(&self, input: &DetectionInput<'_>) -> bool {
        Self::phrase_in(input.title).is_some() || Self::phrase_in(input.text).is_some()
    }
}

/// The SPA and challenge detectors the fetch policy consults.
pub struct DetectorSet {
    spa: Vec<Box<dyn PageDetector>>,
    challenge: Vec<Box<dyn PageDetector>>,
}

impl Default for DetectorSet {
    fn default() -> Self {
        Self {
            spa: vec![Box::new(SpaDetector::default())],
            challenge: vec![Box::new(ChallengeDetector)],
        }
    }
}

impl DetectorSet {
    pub fn empty() -> Self {
        Self {
            spa: Vec::new(),
            challenge: Vec::new(),
        }
    }

    pub fn with_spa(mut self, detector: impl PageDetector + 'static) -> Self {
        self.spa.push(Box::new(detector));
        self
    }

    pub fn with_challenge(mut self, detector: impl PageDetector + 'static) -> Self {
        self.challenge.push(Box::new(detector));
        self
    }

    /// Name of the first SPA detector that fires.
    pub fn spa_match(&self, input: &DetectionInput<'_>) -> Option<&str> {
        self.spa.iter().find(|d| d.matches(input)).map(|d| d.name())
    }

    pub fn looks_like_spa(&self, input: &DetectionInput<'_>) -> bool {
        self.spa_match(input).is_some()
    }

    pub fn is_challenge(&self, input: &DetectionInput<'_>) -> bool {
        self.challenge.iter().any(|d| d.matches(input))
    }
}

//! HTML to signal extraction shared by the static and rendered fetchers.
//!
//! Everything here is pure: markup in, [`PageResult`] out.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::ScrapeError;
use crate::models::PageResult;

/// Subtrees never counted as page content.
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "iframe", "svg", "template",
];

/// Subtrees that never contain human-visible text.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Page-level signals skip the footer; it is scanned separately by
/// [`footer_signals`] to fill gaps.
const PAGE_SIGNAL_EXCLUDED: &[&str] = &["script", "style", "noscript", "template", "svg", "footer"];

/// Main-content candidates, most specific first.
const STATIC_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=main]",
    ".content",
    "#content",
    ".main-content",
    "#main",
    ".container",
    "body",
];

/// Framework mount points, tried before `body` for rendered pages.
const RENDERED_EXTRA_SELECTORS: &[&str] = &["#root", "#app", "#__next", "#__nuxt", "[data-reactroot]"];

const FOOTER_SELECTORS: &[&str] = &["footer", "[class*=footer]", "[id*=footer]"];

/// File extensions that show up in `name@2x.png` style asset references.
const ASSET_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".avif", ".ico", ".css", ".js",
];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("email pattern")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\b([2-9]\d{2})\)?[-.\s]?(\d{3})[-.\s]?(\d{4})\b")
        .expect("phone pattern")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Which set of content selectors to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentProfile {
    Static,
    Rendered,
}

impl ContentProfile {
    fn selectors(self) -> Vec<&'static str> {
        match self {
            Self::Static => STATIC_CONTENT_SELECTORS.to_vec(),
            Self::Rendered => {
                let mut selectors: Vec<&str> = STATIC_CONTENT_SELECTORS
                    .iter()
                    .copied()
                    .filter(|s| *s != "body")
                    .collect();
                selectors.extend_from_slice(RENDERED_EXTRA_SELECTORS);
                selectors.push("body");
                selectors
            }
        }
    }
}

/// Emails and phones found in one region of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSignals {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
}

/// Prepend `https://` when the input has no scheme, then validate.
pub fn normalize_url(input: &str) -> Result<String, ScrapeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::Resolution("empty URL".to_string()));
    }
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches("//"))
    };
    let parsed = Url::parse(&candidate)
        .map_err(|e| ScrapeError::Resolution(format!("invalid URL {}: {}", trimmed, e)))?;
    if parsed.host_str().is_none() {
        return Err(ScrapeError::Resolution(format!("URL has no host: {}", trimmed)));
    }
    Ok(parsed.to_string())
}

/// Lowercased host with any `www.` prefix removed.
pub fn bare_host(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
}

/// Parse statically fetched markup.
pub fn parse_page(url: &str, html: &str) -> PageResult {
    parse_page_with(url, html, ContentProfile::Static)
}

/// Parse markup taken from a rendered DOM.
pub fn parse_rendered_page(url: &str, html: &str) -> PageResult {
    let mut page = parse_page_with(url, html, ContentProfile::Rendered);
    page.rendered = true;
    page
}

pub fn parse_page_with(url: &str, html: &str, profile: ContentProfile) -> PageResult {
    let document = Html::parse_document(html);

    let title = first_text(&document, "title").unwrap_or_default();
    let meta_description = meta_content(&document, "meta[name=description]")
        .or_else(|| meta_content(&document, "meta[property='og:description']"));

    let content = main_content(&document, profile);
    let signals = collect_signals(document.root_element(), PAGE_SIGNAL_EXCLUDED);
    let internal_links = Url::parse(url)
        .map(|base| internal_links(&document, &base))
        .unwrap_or_default();

    PageResult {
        url: url.to_string(),
        title,
        content,
        markup: html.to_string(),
        meta_description,
        emails: signals.emails,
        phones: signals.phones,
        internal_links,
        rendered: false,
    }
}

/// Emails and phones from footer-like regions only.
pub fn footer_signals(markup: &str) -> ContactSignals {
    let document = Html::parse_document(markup);
    let mut merged = ContactSignals::default();

    for selector in FOOTER_SELECTORS.iter().filter_map(|s| Selector::parse(s).ok()) {
        for region in document.select(&selector) {
            let found = collect_signals(region, INVISIBLE_TAGS);
            merge_unique(&mut merged.emails, found.emails);
            merge_unique(&mut merged.phones, found.phones);
        }
    }

    merged
}

fn main_content(document: &Html, profile: ContentProfile) -> String {
    for css in profile.selectors() {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = collapse(&text_excluding(element, STRIPPED_TAGS));
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Concatenate text under `root`, skipping text inside any excluded tag.
/// Only ancestors below `root` are considered.
fn text_excluding(root: ElementRef<'_>, excluded: &[&str]) -> String {
    let root_id = root.id();
    let mut out = String::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != root_id)
            .chain(std::iter::once(*root))
            .filter_map(|a| a.value().as_element())
            .any(|e| excluded.contains(&e.name()));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }

    out
}

/// Whether `element` is, or sits inside, an excluded tag below `root`.
fn element_excluded(element: ElementRef<'_>, root: ElementRef<'_>, excluded: &[&str]) -> bool {
    let root_id = root.id();
    std::iter::once(*element)
        .chain(element.ancestors().take_while(|a| a.id() != root_id))
        .chain(std::iter::once(*root))
        .filter_map(|a| a.value().as_element())
        .any(|e| excluded.contains(&e.name()))
}

fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let element = document.select(&selector).next()?;
    let text = collapse(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .filter_map(|e| e.value().attr("content"))
        .map(collapse)
        .find(|c| !c.is_empty())
}

fn collect_signals(region: ElementRef<'_>, excluded: &[&str]) -> ContactSignals {
    let text = text_excluding(region, excluded);
    let mut emails = Vec::new();
    let mut phones = Vec::new();

    if let Ok(anchors) = Selector::parse("a[href]") {
        for anchor in region.select(&anchors) {
            if element_excluded(anchor, region, excluded) {
                continue;
            }
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let lower = href.trim().to_lowercase();
            if let Some(rest) = lower.strip_prefix("mailto:") {
                let address = rest.split('?').next().unwrap_or_default();
                let decoded = urlencoding::decode(address)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| address.to_string());
                push_email(&mut emails, &decoded);
            } else if let Some(rest) = lower.strip_prefix("tel:") {
                if let Some(phone) = normalize_phone(rest) {
                    push_unique(&mut phones, phone);
                }
            }
        }
    }

    for m in EMAIL_RE.find_iter(&text) {
        push_email(&mut emails, m.as_str());
    }
    for caps in PHONE_RE.captures_iter(&text) {
        let phone = format!("({}) {}-{}", &caps[1], &caps[2], &caps[3]);
        push_unique(&mut phones, phone);
    }

    ContactSignals { emails, phones }
}

fn push_email(emails: &mut Vec<String>, candidate: &str) {
    let email = candidate.trim().trim_end_matches('.').to_lowercase();
    if !is_plausible_email(&email) {
        return;
    }
    push_unique(emails, email);
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || !domain.contains('.') {
        return false;
    }
    if ASSET_SUFFIXES.iter().any(|s| email.ends_with(s)) {
        return false;
    }
    // Retina asset names such as logo@2x.png already fail above; this
    // catches the bare form without an extension.
    !domain.starts_with("2x.") && !domain.starts_with("3x.")
}

/// Normalise a North American number to `(XXX) XXX-XXXX`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return None,
    };
    if digits.starts_with('0') || digits.starts_with('1') {
        return None;
    }
    Some(format!(
        "({}) {}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..10]
    ))
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn merge_unique(into: &mut Vec<String>, values: Vec<String>) {
    for value in values {
        push_unique(into, value);
    }
}

fn internal_links(document: &Html, base: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let Some(host) = bare_host(base) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if let Some(resolved) = resolve_same_host(base, &host, href) {
            if seen.insert(resolved.clone()) {
                links.push(resolved);
            }
        }
    }

    links
}

/// Resolve `href` against `base`, keeping only http(s) links on `host`.
pub fn resolve_same_host(base: &Url, host: &str, href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("javascript:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    if bare_host(&resolved).as_deref() != Some(host) {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

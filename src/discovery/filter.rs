//! Search result validity filter.
//!
//! Only a business's own HTML site is a usable candidate: documents and
//! pages on search engines, social networks or directories never are.

use url::Url;

use super::SearchResult;

/// Path extensions of non-HTML documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "csv", "zip",
];

/// Brands whose domains (in any country TLD) are never a business site.
pub const BLOCKED_BRANDS: &[&str] = &[
    "google",
    "bing",
    "yahoo",
    "duckduckgo",
    "facebook",
    "linkedin",
    "twitter",
    "instagram",
    "youtube",
    "tiktok",
    "pinterest",
    "yelp",
    "wikipedia",
    "reddit",
    "vimeo",
];

/// Exact domains not covered by a brand label.
pub const BLOCKED_DOMAINS: &[&str] = &["x.com", "youtu.be", "fb.com", "t.co"];

/// Second-level labels used under country TLDs (`co.uk`, `com.au`).
const COUNTRY_SECOND_LEVEL: &[&str] = &["co", "com", "org", "net", "gov", "ac", "edu"];

/// Whether a result URL may be handed to the fetchers.
pub fn is_valid_result_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    !is_document_path(parsed.path()) && !is_blocked_host(host)
}

pub fn is_document_path(path: &str) -> bool {
    let last = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match last.rsplit_once('.') {
        Some((_, ext)) => DOCUMENT_EXTENSIONS.contains(&ext),
        None => false,
    }
}

pub fn is_blocked_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    let host = host.trim_start_matches("www.");

    if BLOCKED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    {
        return true;
    }

    registrable_label(host).is_some_and(|label| BLOCKED_BRANDS.contains(&label))
}

/// The label directly before the public suffix, approximated as the TLD
/// or a `co.uk`-style pair.
fn registrable_label(host: &str) -> Option<&str> {
    let labels: Vec<&str> = host.split('.').collect();
    let n = labels.len();
    if n < 2 {
        return None;
    }
    let tld = labels[n - 1];
    if n >= 3 && tld.len() == 2 && COUNTRY_SECOND_LEVEL.contains(&labels[n - 2]) {
        return Some(labels[n - 3]);
    }
    Some(labels[n - 2])
}

/// Keep only usable results, preserving rank order.
pub fn filter_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| is_valid_result_url(&r.url))
        .collect()
}

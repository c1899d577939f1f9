//! Secondary page discovery from a homepage's markup.
//!
//! Links are taken from navigation regions first and footers second, then
//! sorted into services, products and contact buckets. Anchor labels are
//! trusted over URL paths: a "Get In Touch" link to `/reach-us` is the
//! contact page even though the path never says so.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::SourcePage;
use crate::scrapers::extract::{bare_host, resolve_same_host};

const NAV_SELECTORS: &[&str] = &[
    "nav",
    "header",
    "[role=navigation]",
    ".nav",
    ".navbar",
    ".menu",
    "#menu",
    ".navigation",
    "#navigation",
    "[class*=menu]",
    "[class*=nav]",
];

const FOOTER_SELECTORS: &[&str] = &[
    "footer",
    "[role=contentinfo]",
    ".footer",
    "#footer",
    "[class*=footer]",
];

/// Bucket order for matching. Contact labels are the most specific.
const BUCKET_ORDER: &[SourcePage] = &[SourcePage::Contact, SourcePage::Services, SourcePage::Products];

const CONTACT_LABELS: &[&str] = &[
    "contact",
    "get in touch",
    "reach us",
    "reach out",
    "talk to us",
    "find us",
    "visit us",
    "locations",
    "location",
    "directions",
    "request a quote",
    "get a quote",
    "free estimate",
];

const SERVICES_LABELS: &[&str] = &[
    "services",
    "service",
    "what we do",
    "solutions",
    "capabilities",
    "expertise",
    "specialties",
    "treatments",
    "practice areas",
    "offerings",
];

const PRODUCTS_LABELS: &[&str] = &[
    "products",
    "product",
    "shop",
    "store",
    "catalog",
    "catalogue",
    "menu",
    "collections",
    "inventory",
    "pricing",
];

const CONTACT_PATHS: &[&str] = &[
    "contact",
    "get-in-touch",
    "reach-us",
    "reach-out",
    "touch",
    "find-us",
    "visit",
    "location",
    "directions",
    "quote",
    "estimate",
];

const SERVICES_PATHS: &[&str] = &[
    "service",
    "what-we-do",
    "solution",
    "capabilit",
    "expertise",
    "specialt",
    "treatment",
    "practice-area",
    "offering",
];

const PRODUCTS_PATHS: &[&str] = &[
    "product",
    "shop",
    "store",
    "catalog",
    "menu",
    "collection",
    "inventory",
    "pricing",
];

/// Never a content page.
const EXCLUDED_TERMS: &[&str] = &[
    "login",
    "log-in",
    "signin",
    "sign-in",
    "signup",
    "sign-up",
    "register",
    "account",
    "my-account",
    "admin",
    "wp-admin",
    "cart",
    "checkout",
    "auth",
    "logout",
    "password",
];

/// Where a link was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkOrigin {
    Nav,
    Footer,
    /// Conventional path, not seen on the page.
    Guess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub url: String,
    /// Visible anchor text, whitespace collapsed.
    pub label: String,
    pub origin: LinkOrigin,
}

/// Secondary pages chosen for a site, at most one per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedPages {
    pub services: Option<PageLink>,
    pub products: Option<PageLink>,
    pub contact: Option<PageLink>,
    /// True when the buckets hold conventional guesses.
    pub guessed: bool,
}

impl ClassifiedPages {
    pub fn get(&self, kind: SourcePage) -> Option<&PageLink> {
        match kind {
            SourcePage::Services => self.services.as_ref(),
            SourcePage::Products => self.products.as_ref(),
            SourcePage::Contact => self.contact.as_ref(),
            SourcePage::Homepage => None,
        }
    }

    fn slot(&mut self, kind: SourcePage) -> Option<&mut Option<PageLink>> {
        match kind {
            SourcePage::Services => Some(&mut self.services),
            SourcePage::Products => Some(&mut self.products),
            SourcePage::Contact => Some(&mut self.contact),
            SourcePage::Homepage => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_none() && self.products.is_none() && self.contact.is_none()
    }

    /// Pages to fetch, in fetch order.
    pub fn targets(&self) -> Vec<(SourcePage, &str)> {
        [SourcePage::Services, SourcePage::Products, SourcePage::Contact]
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|link| (kind, link.url.as_str())))
            .collect()
    }
}

/// Extract, classify and fall back to guesses in one step.
pub fn discover_pages(homepage_url: &str, markup: &str) -> ClassifiedPages {
    let links = extract_page_links(homepage_url, markup);
    let classified = classify_links(&links);
    if classified.is_empty() {
        fallback_guesses(homepage_url)
    } else {
        classified
    }
}

/// Same-host links from navigation and footer regions, nav first.
///
/// Deduplicated on host (without `www.`) and path, so the nav copy of a
/// link shadows its footer copy. The homepage itself is dropped.
pub fn extract_page_links(homepage_url: &str, markup: &str) -> Vec<PageLink> {
    let Ok(base) = Url::parse(homepage_url) else {
        return Vec::new();
    };
    let Some(host) = bare_host(&base) else {
        return Vec::new();
    };
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let document = Html::parse_document(markup);
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(link_key(&base));
    let mut links = Vec::new();

    for (selectors, origin) in [
        (NAV_SELECTORS, LinkOrigin::Nav),
        (FOOTER_SELECTORS, LinkOrigin::Footer),
    ] {
        for css in selectors {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for region in document.select(&selector) {
                if origin == LinkOrigin::Nav && inside_footer(region) {
                    continue;
                }
                for anchor in region.select(&anchor_selector) {
                    let Some(href) = anchor.value().attr("href") else {
                        continue;
                    };
                    let Some(resolved) = resolve_same_host(&base, &host, href) else {
                        continue;
                    };
                    let Ok(parsed) = Url::parse(&resolved) else {
                        continue;
                    };
                    if !seen.insert(link_key(&parsed)) {
                        continue;
                    }
                    links.push(PageLink {
                        url: resolved,
                        label: anchor_label(anchor),
                        origin,
                    });
                }
            }
        }
    }

    links
}

/// Sort links into buckets. Label matches beat path matches, nav links beat
/// footer links, and a link fills at most one bucket.
pub fn classify_links(links: &[PageLink]) -> ClassifiedPages {
    let mut pages = ClassifiedPages::default();
    let mut used: HashSet<&str> = HashSet::new();
    let candidates: Vec<&PageLink> = links.iter().filter(|l| !is_excluded(l)).collect();

    for matcher in [label_matches as fn(&PageLink, SourcePage) -> bool, path_matches] {
        for &kind in BUCKET_ORDER {
            let Some(slot) = pages.slot(kind) else {
                continue;
            };
            if slot.is_some() {
                continue;
            }
            let chosen = [LinkOrigin::Nav, LinkOrigin::Footer].into_iter().find_map(|origin| {
                candidates
                    .iter()
                    .find(|l| l.origin == origin && !used.contains(l.url.as_str()) && matcher(l, kind))
            });
            if let Some(link) = chosen {
                used.insert(link.url.as_str());
                *slot = Some((*link).clone());
            }
        }
    }

    pages
}

/// `/services`, `/products` and `/contact` under the homepage's directory.
pub fn fallback_guesses(homepage_url: &str) -> ClassifiedPages {
    let Ok(base) = Url::parse(homepage_url) else {
        return ClassifiedPages::default();
    };
    let prefix = match base.path().rfind('/') {
        Some(idx) => &base.path()[..idx],
        None => "",
    };

    let guess = |segment: &str| {
        let mut url = base.clone();
        url.set_path(&format!("{}/{}", prefix, segment));
        url.set_query(None);
        url.set_fragment(None);
        Some(PageLink {
            url: url.to_string(),
            label: String::new(),
            origin: LinkOrigin::Guess,
        })
    };

    ClassifiedPages {
        services: guess("services"),
        products: guess("products"),
        contact: guess("contact"),
        guessed: true,
    }
}

fn link_key(url: &Url) -> String {
    let host = bare_host(url).unwrap_or_default();
    format!("{}{}", host, url.path().trim_end_matches('/'))
}

fn anchor_label(anchor: ElementRef<'_>) -> String {
    let text = anchor.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        return text;
    }
    ["aria-label", "title"]
        .iter()
        .find_map(|attr| anchor.value().attr(attr))
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn inside_footer(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| {
            let value = el.value();
            value.name() == "footer"
                || value.attr("role") == Some("contentinfo")
                || value.attr("class").is_some_and(|c| c.to_lowercase().contains("footer"))
                || value.attr("id").is_some_and(|i| i.to_lowercase().contains("footer"))
        })
}

/// Lowercase alphanumeric words.
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `phrase` occurs as consecutive whole words in `label_words`.
fn contains_phrase(label_words: &[String], phrase: &str) -> bool {
    let phrase_words = words(phrase);
    if phrase_words.is_empty() || phrase_words.len() > label_words.len() {
        return false;
    }
    label_words
        .windows(phrase_words.len())
        .any(|window| window == phrase_words.as_slice())
}

fn label_matches(link: &PageLink, kind: SourcePage) -> bool {
    let label_words = words(&link.label);
    if label_words.is_empty() {
        return false;
    }
    let keywords = match kind {
        SourcePage::Contact => CONTACT_LABELS,
        SourcePage::Services => SERVICES_LABELS,
        SourcePage::Products => PRODUCTS_LABELS,
        SourcePage::Homepage => return false,
    };
    keywords.iter().any(|k| contains_phrase(&label_words, k))
}

fn path_matches(link: &PageLink, kind: SourcePage) -> bool {
    let Ok(url) = Url::parse(&link.url) else {
        return false;
    };
    let path = url.path().to_lowercase();
    let patterns = match kind {
        SourcePage::Contact => CONTACT_PATHS,
        SourcePage::Services => SERVICES_PATHS,
        SourcePage::Products => PRODUCTS_PATHS,
        SourcePage::Homepage => return false,
    };
    patterns.iter().any(|p| path.contains(p))
}

fn is_excluded(link: &PageLink) -> bool {
    let label_words = words(&link.label);
    if EXCLUDED_TERMS
        .iter()
        .any(|term| contains_phrase(&label_words, term))
    {
        return true;
    }

    let Ok(url) = Url::parse(&link.url) else {
        return true;
    };
    // Whole words per segment: `/my-account` is excluded, `/accounting` is not.
    url.path().split('/').filter(|s| !s.is_empty()).any(|segment| {
        let segment_words = words(segment);
        EXCLUDED_TERMS
            .iter()
            .any(|term| contains_phrase(&segment_words, term))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "https://www.acme.test/";

    fn html(nav: &str, footer: &str) -> String {
        format!(
            "<html><body><header><nav>{}</nav></header><main>Welcome</main><footer>{}</footer></body></html>",
            nav, footer
        )
    }

    #[test]
    fn test_label_beats_path() {
        let markup = html(
            r#"<a href="/">Home</a><a href="/reach-us">Get In Touch</a><a href="/what-we-do">What We Do</a>"#,
            "",
        );
        let pages = discover_pages(HOME, &markup);
        assert_eq!(
            pages.contact.as_ref().map(|l| l.url.as_str()),
            Some("https://www.acme.test/reach-us")
        );
        assert_eq!(
            pages.services.as_ref().map(|l| l.url.as_str()),
            Some("https://www.acme.test/what-we-do")
        );
        assert!(pages.products.is_none());
        assert!(!pages.guessed);
    }

    #[test]
    fn test_path_match_when_label_is_unhelpful() {
        let markup = html(r#"<a href="/our-products/">Browse</a>"#, "");
        let pages = discover_pages(HOME, &markup);
        assert_eq!(
            pages.products.as_ref().map(|l| l.url.as_str()),
            Some("https://www.acme.test/our-products/")
        );
    }

    #[test]
    fn test_nav_preferred_over_footer() {
        let markup = html(
            r#"<a href="/services">Services</a>"#,
            r#"<a href="https://acme.test/services/">Our Services</a><a href="/contact-us">Contact</a>"#,
        );
        let links = extract_page_links(HOME, &markup);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].origin, LinkOrigin::Nav);
        assert_eq!(links[1].origin, LinkOrigin::Footer);
        assert_eq!(links[1].url, "https://www.acme.test/contact-us");

        let pages = classify_links(&links);
        assert_eq!(pages.services.as_ref().map(|l| l.origin), Some(LinkOrigin::Nav));
        assert_eq!(pages.contact.as_ref().map(|l| l.origin), Some(LinkOrigin::Footer));
    }

    #[test]
    fn test_skips_homepage_anchors_and_offsite() {
        let markup = html(
            r##"<a href="#top">Top</a><a href="https://acme.test">Acme</a><a href="mailto:a@acme.test">Email</a><a href="tel:4155552671">Call</a><a href="https://other.test/contact">Contact</a>"##,
            "",
        );
        assert!(extract_page_links(HOME, &markup).is_empty());
    }

    #[test]
    fn test_excludes_auth_pages() {
        let markup = html(
            r#"<a href="/account/login">Contact Support Login</a><a href="/cart">Shop Cart</a><a href="/author/jane">Jane</a>"#,
            "",
        );
        let links = extract_page_links(HOME, &markup);
        assert_eq!(links.len(), 3);
        let pages = classify_links(&links);
        assert!(pages.contact.is_none());
        assert!(pages.products.is_none());
    }

    #[test]
    fn test_excluded_terms_match_whole_words_only() {
        let markup = html(
            r#"<a href="/accounting-services">Accounting Services</a><a href="/contact">Contact</a>"#,
            "",
        );
        let pages = discover_pages("https://acme.test/", &markup);
        assert_eq!(
            pages.services.as_ref().map(|l| l.url.as_str()),
            Some("https://acme.test/accounting-services")
        );
        assert_eq!(
            pages.contact.as_ref().map(|l| l.url.as_str()),
            Some("https://acme.test/contact")
        );
    }

    #[test]
    fn test_excluded_segments_still_drop_auth_paths() {
        let markup = html(
            r#"<a href="/administrative-services">Administrative Services</a><a href="/wp-admin/">Our Services</a><a href="/My-Account/contact">Contact</a><a href="/wp-login.php">Contact Us</a>"#,
            "",
        );
        let pages = discover_pages(HOME, &markup);
        assert_eq!(
            pages.services.as_ref().map(|l| l.url.as_str()),
            Some("https://www.acme.test/administrative-services")
        );
        assert!(pages.contact.is_none());
        assert!(!pages.guessed);
    }

    #[test]
    fn test_link_fills_one_bucket() {
        let markup = html(r#"<a href="/contact-services">Contact Services</a>"#, "");
        let pages = discover_pages(HOME, &markup);
        assert!(pages.contact.is_some());
        assert!(pages.services.is_none());
    }

    #[test]
    fn test_fallback_guesses_keep_path_prefix() {
        let pages = discover_pages("https://acme.test/site/", "<html><body><p>Hi</p></body></html>");
        assert!(pages.guessed);
        assert_eq!(
            pages.targets(),
            vec![
                (SourcePage::Services, "https://acme.test/site/services"),
                (SourcePage::Products, "https://acme.test/site/products"),
                (SourcePage::Contact, "https://acme.test/site/contact"),
            ]
        );

        let pages = fallback_guesses("https://acme.test/index.html");
        assert_eq!(
            pages.contact.map(|l| l.url),
            Some("https://acme.test/contact".to_string())
        );
    }

    #[test]
    fn test_classification_is_idempotent() {
        let markup = html(
            r#"<a href="/services">Services</a><a href="/shop">Shop</a><a href="/reach-us">Get In Touch</a>"#,
            r#"<a href="/privacy">Privacy</a><a href="/locations">Locations</a>"#,
        );
        let first = discover_pages(HOME, &markup);
        let second = discover_pages(HOME, &markup);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nav_region_inside_footer_counts_as_footer() {
        let markup = r#"<html><body><footer><ul class="footer-nav"><a href="/contact">Contact</a></ul></footer></body></html>"#;
        let links = extract_page_links(HOME, markup);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].origin, LinkOrigin::Footer);
    }
}

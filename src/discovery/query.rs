//! Search query construction.

/// Builder for search engine query strings.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    site: Option<String>,
    terms: Vec<String>,
    phrases: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict results to a domain.
    pub fn site(mut self, domain: &str) -> Self {
        self.site = Some(domain.to_string());
        self
    }

    pub fn term(mut self, term: &str) -> Self {
        let term = term.trim();
        if !term.is_empty() {
            self.terms.push(term.to_string());
        }
        self
    }

    /// Add an exact phrase match.
    pub fn phrase(mut self, phrase: &str) -> Self {
        let phrase = phrase.trim().replace('"', "");
        if !phrase.is_empty() {
            self.phrases.push(phrase);
        }
        self
    }

    pub fn build(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref site) = self.site {
            parts.push(format!("site:{}", site));
        }
        for phrase in &self.phrases {
            parts.push(format!("\"{}\"", phrase));
        }
        for term in &self.terms {
            parts.push(term.clone());
        }

        parts.join(" ")
    }
}

/// Lowercased domain with scheme, `www.`, path and port removed.
pub fn normalize_domain(input: &str) -> Option<String> {
    let trimmed = input.trim().to_lowercase();
    let without_scheme = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(&trimmed);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    let host = host.trim_start_matches("www.").trim_end_matches('.');

    if host.is_empty() || !host.contains('.') {
        None
    } else {
        Some(host.to_string())
    }
}

/// The single `site:` query used to find a domain's own pages.
pub fn domain_query(domain: &str) -> String {
    QueryBuilder::new().site(domain).build()
}

/// Business-name query variants, most specific first.
///
/// Variants whose inputs are missing are skipped and duplicates removed, so
/// a name with no location yields just the bare and the quoted name.
pub fn business_query_variants(name: &str, state: Option<&str>, zip: Option<&str>) -> Vec<String> {
    let name = name.trim();
    if name.is_empty() {
        return Vec::new();
    }
    let state = state.map(str::trim).filter(|s| !s.is_empty());
    let zip = zip.map(str::trim).filter(|z| !z.is_empty());

    let mut candidates = Vec::new();
    if let (Some(state), Some(zip)) = (state, zip) {
        candidates.push(QueryBuilder::new().term(name).term(state).term(zip).build());
    }
    if let Some(state) = state {
        candidates.push(QueryBuilder::new().term(name).term(state).build());
    }
    if let Some(zip) = zip {
        candidates.push(QueryBuilder::new().term(name).term(zip).build());
    }
    candidates.push(QueryBuilder::new().term(name).build());
    candidates.push(QueryBuilder::new().phrase(name).build());

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_site_query() {
        assert_eq!(domain_query("example.com"), "site:example.com");
    }

    #[test]
    fn phrase_is_quoted() {
        let query = QueryBuilder::new().phrase("Acme \"Best\" Plumbing").build();
        assert_eq!(query, "\"Acme Best Plumbing\"");
    }

    #[test]
    fn normalize_domain_strips_noise() {
        assert_eq!(
            normalize_domain("https://WWW.Example.com/about?x=1").as_deref(),
            Some("example.com")
        );
        assert_eq!(normalize_domain("example.com:8080").as_deref(), Some("example.com"));
        assert_eq!(normalize_domain("localhost"), None);
        assert_eq!(normalize_domain("  "), None);
    }

    #[test]
    fn variants_in_order_with_full_location() {
        let variants = business_query_variants("Acme Plumbing", Some("CA"), Some("94110"));
        assert_eq!(
            variants,
            vec![
                "Acme Plumbing CA 94110",
                "Acme Plumbing CA",
                "Acme Plumbing 94110",
                "Acme Plumbing",
                "\"Acme Plumbing\"",
            ]
        );
    }

    #[test]
    fn variants_skip_missing_location() {
        let variants = business_query_variants("Acme", None, Some(" "));
        assert_eq!(variants, vec!["Acme", "\"Acme\""]);
    }

    #[test]
    fn empty_name_has_no_variants() {
        assert!(business_query_variants("  ", Some("CA"), None).is_empty());
    }
}

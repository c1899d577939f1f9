//! Contact records and their scrape lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strategy used to locate a contact's website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeMethod {
    /// The contact already carries a website URL.
    DirectUrl,
    /// Resolve the site from the right-hand side of the contact's email.
    EmailDomain,
    /// Resolve the site by searching for the business name and location.
    BusinessSearch,
}

impl ScrapeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectUrl => "direct_url",
            Self::EmailDomain => "email_domain",
            Self::BusinessSearch => "business_search",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "direct_url" => Some(Self::DirectUrl),
            "email_domain" => Some(Self::EmailDomain),
            "business_search" => Some(Self::BusinessSearch),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScrapeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact status as far as acquisition is concerned.
///
/// Statuses owned by upstream validation are carried through untouched as
/// `Other` so the scraper never rewrites a status it does not understand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContactStatus {
    ReadyToScrape,
    Scraping,
    Scraped,
    ScrapeFailed,
    Other(String),
}

impl ContactStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ReadyToScrape => "ready_to_scrape",
            Self::Scraping => "scraping",
            Self::Scraped => "scraped",
            Self::ScrapeFailed => "scrape_failed",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "ready_to_scrape" => Self::ReadyToScrape,
            "scraping" => Self::Scraping,
            "scraped" => Self::Scraped,
            "scrape_failed" => Self::ScrapeFailed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Terminal for a single attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Scraped | Self::ScrapeFailed)
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business contact to acquire website content for.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    /// Upload batch the contact arrived in.
    pub upload_id: String,
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub scrape_method: Option<ScrapeMethod>,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Create a new contact ready to be scraped.
    pub fn new(upload_id: impl Into<String>, scrape_method: ScrapeMethod) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            upload_id: upload_id.into(),
            business_name: None,
            email: None,
            website: None,
            state: None,
            zip: None,
            scrape_method: Some(scrape_method),
            status: ContactStatus::ReadyToScrape,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_business_name(mut self, name: impl Into<String>) -> Self {
        self.business_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_location(mut self, state: Option<String>, zip: Option<String>) -> Self {
        self.state = state;
        self.zip = zip;
        self
    }

    /// Domain part of the contact's email, lowercased.
    pub fn email_domain(&self) -> Option<String> {
        let email = self.email.as_deref()?.trim();
        let (_, domain) = email.rsplit_once('@')?;
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if domain.is_empty() || !domain.contains('.') {
            None
        } else {
            Some(domain)
        }
    }

    /// Whether the contact may enter the scraping state.
    pub fn is_scrapable(&self) -> bool {
        self.status == ContactStatus::ReadyToScrape && self.scrape_method.is_some()
    }
}

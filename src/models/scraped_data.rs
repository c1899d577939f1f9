//! Append-only record of a single acquisition attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PageResult, ScrapeMethod, SourcePage};

/// Result of one acquisition attempt for a contact.
///
/// One row is written per attempt, success or failure. A failed row always
/// carries an error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedData {
    pub id: String,
    pub contact_id: String,
    pub method: ScrapeMethod,
    pub discovered_url: Option<String>,
    pub search_query: Option<String>,
    pub homepage_content: Option<String>,
    pub homepage_markup: Option<String>,
    pub services_url: Option<String>,
    pub services_content: Option<String>,
    pub products_url: Option<String>,
    pub products_content: Option<String>,
    pub contact_url: Option<String>,
    pub contact_content: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub page_title: Option<String>,
    pub meta_description: Option<String>,
    pub scrape_success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScrapedData {
    /// Start a successful record for the given homepage.
    pub fn success(contact_id: &str, method: ScrapeMethod, homepage: &PageResult) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            contact_id: contact_id.to_string(),
            method,
            discovered_url: Some(homepage.url.clone()),
            search_query: None,
            homepage_content: Some(homepage.content.clone()),
            homepage_markup: Some(homepage.markup.clone()),
            services_url: None,
            services_content: None,
            products_url: None,
            products_content: None,
            contact_url: None,
            contact_content: None,
            emails: homepage.emails.clone(),
            phones: homepage.phones.clone(),
            page_title: non_empty(&homepage.title),
            meta_description: homepage.meta_description.clone(),
            scrape_success: true,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// A failed attempt. The message is what a person reviewing the contact sees.
    pub fn failure(contact_id: &str, method: ScrapeMethod, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            contact_id: contact_id.to_string(),
            method,
            discovered_url: None,
            search_query: None,
            homepage_content: None,
            homepage_markup: None,
            services_url: None,
            services_content: None,
            products_url: None,
            products_content: None,
            contact_url: None,
            contact_content: None,
            emails: Vec::new(),
            phones: Vec::new(),
            page_title: None,
            meta_description: None,
            scrape_success: false,
            error_message: Some(message.into()),
            created_at: Utc::now(),
        }
    }

    pub fn with_search_query(mut self, query: Option<String>) -> Self {
        self.search_query = query;
        self
    }

    pub fn with_discovered_url(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.discovered_url = url;
        }
        self
    }

    /// Attach a secondary page's content.
    pub fn set_page(&mut self, kind: SourcePage, page: &PageResult) {
        let url = Some(page.url.clone());
        let content = Some(page.content.clone());
        match kind {
            SourcePage::Homepage => {
                self.discovered_url = url;
                self.homepage_content = content;
                self.homepage_markup = Some(page.markup.clone());
            }
            SourcePage::Services => {
                self.services_url = url;
                self.services_content = content;
            }
            SourcePage::Products => {
                self.products_url = url;
                self.products_content = content;
            }
            SourcePage::Contact => {
                self.contact_url = url;
                self.contact_content = content;
            }
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

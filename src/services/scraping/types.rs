//! Scraping service result types.

use serde::Serialize;

use crate::models::{ScrapeMethod, ScrapedData};
use crate::scrapers::ScrapeError;

/// Outcome of `scrape_one`. Failures are reported here, never raised.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub contact_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ScrapeMethod>,
    /// Homepage URL the attempt settled on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Row written for this attempt; absent when the request was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraped_data_id: Option<String>,
    /// Plain-language explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Technical detail for logs and `--json` output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ScrapeReport {
    pub(crate) fn from_data(data: &ScrapedData, detail: Option<String>) -> Self {
        Self {
            contact_id: data.contact_id.clone(),
            success: data.scrape_success,
            method: Some(data.method),
            url: data.discovered_url.clone(),
            scraped_data_id: Some(data.id.clone()),
            error: data.error_message.clone(),
            detail,
        }
    }

    /// A request turned away before any state changed.
    pub(crate) fn rejected(contact_id: &str, method: Option<ScrapeMethod>, err: &ScrapeError) -> Self {
        Self {
            contact_id: contact_id.to_string(),
            success: false,
            method,
            url: None,
            scraped_data_id: None,
            error: Some(err.user_message().to_string()),
            detail: Some(err.to_string()),
        }
    }
}

/// Outcome of `scrape_batch`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub reports: Vec<ScrapeReport>,
}

impl BatchReport {
    pub(crate) fn push(&mut self, report: ScrapeReport) {
        self.attempted += 1;
        if report.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.reports.push(report);
    }
}

/// What is known about an attempt when it ends, success or not.
#[derive(Debug, Default)]
pub(crate) struct AttemptContext {
    pub search_query: Option<String>,
    pub discovered_url: Option<String>,
}

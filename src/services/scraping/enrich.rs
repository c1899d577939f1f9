//! Contact signal enrichment.
//!
//! Emails and phones found on the homepage are authoritative. Footer markup
//! and then the contact page only fill a list that is still empty.

use crate::models::{PageResult, ScrapedData};
use crate::scrapers::extract::footer_signals;

/// Where missing signals were filled from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub emails_from_footer: bool,
    pub phones_from_footer: bool,
    pub emails_from_contact_page: bool,
    pub phones_from_contact_page: bool,
}

impl Enrichment {
    pub fn any(&self) -> bool {
        self.emails_from_footer
            || self.phones_from_footer
            || self.emails_from_contact_page
            || self.phones_from_contact_page
    }
}

pub fn enrich_signals(
    data: &mut ScrapedData,
    homepage_markup: &str,
    contact_page: Option<&PageResult>,
) -> Enrichment {
    let mut filled = Enrichment::default();

    if data.emails.is_empty() || data.phones.is_empty() {
        let footer = footer_signals(homepage_markup);
        if data.emails.is_empty() && !footer.emails.is_empty() {
            data.emails = footer.emails;
            filled.emails_from_footer = true;
        }
        if data.phones.is_empty() && !footer.phones.is_empty() {
            data.phones = footer.phones;
            filled.phones_from_footer = true;
        }
    }

    if let Some(page) = contact_page {
        if data.emails.is_empty() && !page.emails.is_empty() {
            data.emails = page.emails.clone();
            filled.emails_from_contact_page = true;
        }
        if data.phones.is_empty() && !page.phones.is_empty() {
            data.phones = page.phones.clone();
            filled.phones_from_contact_page = true;
        }
    }

    filled
}

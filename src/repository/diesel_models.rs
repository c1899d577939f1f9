//! Diesel ORM records for the `contacts` and `scraped_data` tables.

use diesel::prelude::*;

use super::util::{decode_list, encode_list, format_datetime, parse_datetime};
use crate::models::{Contact, ContactStatus, ScrapeMethod, ScrapedData};
use crate::schema;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::contacts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ContactRecord {
    pub id: String,
    pub upload_id: String,
    pub business_name: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub scrape_method: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::contacts)]
pub struct NewContact<'a> {
    pub id: &'a str,
    pub upload_id: &'a str,
    pub business_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub website: Option<&'a str>,
    pub state: Option<&'a str>,
    pub zip: Option<&'a str>,
    pub scrape_method: Option<&'a str>,
    pub status: &'a str,
    pub created_at: String,
    pub updated_at: String,
}

impl<'a> From<&'a Contact> for NewContact<'a> {
    fn from(contact: &'a Contact) -> Self {
        Self {
            id: &contact.id,
            upload_id: &contact.upload_id,
            business_name: contact.business_name.as_deref(),
            email: contact.email.as_deref(),
            website: contact.website.as_deref(),
            state: contact.state.as_deref(),
            zip: contact.zip.as_deref(),
            scrape_method: contact.scrape_method.map(|m| m.as_str()),
            status: contact.status.as_str(),
            created_at: format_datetime(&contact.created_at),
            updated_at: format_datetime(&contact.updated_at),
        }
    }
}

impl From<ContactRecord> for Contact {
    fn from(record: ContactRecord) -> Self {
        Contact {
            id: record.id,
            upload_id: record.upload_id,
            business_name: record.business_name,
            email: record.email,
            website: record.website,
            state: record.state,
            zip: record.zip,
            // Unknown methods read as unset so the entry guard rejects them.
            scrape_method: record
                .scrape_method
                .as_deref()
                .and_then(ScrapeMethod::from_str),
            status: ContactStatus::from_str(&record.status),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::scraped_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScrapedDataRecord {
    pub id: String,
    pub contact_id: String,
    pub method: String,
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
    pub emails: String,
    pub phones: String,
    pub page_title: Option<String>,
    pub meta_description: Option<String>,
    pub scrape_success: i32,
    pub error_message: Option<String>,
    pub created_at: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = schema::scraped_data)]
pub struct NewScrapedData<'a> {
    pub id: &'a str,
    pub contact_id: &'a str,
    pub method: &'a str,
    pub discovered_url: Option<&'a str>,
    pub search_query: Option<&'a str>,
    pub homepage_content: Option<&'a str>,
    pub homepage_markup: Option<&'a str>,
    pub services_url: Option<&'a str>,
    pub services_content: Option<&'a str>,
    pub products_url: Option<&'a str>,
    pub products_content: Option<&'a str>,
    pub contact_url: Option<&'a str>,
    pub contact_content: Option<&'a str>,
    pub emails: String,
    pub phones: String,
    pub page_title: Option<&'a str>,
    pub meta_description: Option<&'a str>,
    pub scrape_success: i32,
    pub error_message: Option<&'a str>,
    pub created_at: String,
}

impl<'a> From<&'a ScrapedData> for NewScrapedData<'a> {
    fn from(data: &'a ScrapedData) -> Self {
        Self {
            id: &data.id,
            contact_id: &data.contact_id,
            method: data.method.as_str(),
            discovered_url: data.discovered_url.as_deref(),
            search_query: data.search_query.as_deref(),
            homepage_content: data.homepage_content.as_deref(),
            homepage_markup: data.homepage_markup.as_deref(),
            services_url: data.services_url.as_deref(),
            services_content: data.services_content.as_deref(),
            products_url: data.products_url.as_deref(),
            products_content: data.products_content.as_deref(),
            contact_url: data.contact_url.as_deref(),
            contact_content: data.contact_content.as_deref(),
            emails: encode_list(&data.emails),
            phones: encode_list(&data.phones),
            page_title: data.page_title.as_deref(),
            meta_description: data.meta_description.as_deref(),
            scrape_success: i32::from(data.scrape_success),
            error_message: data.error_message.as_deref(),
            created_at: format_datetime(&data.created_at),
        }
    }
}

impl TryFrom<ScrapedDataRecord> for ScrapedData {
    type Error = String;

    fn try_from(record: ScrapedDataRecord) -> Result<Self, Self::Error> {
        let method = ScrapeMethod::from_str(&record.method)
            .ok_or_else(|| format!("unknown scrape method {:?}", record.method))?;
        Ok(ScrapedData {
            id: record.id,
            contact_id: record.contact_id,
            method,
            discovered_url: record.discovered_url,
            search_query: record.search_query,
            homepage_content: record.homepage_content,
            homepage_markup: record.homepage_markup,
            services_url: record.services_url,
            services_content: record.services_content,
            products_url: record.products_url,
            products_content: record.products_content,
            contact_url: record.contact_url,
            contact_content: record.contact_content,
            emails: decode_list(&record.emails),
            phones: decode_list(&record.phones),
            page_title: record.page_title,
            meta_description: record.meta_description,
            scrape_success: record.scrape_success != 0,
            error_message: record.error_message,
            created_at: parse_datetime(&record.created_at),
        })
    }
}

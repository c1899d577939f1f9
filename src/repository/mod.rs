//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite. The orchestrator only
//! sees the [`ContactStore`] trait; [`DieselDbContext`] is the stock
//! implementation.

pub mod diesel_contact;
pub mod diesel_context;
pub mod diesel_models;
pub mod diesel_pool;
pub mod diesel_scraped_data;
pub mod util;

pub use diesel_contact::DieselContactRepository;
pub use diesel_context::DieselDbContext;
pub use diesel_pool::{AsyncSqlitePool, DieselError};
pub use diesel_scraped_data::DieselScrapedDataRepository;

use async_trait::async_trait;

use crate::models::{Contact, ContactStatus, ScrapedData};

/// Persistence the acquisition service depends on.
///
/// `claim_for_scraping` must be an atomic read-then-update: it moves a
/// contact from `ready_to_scrape` to `scraping` only if it is still ready
/// and carries a scrape method. `insert_scraped_data` only ever appends.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, DieselError>;

    async fn list_ready(&self, upload_id: &str, limit: usize) -> Result<Vec<Contact>, DieselError>;

    async fn claim_for_scraping(&self, id: &str) -> Result<bool, DieselError>;

    async fn set_status(&self, id: &str, status: &ContactStatus) -> Result<bool, DieselError>;

    /// `scrape_failed → ready_to_scrape`; false for any other status.
    async fn reset_failed(&self, id: &str) -> Result<bool, DieselError>;

    async fn insert_scraped_data(&self, data: &ScrapedData) -> Result<(), DieselError>;
}

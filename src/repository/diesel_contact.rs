//! Diesel-based contact repository for SQLite.
//!
//! Status changes are single conditional UPDATEs, so the status column is
//! the only guard against two tasks scraping the same contact.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::diesel_models::{ContactRecord, NewContact};
use super::diesel_pool::{AsyncSqlitePool, DieselError};
use super::util::format_datetime;
use crate::models::{Contact, ContactStatus};
use crate::schema::contacts;

#[derive(Clone)]
pub struct DieselContactRepository {
    pool: AsyncSqlitePool,
}

impl DieselContactRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Contact>, DieselError> {
        let mut conn = self.pool.get().await?;

        contacts::table
            .find(id)
            .select(ContactRecord::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Contact::from))
    }

    pub async fn insert(&self, contact: &Contact) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(contacts::table)
            .values(NewContact::from(contact))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Contacts in an upload that are ready and carry a method, oldest first.
    pub async fn list_ready(
        &self,
        upload_id: &str,
        limit: usize,
    ) -> Result<Vec<Contact>, DieselError> {
        let mut conn = self.pool.get().await?;

        contacts::table
            .filter(contacts::upload_id.eq(upload_id))
            .filter(contacts::status.eq(ContactStatus::ReadyToScrape.as_str()))
            .filter(contacts::scrape_method.is_not_null())
            .order((contacts::created_at.asc(), contacts::id.asc()))
            .limit(limit as i64)
            .select(ContactRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Contact::from).collect())
    }

    pub async fn list_by_upload(&self, upload_id: &str) -> Result<Vec<Contact>, DieselError> {
        let mut conn = self.pool.get().await?;

        contacts::table
            .filter(contacts::upload_id.eq(upload_id))
            .order((contacts::created_at.asc(), contacts::id.asc()))
            .select(ContactRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Contact::from).collect())
    }

    /// Move `ready_to_scrape → scraping` if the contact has a method.
    ///
    /// Returns false when another caller got there first or the contact is
    /// not eligible.
    pub async fn claim_for_scraping(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        let rows = diesel::update(
            contacts::table
                .filter(contacts::id.eq(id))
                .filter(contacts::status.eq(ContactStatus::ReadyToScrape.as_str()))
                .filter(contacts::scrape_method.is_not_null()),
        )
        .set((
            contacts::status.eq(ContactStatus::Scraping.as_str()),
            contacts::updated_at.eq(&now),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows == 1)
    }

    pub async fn set_status(&self, id: &str, status: &ContactStatus) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        let rows = diesel::update(contacts::table.find(id))
            .set((
                contacts::status.eq(status.as_str()),
                contacts::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    /// Move `scrape_failed → ready_to_scrape`. Any other status is left alone.
    pub async fn reset_failed(&self, id: &str) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = format_datetime(&Utc::now());

        let rows = diesel::update(
            contacts::table
                .filter(contacts::id.eq(id))
                .filter(contacts::status.eq(ContactStatus::ScrapeFailed.as_str())),
        )
        .set((
            contacts::status.eq(ContactStatus::ReadyToScrape.as_str()),
            contacts::updated_at.eq(&now),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows == 1)
    }
}

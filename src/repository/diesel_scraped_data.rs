//! Append-only history of acquisition attempts.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use super::diesel_models::{NewScrapedData, ScrapedDataRecord};
use super::diesel_pool::{AsyncSqlitePool, DieselError};
use crate::models::ScrapedData;
use crate::schema::scraped_data;

#[derive(Clone)]
pub struct DieselScrapedDataRepository {
    pool: AsyncSqlitePool,
}

impl DieselScrapedDataRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, data: &ScrapedData) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(scraped_data::table)
            .values(NewScrapedData::from(data))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<ScrapedData>, DieselError> {
        let mut conn = self.pool.get().await?;

        let record = scraped_data::table
            .find(id)
            .select(ScrapedDataRecord::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        Ok(record.and_then(convert))
    }

    /// Every attempt for a contact, newest first.
    pub async fn list_for_contact(&self, contact_id: &str) -> Result<Vec<ScrapedData>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records = scraped_data::table
            .filter(scraped_data::contact_id.eq(contact_id))
            .order((scraped_data::created_at.desc(), scraped_data::id.desc()))
            .select(ScrapedDataRecord::as_select())
            .load(&mut conn)
            .await?;

        Ok(records.into_iter().filter_map(convert).collect())
    }
}

fn convert(record: ScrapedDataRecord) -> Option<ScrapedData> {
    let id = record.id.clone();
    match ScrapedData::try_from(record) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!("Skipping scraped_data row {}: {}", id, e);
            None
        }
    }
}

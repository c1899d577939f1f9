//! Diesel database context: connection factory plus repository access.

use std::path::Path;

use async_trait::async_trait;
use diesel_async::SimpleAsyncConnection;

use super::diesel_contact::DieselContactRepository;
use super::diesel_pool::{AsyncSqlitePool, DieselError};
use super::diesel_scraped_data::DieselScrapedDataRepository;
use super::ContactStore;
use crate::models::{Contact, ContactStatus, ScrapedData};

/// Create one context per command or service and take repositories from it.
///
/// ```ignore
/// let ctx = DieselDbContext::new(&db_path);
/// ctx.init_schema().await?;
/// let ready = ctx.contacts().list_ready("upload-1", 50).await?;
/// ```
#[derive(Clone)]
pub struct DieselDbContext {
    pool: AsyncSqlitePool,
}

impl DieselDbContext {
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    /// Accepts `sqlite:path` or a bare path.
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(database_url),
        }
    }

    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    pub fn contacts(&self) -> DieselContactRepository {
        DieselContactRepository::new(self.pool.clone())
    }

    pub fn scraped_data(&self) -> DieselScrapedDataRepository {
        DieselScrapedDataRepository::new(self.pool.clone())
    }

    /// Create tables and indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id TEXT PRIMARY KEY,
                upload_id TEXT NOT NULL,
                business_name TEXT,
                email TEXT,
                website TEXT,
                state TEXT,
                zip TEXT,
                scrape_method TEXT,
                status TEXT NOT NULL DEFAULT 'ready_to_scrape',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scraped_data (
                id TEXT PRIMARY KEY,
                contact_id TEXT NOT NULL,
                method TEXT NOT NULL,
                discovered_url TEXT,
                search_query TEXT,
                homepage_content TEXT,
                homepage_markup TEXT,
                services_url TEXT,
                services_content TEXT,
                products_url TEXT,
                products_content TEXT,
                contact_url TEXT,
                contact_content TEXT,
                emails TEXT NOT NULL DEFAULT '[]',
                phones TEXT NOT NULL DEFAULT '[]',
                page_title TEXT,
                meta_description TEXT,
                scrape_success INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at TEXT NOT NULL,
                CHECK (scrape_success = 1 OR error_message IS NOT NULL)
            );

            CREATE INDEX IF NOT EXISTS idx_contacts_upload_status
                ON contacts(upload_id, status);
            CREATE INDEX IF NOT EXISTS idx_scraped_data_contact
                ON scraped_data(contact_id, created_at);
            "#,
        )
        .await
    }
}

#[async_trait]
impl ContactStore for DieselDbContext {
    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, DieselError> {
        self.contacts().get(id).await
    }

    async fn list_ready(&self, upload_id: &str, limit: usize) -> Result<Vec<Contact>, DieselError> {
        self.contacts().list_ready(upload_id, limit).await
    }

    async fn claim_for_scraping(&self, id: &str) -> Result<bool, DieselError> {
        self.contacts().claim_for_scraping(id).await
    }

    async fn set_status(&self, id: &str, status: &ContactStatus) -> Result<bool, DieselError> {
        self.contacts().set_status(id, status).await
    }

    async fn reset_failed(&self, id: &str) -> Result<bool, DieselError> {
        self.contacts().reset_failed(id).await
    }

    async fn insert_scraped_data(&self, data: &ScrapedData) -> Result<(), DieselError> {
        self.scraped_data().insert(data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let dir = tempdir().unwrap();
        let ctx = DieselDbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        ctx.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_row_requires_message() {
        let dir = tempdir().unwrap();
        let ctx = DieselDbContext::from_url(&format!(
            "sqlite:{}",
            dir.path().join("test.db").display()
        ));
        ctx.init_schema().await.unwrap();

        let mut conn = ctx.pool().get().await.unwrap();
        let result = conn
            .batch_execute(
                "INSERT INTO scraped_data (id, contact_id, method, scrape_success, created_at) \
                 VALUES ('x', 'c1', 'direct_url', 0, '2024-01-01T00:00:00+00:00')",
            )
            .await;
        assert!(result.is_err());
    }
}

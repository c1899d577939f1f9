//! Initialize command.

use console::style;

use crate::config::Config;

use super::super::helpers::open_db;

/// Create the database and its schema.
pub async fn cmd_init(config: &Config) -> anyhow::Result<()> {
    open_db(config).await?;

    println!(
        "{} Initialized siteacquire database at {}",
        style("✓").green(),
        config.database_path().display()
    );
    if !config.search.is_configured() {
        println!(
            "{} Search is not configured. Set GOOGLE_SEARCH_API_KEY and GOOGLE_SEARCH_ENGINE_ID \
             to scrape email_domain and business_search contacts.",
            style("!").yellow()
        );
    }
    Ok(())
}

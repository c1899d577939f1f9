//! Shared helper functions for CLI commands.

use std::sync::Arc;

use console::style;
use serde::Serialize;

use crate::config::Config;
use crate::repository::DieselDbContext;
use crate::services::{ScrapeReport, ScrapingService};

/// Open the configured database, creating the file and schema on first use.
pub async fn open_db(config: &Config) -> anyhow::Result<Arc<DieselDbContext>> {
    let path = config.database_path();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let ctx = DieselDbContext::new(&path);
    ctx.init_schema().await?;
    Ok(Arc::new(ctx))
}

pub async fn open_service(config: &Config) -> anyhow::Result<ScrapingService<DieselDbContext>> {
    let db = open_db(config).await?;
    Ok(ScrapingService::from_config(db, config))
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_report(report: &ScrapeReport) {
    if report.success {
        println!(
            "{} {} scraped from {}",
            style("✓").green(),
            report.contact_id,
            report.url.as_deref().unwrap_or("-")
        );
    } else {
        println!(
            "{} {} failed: {}",
            style("✗").red(),
            report.contact_id,
            report.error.as_deref().unwrap_or("unknown error")
        );
        if let Some(detail) = &report.detail {
            println!("    {}", style(detail).dim());
        }
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

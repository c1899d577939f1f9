//! Scrape, batch, reset and history commands.

use console::style;

use crate::config::Config;

use super::super::helpers::{open_db, open_service, print_json, print_report, truncate};

pub async fn cmd_scrape(
    config: &Config,
    contact_id: &str,
    confirmed_url: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let report = service.scrape_one(contact_id, confirmed_url).await;
    service.cleanup().await;

    if json {
        print_json(&report)
    } else {
        print_report(&report);
        Ok(())
    }
}

pub async fn cmd_batch(
    config: &Config,
    upload_id: &str,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let result = service.scrape_batch(upload_id, limit).await;
    service.cleanup().await;
    let report = result?;

    if json {
        return print_json(&report);
    }

    for r in &report.reports {
        print_report(r);
    }
    println!(
        "\n{} attempted, {} succeeded, {} failed",
        report.attempted,
        style(report.succeeded).green(),
        style(report.failed).red()
    );
    Ok(())
}

pub async fn cmd_reset(config: &Config, contact_id: &str) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    service.reset_status(contact_id).await?;
    println!(
        "{} Contact {} is ready to scrape again",
        style("✓").green(),
        contact_id
    );
    Ok(())
}

pub async fn cmd_history(config: &Config, contact_id: &str, json: bool) -> anyhow::Result<()> {
    let db = open_db(config).await?;
    let rows = db.scraped_data().list_for_contact(contact_id).await?;

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("{} No attempts recorded for {}", style("!").yellow(), contact_id);
        return Ok(());
    }

    println!("\n{}", style(format!("Attempts for {}", contact_id)).bold());
    println!("{}", "-".repeat(90));
    for row in rows {
        let marker = if row.scrape_success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "{} {}  {:<16} {}",
            marker,
            row.created_at.format("%Y-%m-%d %H:%M:%S"),
            row.method.as_str(),
            row.discovered_url.as_deref().unwrap_or("-")
        );
        if let Some(query) = &row.search_query {
            println!("    query:    {}", query);
        }
        if let Some(error) = &row.error_message {
            println!("    error:    {}", error);
        }
        if row.scrape_success {
            println!(
                "    title:    {}",
                truncate(row.page_title.as_deref().unwrap_or("-"), 70)
            );
            println!("    emails:   {}", row.emails.join(", "));
            println!("    phones:   {}", row.phones.join(", "));
            for (label, url) in [
                ("services", &row.services_url),
                ("products", &row.products_url),
                ("contact", &row.contact_url),
            ] {
                if let Some(url) = url {
                    println!("    {:<9} {}", format!("{}:", label), url);
                }
            }
        }
    }
    Ok(())
}

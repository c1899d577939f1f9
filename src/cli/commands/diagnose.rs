//! Diagnostic commands: fetch a single URL, run a resolver search.

use console::style;

use crate::config::Config;
use crate::discovery::{discover_pages, SearchOutcome};

use super::super::helpers::{open_service, print_json, truncate};

pub async fn cmd_fetch(config: &Config, url: &str, rendered: bool, json: bool) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let result = if rendered {
        service.fetch_rendered(url).await
    } else {
        service.fetch_url(url).await
    };
    service.cleanup().await;
    let mut page = result?;

    let pages = discover_pages(&page.url, &page.markup);
    if json {
        page.markup.clear();
        return print_json(&page);
    }

    println!("{} {}", style("URL:").bold(), page.url);
    println!("{} {}", style("Title:").bold(), page.title);
    println!(
        "{} {}",
        style("Fetcher:").bold(),
        if page.rendered { "rendered" } else { "static" }
    );
    if let Some(desc) = &page.meta_description {
        println!("{} {}", style("Description:").bold(), desc);
    }
    println!("{} {}", style("Emails:").bold(), page.emails.join(", "));
    println!("{} {}", style("Phones:").bold(), page.phones.join(", "));
    println!(
        "{} {}",
        style("Internal links:").bold(),
        page.internal_links.len()
    );
    for (kind, target) in pages.targets() {
        let note = if pages.guessed { " (guess)" } else { "" };
        println!("  {:<9} {}{}", kind.as_str(), target, note);
    }
    println!("\n{}", truncate(&page.content, 500));
    Ok(())
}

pub async fn cmd_search_domain(config: &Config, domain: &str, json: bool) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let outcome = service.resolver().search_by_domain(domain).await?;
    print_outcome(&outcome, json)
}

pub async fn cmd_search_business(
    config: &Config,
    name: &str,
    state: Option<&str>,
    zip: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let outcome = service
        .resolver()
        .search_by_business_name(name, state, zip)
        .await?;
    print_outcome(&outcome, json)
}

fn print_outcome(outcome: &SearchOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(outcome);
    }
    if !outcome.query_succeeded {
        println!("{} Search failed for {:?}", style("✗").red(), outcome.query);
        return Ok(());
    }

    println!(
        "{} {:?}: {} usable of {} total",
        style("Query").bold(),
        outcome.query,
        outcome.results.len(),
        outcome.total_results
    );
    for (i, result) in outcome.results.iter().enumerate() {
        println!("{:>2}. {}", i + 1, result.url);
        println!("    {}", truncate(&result.title, 80));
    }
    Ok(())
}

//! Contact commands.

use console::style;
use serde::Serialize;

use crate::config::Config;
use crate::models::{Contact, ScrapeMethod};

use super::super::helpers::{open_db, open_service, print_json, truncate};

/// Fields for `contact add`.
pub struct NewContactArgs {
    pub upload_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub method: ScrapeMethod,
}

#[derive(Serialize)]
struct ContactView<'a> {
    id: &'a str,
    upload_id: &'a str,
    business_name: Option<&'a str>,
    email: Option<&'a str>,
    website: Option<&'a str>,
    scrape_method: Option<&'static str>,
    status: &'a str,
    updated_at: String,
}

impl<'a> From<&'a Contact> for ContactView<'a> {
    fn from(c: &'a Contact) -> Self {
        Self {
            id: &c.id,
            upload_id: &c.upload_id,
            business_name: c.business_name.as_deref(),
            email: c.email.as_deref(),
            website: c.website.as_deref(),
            scrape_method: c.scrape_method.map(|m| m.as_str()),
            status: c.status.as_str(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

/// Insert a contact in `ready_to_scrape`.
pub async fn cmd_contact_add(
    config: &Config,
    args: NewContactArgs,
    json: bool,
) -> anyhow::Result<()> {
    match args.method {
        ScrapeMethod::DirectUrl if args.website.is_none() => {
            anyhow::bail!("direct_url contacts need --website")
        }
        ScrapeMethod::EmailDomain if args.email.is_none() => {
            anyhow::bail!("email_domain contacts need --email")
        }
        ScrapeMethod::BusinessSearch if args.name.is_none() => {
            anyhow::bail!("business_search contacts need --name")
        }
        _ => {}
    }

    let mut contact = Contact::new(args.upload_id, args.method).with_location(args.state, args.zip);
    contact.business_name = args.name;
    contact.email = args.email;
    contact.website = args.website;

    let db = open_db(config).await?;
    db.contacts().insert(&contact).await?;

    if json {
        print_json(&ContactView::from(&contact))
    } else {
        println!(
            "{} Added contact {} ({})",
            style("✓").green(),
            contact.id,
            args.method
        );
        Ok(())
    }
}

pub async fn cmd_contact_list(config: &Config, upload_id: &str, json: bool) -> anyhow::Result<()> {
    let db = open_db(config).await?;
    let contacts = db.contacts().list_by_upload(upload_id).await?;
    print_contacts(&contacts, json, &format!("Contacts in {}", upload_id))
}

/// Contacts of an upload that a scrape would pick up.
pub async fn cmd_ready(
    config: &Config,
    upload_id: &str,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let contacts = service.get_ready_to_scrape(upload_id, limit).await?;
    print_contacts(&contacts, json, &format!("Ready to scrape in {}", upload_id))
}

fn print_contacts(contacts: &[Contact], json: bool, heading: &str) -> anyhow::Result<()> {
    if json {
        let views: Vec<ContactView<'_>> = contacts.iter().map(ContactView::from).collect();
        return print_json(&views);
    }

    if contacts.is_empty() {
        println!("{} No contacts found", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style(heading).bold());
    println!("{}", "-".repeat(100));
    println!(
        "{:<38} {:<24} {:<16} {:<16} Target",
        "ID", "Name", "Method", "Status"
    );
    println!("{}", "-".repeat(100));
    for c in contacts {
        let target = c
            .website
            .as_deref()
            .or(c.email.as_deref())
            .unwrap_or("-");
        println!(
            "{:<38} {:<24} {:<16} {:<16} {}",
            c.id,
            truncate(c.business_name.as_deref().unwrap_or("-"), 23),
            c.scrape_method.map_or("-", |m| m.as_str()),
            c.status.as_str(),
            truncate(target, 40)
        );
    }
    Ok(())
}

//! Command line interface.
//!
//! A thin layer over [`ScrapingService`](crate::services::ScrapingService):
//! parse arguments, open the database, call one operation, print the result.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::models::ScrapeMethod;

#[derive(Parser)]
#[command(name = "siteacquire")]
#[command(about = "Business website acquisition and contact signal extraction")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,

    /// Manage contacts
    Contact {
        #[command(subcommand)]
        command: ContactCommands,
    },

    /// List contacts ready to scrape in an upload
    Ready {
        upload_id: String,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Scrape a single contact
    Scrape {
        contact_id: String,
        /// Website already confirmed for a business_search contact
        #[arg(long)]
        url: Option<String>,
    },

    /// Scrape ready contacts of an upload in concurrent chunks
    Batch {
        upload_id: String,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Move a failed contact back to ready_to_scrape
    Reset { contact_id: String },

    /// Show every recorded attempt for a contact
    History { contact_id: String },

    /// Fetch one URL and show the extracted signals
    Fetch {
        url: String,
        /// Use the browser only
        #[arg(long)]
        rendered: bool,
    },

    /// Run a resolver search
    Search {
        #[command(subcommand)]
        command: SearchCommands,
    },
}

#[derive(Subcommand)]
enum ContactCommands {
    /// Add a contact in ready_to_scrape
    Add {
        #[arg(long)]
        upload: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
        #[arg(long, value_enum)]
        method: MethodArg,
    },

    /// List all contacts of an upload
    List { upload_id: String },
}

#[derive(Subcommand)]
enum SearchCommands {
    /// `site:<domain>` search
    Domain { domain: String },

    /// Business name search with location variants
    Business {
        name: String,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        zip: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum MethodArg {
    DirectUrl,
    EmailDomain,
    BusinessSearch,
}

impl From<MethodArg> for ScrapeMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::DirectUrl => ScrapeMethod::DirectUrl,
            MethodArg::EmailDomain => ScrapeMethod::EmailDomain,
            MethodArg::BusinessSearch => ScrapeMethod::BusinessSearch,
        }
    }
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .await
            .map_err(anyhow::Error::msg)?,
        None => Config::load().await,
    };
    let json = cli.json;

    match cli.command {
        Commands::Init => commands::init::cmd_init(&config).await,
        Commands::Contact { command } => match command {
            ContactCommands::Add {
                upload,
                name,
                email,
                website,
                state,
                zip,
                method,
            } => {
                let fields = commands::contact::NewContactArgs {
                    upload_id: upload,
                    name,
                    email,
                    website,
                    state,
                    zip,
                    method: method.into(),
                };
                commands::contact::cmd_contact_add(&config, fields, json).await
            }
            ContactCommands::List { upload_id } => {
                commands::contact::cmd_contact_list(&config, &upload_id, json).await
            }
        },
        Commands::Ready { upload_id, limit } => {
            commands::contact::cmd_ready(&config, &upload_id, limit, json).await
        }
        Commands::Scrape { contact_id, url } => {
            commands::scrape::cmd_scrape(&config, &contact_id, url, json).await
        }
        Commands::Batch { upload_id, limit } => {
            commands::scrape::cmd_batch(&config, &upload_id, limit, json).await
        }
        Commands::Reset { contact_id } => commands::scrape::cmd_reset(&config, &contact_id).await,
        Commands::History { contact_id } => {
            commands::scrape::cmd_history(&config, &contact_id, json).await
        }
        Commands::Fetch { url, rendered } => {
            commands::diagnose::cmd_fetch(&config, &url, rendered, json).await
        }
        Commands::Search { command } => match command {
            SearchCommands::Domain { domain } => {
                commands::diagnose::cmd_search_domain(&config, &domain, json).await
            }
            SearchCommands::Business { name, state, zip } => {
                commands::diagnose::cmd_search_business(
                    &config,
                    &name,
                    state.as_deref(),
                    zip.as_deref(),
                    json,
                )
                .await
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scrape_with_confirmed_url() {
        let cli = Cli::try_parse_from([
            "siteacquire",
            "--json",
            "scrape",
            "c1",
            "--url",
            "https://acme.test",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Scrape { contact_id, url } => {
                assert_eq!(contact_id, "c1");
                assert_eq!(url.as_deref(), Some("https://acme.test"));
            }
            _ => panic!("expected scrape"),
        }
    }

    #[test]
    fn test_method_uses_stored_names() {
        let cli = Cli::try_parse_from([
            "siteacquire",
            "contact",
            "add",
            "--upload",
            "u1",
            "--email",
            "jane@example.com",
            "--method",
            "email_domain",
        ])
        .unwrap();
        match cli.command {
            Commands::Contact {
                command: ContactCommands::Add { method, .. },
            } => assert_eq!(ScrapeMethod::from(method), ScrapeMethod::EmailDomain),
            _ => panic!("expected contact add"),
        }
    }
}

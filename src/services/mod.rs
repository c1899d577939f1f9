//! Service layer for siteacquire business logic.
//!
//! Services hold the domain flow; the CLI is a thin caller on top.

pub mod scraping;

pub use scraping::{BatchReport, FetchPolicy, ScrapeReport, ScrapingService};

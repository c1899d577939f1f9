//! Data models for siteacquire.

mod contact;
mod page;
mod scraped_data;

pub use contact::{Contact, ContactStatus, ScrapeMethod};
pub use page::{PageResult, SourcePage};
pub use scraped_data::ScrapedData;

//! Command implementations, one module per command group.

pub mod contact;
pub mod diagnose;
pub mod init;
pub mod scrape;

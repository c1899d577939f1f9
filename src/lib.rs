//! Business website acquisition and contact signal extraction.
//!
//! The pipeline resolves a site for a contact ([`discovery`]), fetches it
//! statically or in a browser ([`scrapers`]), and records one
//! [`models::ScrapedData`] per attempt ([`services::ScrapingService`]).

#![allow(clippy::should_implement_trait)]

pub mod cli;
pub mod config;
pub mod discovery;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod services;

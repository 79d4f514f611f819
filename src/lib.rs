pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod store;
pub mod utils;
pub mod web;

pub use config::Settings;
pub use error::ScheduleError;
pub use models::*;
pub use scrapers::{CapturedSite, ChromeBrowser, CpblScraper, PageExtractor};
pub use store::{Refresher, Snapshot, SnapshotStore};

use anyhow::Result;
use std::sync::Arc;

/// Build the scraper described by `settings`, live or from captured pages
pub fn build_scraper(settings: &Settings) -> Result<CpblScraper> {
    let extractor = PageExtractor::new(settings.browser()?, settings.extractor_config());
    Ok(CpblScraper::new(extractor)
        .with_url(settings.cpbl_url.clone())
        .with_settle_delay(settings.settle_delay))
}

/// Everything the web server needs, sharing one scraper
pub fn build_app(settings: &Settings) -> Result<(web::AppState, Refresher)> {
    let scraper = Arc::new(build_scraper(settings)?);
    let store = SnapshotStore::new();
    let refresher = Refresher::new(store.clone(), Arc::clone(&scraper), settings.refresh_policy());
    Ok((web::AppState { store, scraper }, refresher))
}

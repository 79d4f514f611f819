pub mod browser;
pub mod captured;
pub mod cpbl;
pub mod extractor;
pub mod layout;

pub use browser::{Browser, ChromeBrowser, PageSession, Script};
pub use captured::CapturedSite;
pub use cpbl::CpblScraper;
pub use extractor::{ExtractorConfig, PageExtractor, Step};

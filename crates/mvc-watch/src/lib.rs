pub mod cache;
pub mod config;
pub mod detector;
pub mod filter;
pub mod job;
pub mod join;
pub mod markdown;
pub mod notifier;
pub mod parser;
pub mod scraper;
pub mod types;

pub use scraper::{ScraperError, WebScraper};

pub(crate) const BASE_URL: &str = "https://telegov.njportal.com/njmvc/AppointmentWizard";

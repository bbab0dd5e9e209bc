use chrono::{DateTime, Utc};

use crate::cache::MessageCache;
use crate::config::Settings;
use crate::detector::{ChangeDetector, DetectorError, Outcome};
use crate::filter::build_message;
use crate::notifier::Notifier;
use crate::parser::ExtractError;
use crate::scraper::{ScraperError, WebScraper};
use crate::types::AppointmentType;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Scraper(#[from] ScraperError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

impl JobError {
    /// Operator-facing failure category.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Scraper(ScraperError::HttpError(_)) => "NetworkError",
            JobError::Scraper(ScraperError::Extract(ExtractError::NotFound(_))) => {
                "ExtractionError"
            }
            JobError::Scraper(ScraperError::Extract(ExtractError::InvalidJson { .. })) => {
                "ParseError"
            }
            JobError::Detector(DetectorError::Cache(_)) => "CacheError",
            JobError::Detector(DetectorError::Notify(_)) => "NotifierError",
        }
    }
}

/// One fetch, decide, notify cycle. The cache is left open for the caller to close.
pub async fn run_once(
    settings: &Settings,
    appointment_type: AppointmentType,
    scraper: &WebScraper,
    cache: &mut dyn MessageCache,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<Outcome, JobError> {
    let locations = scraper
        .fetch_locations(appointment_type, &settings.time_zone)
        .await?;

    let message = build_message(
        &locations,
        &settings.filter,
        appointment_type,
        now,
        &settings.time_zone,
    );

    let outcome = ChangeDetector::new(cache, notifier, &settings.cache_key)
        .process(message)
        .await?;

    log::info!("Run finished: {:?}", outcome);
    Ok(outcome)
}

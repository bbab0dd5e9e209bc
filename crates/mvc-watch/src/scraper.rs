use crate::join::join_locations;
use crate::parser::{ExtractError, extract_raw_data};
use crate::types::{AppointmentType, Locations, RawPortalData};

use chrono_tz::Tz;
use reqwest::Client;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: String,
}

impl WebScraper {
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the appointment wizard page and extracts both embedded blocks.
    pub async fn fetch_raw_data(
        &self,
        appointment_type: AppointmentType,
    ) -> Result<RawPortalData, ScraperError> {
        let url = format!("{}/{}", self.base_url, appointment_type.code());
        log::info!("Fetching {} appointment data from {}...", appointment_type, url);
        let html = self.get_html(&url).await?;
        Ok(extract_raw_data(&html)?)
    }

    pub async fn fetch_locations(
        &self,
        appointment_type: AppointmentType,
        tz: &Tz,
    ) -> Result<Locations, ScraperError> {
        let raw = self.fetch_raw_data(appointment_type).await?;
        let locations = join_locations(&self.base_url, appointment_type, raw, tz);
        for location in locations.values() {
            log::debug!("{}", location);
        }
        log::info!(
            "Joined {} location(s), {} with availability",
            locations.len(),
            locations
                .values()
                .filter(|l| l.next_availability.is_some())
                .count()
        );
        Ok(locations)
    }

    async fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

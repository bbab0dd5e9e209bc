use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::types::{RawLocationRecord, RawPortalData, RawTimeRecord};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Cannot find {0} in portal page")]
    NotFound(&'static str),
    #[error("Invalid JSON in {block}: {source}")]
    InvalidJson {
        block: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Pulls one JSON array literal assigned to a script variable out of a page.
///
/// The pattern's first capture group must contain the array literal.
pub struct BlockExtractor {
    name: &'static str,
    pattern: Regex,
}

impl BlockExtractor {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("invalid regex: block extractor"),
        }
    }

    pub fn extract_literal<'h>(&self, html: &'h str) -> Result<&'h str, ExtractError> {
        self.pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or(ExtractError::NotFound(self.name))
    }

    /// The literal must be a JSON array; entries that do not fit `T` are skipped.
    pub fn extract<T: DeserializeOwned>(&self, html: &str) -> Result<Vec<T>, ExtractError> {
        let literal = self.extract_literal(html)?;
        let entries: Vec<serde_json::Value> =
            serde_json::from_str(literal).map_err(|source| ExtractError::InvalidJson {
                block: self.name,
                source,
            })?;

        Ok(entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping {} entry {}: {}", self.name, index, e);
                    None
                }
            })
            .collect())
    }
}

pub static LOCATION_DATA: LazyLock<BlockExtractor> = LazyLock::new(|| {
    BlockExtractor::new("locationData", r"var\s+locationData\s+=\s+(\[.*?\]);")
});

pub static TIME_DATA: LazyLock<BlockExtractor> =
    LazyLock::new(|| BlockExtractor::new("timeData", r"var\s+timeData\s+=\s+(\[.*?\])\s*\n"));

static RE_NEXT_AVAILABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Next\s+Available:\s*([\d/ :]+ (?:AM|PM))")
        .expect("invalid regex: next available")
});

const SLOT_FORMATS: [&str; 2] = ["%m/%d/%Y %I:%M %p", "%m/%d/%Y %I:%M:%S %p"];

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts both embedded data blocks. Fails on the first block that is missing or malformed.
pub fn extract_raw_data(html: &str) -> Result<RawPortalData, ExtractError> {
    let locations: Vec<RawLocationRecord> = LOCATION_DATA.extract(html)?;
    let times: Vec<RawTimeRecord> = TIME_DATA.extract(html)?;

    log::debug!(
        "Extracted {} location record(s) and {} time record(s)",
        locations.len(),
        times.len()
    );

    Ok(RawPortalData { locations, times })
}

/// Reads the "Next Available: <date> <AM|PM>" fragment of a slot description as
/// a wall-clock time in `tz`. Returns `None` when there is no such fragment or
/// it does not name a real local time.
pub fn parse_next_available(slot: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let captured = RE_NEXT_AVAILABLE.captures(slot)?.get(1)?.as_str();
    let normalized = normalize_whitespace(captured).to_uppercase();

    let naive = SLOT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

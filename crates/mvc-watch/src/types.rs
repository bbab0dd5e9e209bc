use std::collections::HashMap;
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub type LocationId = u32;

/// Joined locations keyed by portal location id.
pub type Locations = HashMap<LocationId, Location>;

#[derive(Debug, thiserror::Error)]
#[error("Invalid appointment type '{0}'. Accepted values: 'real-id', 'realid', '12'")]
pub struct AppointmentTypeParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppointmentType {
    RealId,
}

impl AppointmentType {
    /// Numeric code used by the portal in wizard and booking paths.
    pub fn code(&self) -> u32 {
        match self {
            AppointmentType::RealId => 12,
        }
    }
}

impl FromStr for AppointmentType {
    type Err = AppointmentTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "real-id" | "realid" | "12" => Ok(AppointmentType::RealId),
            _ => Err(AppointmentTypeParseError(s.to_string())),
        }
    }
}

impl Display for AppointmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppointmentType::RealId => write!(f, "RealID"),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A `locationData` entry as embedded in the appointment wizard page.
///
/// Only `Id` is required; missing or null text fields become empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawLocationRecord {
    pub id: LocationId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub zip: String,
}

/// A `timeData` entry as embedded in the appointment wizard page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawTimeRecord {
    pub location_id: LocationId,
    #[serde(default)]
    pub first_open_slot: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPortalData {
    pub locations: Vec<RawLocationRecord>,
    pub times: Vec<RawTimeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub city: String,
    pub phone: String,
    pub address: String,
    pub zip_code: String,
    pub next_availability: Option<Availability>,
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} - {}", self.id, self.name, self.address)?;
        match &self.next_availability {
            Some(availability) => write!(f, " (next: {})", availability.timestamp),
            None => write!(f, " (no availability)"),
        }
    }
}

use chrono::TimeDelta;
use chrono_tz::Tz;

use crate::cache::DEFAULT_CACHE_KEY;
use crate::filter::{AvailabilityFilter, DEFAULT_HORIZON_DAYS, DEFAULT_SUBSCRIBED_LOCATIONS};
use crate::types::LocationId;

pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::America::New_York;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Env {0} is not set")]
    MissingEnvVar(String),
    #[error("Invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Everything a run needs apart from secrets.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub filter: AvailabilityFilter,
    pub cache_key: String,
    pub time_zone: Tz,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            filter: AvailabilityFilter::default(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            time_zone: DEFAULT_TIME_ZONE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Secrets for the live notifier and cache.
#[derive(Clone)]
pub struct Credentials {
    pub telegram_bot_token: String,
    pub telegram_user_id: String,
    pub redis_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_user_id", &self.telegram_user_id)
            .field("redis_url", &"<redacted>")
            .finish()
    }
}

/// Loads settings from the environment after reading `.env` if present.
pub fn load_settings() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    build_settings(|key| std::env::var(key))
}

/// Loads credentials from the environment after reading `.env` if present.
pub fn load_credentials() -> Result<Credentials, ConfigError> {
    dotenvy::dotenv().ok();
    build_credentials(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_location_ids(var: &str, raw: &str) -> Result<Vec<LocationId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<LocationId>().map_err(|e| invalid(var, e)))
        .collect()
}

fn build_settings<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = Settings::default();

    let base_url = lookup("MVC_BASE_URL").unwrap_or(defaults.base_url);
    let cache_key = lookup("MVC_CACHE_KEY").unwrap_or(defaults.cache_key);

    let subscribed_locations = match lookup("MVC_SUBSCRIBED_LOCATIONS") {
        Ok(raw) => parse_location_ids("MVC_SUBSCRIBED_LOCATIONS", &raw)?,
        Err(_) => DEFAULT_SUBSCRIBED_LOCATIONS.to_vec(),
    };

    let horizon_days = match lookup("MVC_HORIZON_DAYS") {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|e| invalid("MVC_HORIZON_DAYS", e))?,
        Err(_) => DEFAULT_HORIZON_DAYS,
    };
    let horizon = TimeDelta::try_days(horizon_days)
        .ok_or_else(|| invalid("MVC_HORIZON_DAYS", "out of range"))?;

    let filter = AvailabilityFilter {
        subscribed_locations,
        horizon,
    }
    .validate()
    .map_err(|e| invalid("MVC_SUBSCRIBED_LOCATIONS/MVC_HORIZON_DAYS", e))?;

    let time_zone = match lookup("MVC_TIME_ZONE") {
        Ok(raw) => raw
            .trim()
            .parse::<Tz>()
            .map_err(|e| invalid("MVC_TIME_ZONE", e))?,
        Err(_) => defaults.time_zone,
    };

    let request_timeout_secs = match lookup("MVC_REQUEST_TIMEOUT_SECS") {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid("MVC_REQUEST_TIMEOUT_SECS", e))?,
        Err(_) => defaults.request_timeout_secs,
    };

    Ok(Settings {
        base_url,
        filter,
        cache_key,
        time_zone,
        request_timeout_secs,
    })
}

fn build_credentials<F>(lookup: F) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    Ok(Credentials {
        telegram_bot_token: require("TELEGRAM_BOT_TOKEN")?,
        telegram_user_id: require("TELEGRAM_USER_ID")?,
        redis_url: require("REDIS_URL")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_settings_defaults() {
        let settings = build_settings(lookup_from(&[])).unwrap();

        assert_eq!(settings.base_url, crate::BASE_URL);
        assert_eq!(settings.filter.subscribed_locations, vec![125, 138, 139]);
        assert_eq!(settings.filter.horizon, TimeDelta::days(40));
        assert_eq!(settings.cache_key, "mvc_realid_message");
        assert_eq!(settings.time_zone, chrono_tz::America::New_York);
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn test_settings_overrides() {
        let settings = build_settings(lookup_from(&[
            ("MVC_SUBSCRIBED_LOCATIONS", "139, 125"),
            ("MVC_HORIZON_DAYS", "14"),
            ("MVC_TIME_ZONE", "America/Chicago"),
            ("MVC_CACHE_KEY", "other_key"),
        ]))
        .unwrap();

        assert_eq!(settings.filter.subscribed_locations, vec![139, 125]);
        assert_eq!(settings.filter.horizon, TimeDelta::days(14));
        assert_eq!(settings.time_zone, chrono_tz::America::Chicago);
        assert_eq!(settings.cache_key, "other_key");
    }

    #[test]
    fn test_settings_reject_bad_values() {
        assert!(matches!(
            build_settings(lookup_from(&[("MVC_SUBSCRIBED_LOCATIONS", "125,abc")])),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
        assert!(matches!(
            build_settings(lookup_from(&[("MVC_SUBSCRIBED_LOCATIONS", " , ")])),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
        assert!(matches!(
            build_settings(lookup_from(&[("MVC_HORIZON_DAYS", "0")])),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
        assert!(matches!(
            build_settings(lookup_from(&[("MVC_HORIZON_DAYS", "100000000")])),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
        assert!(matches!(
            build_settings(lookup_from(&[("MVC_HORIZON_DAYS", "1000000000")])),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
        assert!(matches!(
            build_settings(lookup_from(&[("MVC_TIME_ZONE", "Mars/Olympus")])),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
    }

    #[test]
    fn test_credentials_required() {
        let err = build_credentials(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("REDIS_URL", "redis://localhost"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Env TELEGRAM_USER_ID is not set");

        let credentials = build_credentials(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:s3cr3t"),
            ("TELEGRAM_USER_ID", "42"),
            ("REDIS_URL", "redis://localhost"),
        ]))
        .unwrap();
        assert_eq!(credentials.telegram_user_id, "42");
        assert!(!format!("{credentials:?}").contains("s3cr3t"));
    }
}

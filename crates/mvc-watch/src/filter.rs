use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use crate::markdown::{escape, escape_link_url};
use crate::types::{AppointmentType, Availability, Location, LocationId, Locations};

/// Bayonne, Newark, North Bergen.
pub const DEFAULT_SUBSCRIBED_LOCATIONS: [LocationId; 3] = [125, 138, 139];
pub const DEFAULT_HORIZON_DAYS: i64 = 40;
/// Ten years.
pub const MAX_HORIZON_DAYS: i64 = 3650;

const BLOCK_SEPARATOR: &str = "\\-\\-\\-\\-\\-\\-\\-\\-";

/// Which locations to report on, in notification order, and how far ahead a
/// slot may be to still be worth reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityFilter {
    pub subscribed_locations: Vec<LocationId>,
    pub horizon: TimeDelta,
}

impl Default for AvailabilityFilter {
    fn default() -> Self {
        Self {
            subscribed_locations: DEFAULT_SUBSCRIBED_LOCATIONS.to_vec(),
            horizon: TimeDelta::days(DEFAULT_HORIZON_DAYS),
        }
    }
}

impl AvailabilityFilter {
    pub fn validate(self) -> Result<Self, String> {
        if self.subscribed_locations.is_empty() {
            return Err("At least one subscribed location is required".to_string());
        }
        if self.horizon <= TimeDelta::zero() {
            return Err(format!(
                "Horizon must be positive, got {} day(s)",
                self.horizon.num_days()
            ));
        }
        if self.horizon > TimeDelta::days(MAX_HORIZON_DAYS) {
            return Err(format!(
                "Horizon must be at most {} days, got {} day(s)",
                MAX_HORIZON_DAYS,
                self.horizon.num_days()
            ));
        }
        Ok(self)
    }

    /// Inclusive: a slot exactly `horizon` away is still desired. A limit past
    /// the representable range accepts every slot.
    pub fn is_desired(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.checked_add_signed(self.horizon)
            .is_none_or(|limit| timestamp <= limit)
    }

    /// Subscribed locations with a desired slot, in subscription order.
    pub fn desired_locations<'a>(
        &'a self,
        locations: &'a Locations,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = (&'a Location, &'a Availability)> + 'a {
        self.subscribed_locations.iter().filter_map(move |id| {
            let location = locations.get(id)?;
            let availability = location.next_availability.as_ref()?;
            self.is_desired(availability.timestamp, now)
                .then_some((location, availability))
        })
    }
}

fn format_slot(timestamp: DateTime<Utc>, tz: &Tz) -> String {
    timestamp
        .with_timezone(tz)
        .format("%-m/%-d/%Y, %-I:%M:%S %p %Z")
        .to_string()
}

fn format_block(location: &Location, availability: &Availability, tz: &Tz) -> String {
    format!(
        "\n{}\n*Location:* {}\n*Address:* {}\n*Next available slot:* {}\n*Booking:* [link]({})",
        BLOCK_SEPARATOR,
        escape(&location.name),
        escape(&location.address),
        escape(&format_slot(availability.timestamp, tz)),
        escape_link_url(&availability.url)
    )
}

/// Composes the MarkdownV2 notification body, or `None` when no subscribed
/// location has a desired slot.
pub fn build_message(
    locations: &Locations,
    filter: &AvailabilityFilter,
    appointment_type: AppointmentType,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Option<String> {
    let blocks: Vec<String> = filter
        .desired_locations(locations, now)
        .map(|(location, availability)| format_block(location, availability, tz))
        .collect();

    if blocks.is_empty() {
        return None;
    }

    log::info!("{} subscribed location(s) have a desired slot", blocks.len());

    let header = format!(
        "*Push: Soonest MVC Knowledge {} Appointment*",
        escape(&appointment_type.to_string())
    );
    Some(header + &blocks.concat())
}

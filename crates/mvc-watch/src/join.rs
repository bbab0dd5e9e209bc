use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;

use crate::parser::parse_next_available;
use crate::types::{
    AppointmentType, Availability, Location, LocationId, Locations, RawLocationRecord,
    RawPortalData,
};

/// Builds the booking deep link for a slot.
///
/// Date parts and minute are zero-padded; the hour is not (`9:05` becomes `905`).
pub fn appointment_url(
    base_url: &str,
    location_id: LocationId,
    appointment_type: AppointmentType,
    timestamp: DateTime<Utc>,
    tz: &Tz,
) -> String {
    let local = timestamp.with_timezone(tz);
    format!(
        "{}/{}/{}/{}-{:02}-{:02}/{}{:02}",
        base_url.trim_end_matches('/'),
        appointment_type.code(),
        location_id,
        local.year(),
        local.month(),
        local.day(),
        local.hour(),
        local.minute()
    )
}

fn format_address(record: &RawLocationRecord) -> String {
    // Street2 is left out on purpose.
    format!(
        "{}, {}, {} {}",
        record.street1, record.city, record.state, record.zip
    )
}

impl From<RawLocationRecord> for Location {
    fn from(record: RawLocationRecord) -> Self {
        Location {
            id: record.id,
            address: format_address(&record),
            name: record.name,
            city: record.city,
            phone: record.phone_number,
            zip_code: record.zip,
            next_availability: None,
        }
    }
}

/// Merges location metadata with first-open-slot records.
///
/// Time records for unknown locations and slot text without a parseable
/// "Next Available" date are skipped.
pub fn join_locations(
    base_url: &str,
    appointment_type: AppointmentType,
    raw: RawPortalData,
    tz: &Tz,
) -> Locations {
    let mut locations: Locations = raw
        .locations
        .into_iter()
        .map(|record| (record.id, Location::from(record)))
        .collect();

    for time in raw.times {
        let Some(location) = locations.get_mut(&time.location_id) else {
            log::debug!("Skipping time record for unknown location {}", time.location_id);
            continue;
        };

        let Some(slot) = time.first_open_slot.as_deref() else {
            continue;
        };

        let Some(timestamp) = parse_next_available(slot, tz) else {
            log::debug!("No next availability for {} in {:?}", location.name, slot);
            continue;
        };

        location.next_availability = Some(Availability {
            timestamp,
            url: appointment_url(base_url, location.id, appointment_type, timestamp, tz),
        });
    }

    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_raw_data;
    use crate::types::RawTimeRecord;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use std::fs;

    const BASE: &str = "https://telegov.njportal.com/njmvc/AppointmentWizard";

    fn raw_location(id: LocationId, name: &str) -> RawLocationRecord {
        RawLocationRecord {
            id,
            name: name.to_string(),
            city: "Newark".to_string(),
            state: "NJ".to_string(),
            phone_number: "(609) 292-6500".to_string(),
            street1: "124 Frelinghuysen Ave".to_string(),
            street2: Some("Suite 2".to_string()),
            zip: "07114".to_string(),
        }
    }

    fn raw_time(location_id: LocationId, slot: Option<&str>) -> RawTimeRecord {
        RawTimeRecord {
            location_id,
            first_open_slot: slot.map(str::to_string),
        }
    }

    #[test]
    fn test_appointment_url_pads_minute_not_hour() {
        let timestamp = New_York
            .with_ymd_and_hms(2026, 11, 3, 9, 5, 0)
            .unwrap()
            .with_timezone(&Utc);

        let url = appointment_url(BASE, 125, AppointmentType::RealId, timestamp, &New_York);

        assert_eq!(url, format!("{BASE}/12/125/2026-11-03/905"));
    }

    #[test]
    fn test_appointment_url_uses_24_hour_clock() {
        let timestamp = New_York
            .with_ymd_and_hms(2026, 12, 20, 13, 40, 0)
            .unwrap()
            .with_timezone(&Utc);

        let url = appointment_url(BASE, 139, AppointmentType::RealId, timestamp, &New_York);

        assert_eq!(url, format!("{BASE}/12/139/2026-12-20/1340"));
    }

    #[test]
    fn test_appointment_url_is_deterministic() {
        let timestamp = Utc.with_ymd_and_hms(2026, 1, 2, 5, 0, 0).unwrap();

        let first = appointment_url(BASE, 7, AppointmentType::RealId, timestamp, &New_York);
        let second = appointment_url(BASE, 7, AppointmentType::RealId, timestamp, &New_York);

        assert_eq!(first, second);
        assert_eq!(first, format!("{BASE}/12/7/2026-01-02/000"));
    }

    #[test]
    fn test_address_drops_second_street_line() {
        let location = Location::from(raw_location(138, "Newark"));

        assert_eq!(location.address, "124 Frelinghuysen Ave, Newark, NJ 07114");
        assert!(location.next_availability.is_none());
    }

    #[test]
    fn test_join_from_fixture() {
        let html = fs::read_to_string("fixtures/appointment_wizard_real_id.html")
            .expect("Failed to read fixture");
        let raw = extract_raw_data(&html).expect("Failed to extract portal data");

        let locations = join_locations(BASE, AppointmentType::RealId, raw, &New_York);

        assert_eq!(locations.len(), 4);
        assert!(!locations.contains_key(&999));

        let bayonne = &locations[&125];
        let availability = bayonne.next_availability.as_ref().expect("Bayonne has a slot");
        assert_eq!(availability.url, format!("{BASE}/12/125/2026-11-03/905"));

        assert!(locations[&138].next_availability.is_none());

        let north_bergen = locations[&139].next_availability.as_ref().unwrap();
        assert_eq!(north_bergen.url, format!("{BASE}/12/139/2026-11-20/1340"));
    }

    #[test]
    fn test_unknown_location_time_record_is_ignored() {
        let raw = RawPortalData {
            locations: vec![raw_location(1, "One")],
            times: vec![raw_time(2, Some("Next Available: 11/03/2026 09:05 AM"))],
        };

        let locations = join_locations(BASE, AppointmentType::RealId, raw, &New_York);

        assert_eq!(locations.len(), 1);
        assert!(locations[&1].next_availability.is_none());
    }

    #[test]
    fn test_unparseable_or_missing_slot_leaves_no_availability() {
        let raw = RawPortalData {
            locations: vec![raw_location(1, "One"), raw_location(2, "Two")],
            times: vec![raw_time(1, Some("Next Available: whenever")), raw_time(2, None)],
        };

        let locations = join_locations(BASE, AppointmentType::RealId, raw, &New_York);

        assert!(locations.values().all(|l| l.next_availability.is_none()));
    }

    #[test]
    fn test_duplicate_location_last_record_wins() {
        let raw = RawPortalData {
            locations: vec![raw_location(5, "First"), raw_location(5, "Second")],
            times: Vec::new(),
        };

        let locations = join_locations(BASE, AppointmentType::RealId, raw, &New_York);

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[&5].name, "Second");
    }
}

//! Conversion of raw provider records into [`NormalizedIncident`]s.

use crime_dash_incident_models::{BoundingBox, NormalizedIncident, SchemaKeys};

use crate::RawRecord;
use crate::parsing::{coordinate_field, text_field, timestamp_field};

/// Result of normalizing one load's worth of raw records.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Incidents in provider order.
    pub incidents: Vec<NormalizedIncident>,
    /// Records dropped for lacking a parseable timestamp.
    pub dropped: u64,
}

/// Normalizes a single record, or returns `None` if its timestamp is
/// missing or unparseable.
#[must_use]
pub fn normalize_record(
    record: &RawRecord,
    keys: &SchemaKeys,
    bounds: &BoundingBox,
) -> Option<NormalizedIncident> {
    let timestamp = timestamp_field(record, &keys.date_key)?;

    let latitude = coordinate_field(record, keys.lat_key.as_deref());
    let longitude = coordinate_field(record, keys.lon_key.as_deref());
    let has_valid_coordinate = matches!(
        (latitude, longitude),
        (Some(lat), Some(lon)) if bounds.contains(lat, lon)
    );

    Some(NormalizedIncident {
        timestamp,
        date: timestamp.format("%Y-%m-%d").to_string(),
        precinct: text_field(record, keys.precinct_key.as_deref()),
        offense_group: text_field(record, keys.offense_group_key.as_deref()),
        crime_against: text_field(record, keys.crime_against_key.as_deref()),
        neighborhood: text_field(record, keys.neighborhood_key.as_deref()),
        latitude,
        longitude,
        has_valid_coordinate,
    })
}

/// Normalizes every record, silently dropping those without a usable
/// timestamp. Incidents with missing or out-of-bounds coordinates are kept.
#[must_use]
pub fn normalize_records(
    records: &[RawRecord],
    keys: &SchemaKeys,
    bounds: &BoundingBox,
) -> Normalized {
    let mut incidents = Vec::with_capacity(records.len());
    let mut dropped = 0_u64;

    for record in records {
        match normalize_record(record, keys, bounds) {
            Some(incident) => incidents.push(incident),
            None => dropped += 1,
        }
    }

    log::info!(
        "Normalized {} incidents from {} raw records ({dropped} without a date)",
        incidents.len(),
        records.len()
    );

    Normalized { incidents, dropped }
}

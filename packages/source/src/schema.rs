//! Schema resolution against a probe record.
//!
//! The provider has renamed columns across republished versions of the
//! dataset, so field names are never hard-coded downstream. Instead a single
//! probe record is matched against each column's candidate list and the
//! result is carried as an immutable [`SchemaKeys`].

use crime_dash_incident_models::SchemaKeys;

use crate::config::SchemaCandidates;
use crate::{RawRecord, SourceError};

/// Returns the first candidate present as a key in `sample`.
///
/// Presence is all that matters: a key holding `null` or an empty string
/// still resolves.
fn first_present(sample: &RawRecord, candidates: &[String]) -> Option<String> {
    candidates
        .iter()
        .find(|candidate| sample.contains_key(candidate.as_str()))
        .cloned()
}

/// Resolves every semantic column against one sample record.
///
/// # Errors
///
/// Returns [`SourceError::MissingDateColumn`] if none of the date
/// candidates is present. All other columns resolve to `None` when
/// unmatched.
pub fn resolve_schema(
    sample: &RawRecord,
    candidates: &SchemaCandidates,
) -> Result<SchemaKeys, SourceError> {
    let Some(date_key) = first_present(sample, &candidates.date) else {
        return Err(SourceError::MissingDateColumn {
            candidates: candidates.date.clone(),
        });
    };

    let keys = SchemaKeys {
        date_key,
        precinct_key: first_present(sample, &candidates.precinct),
        offense_group_key: first_present(sample, &candidates.offense_group),
        crime_against_key: first_present(sample, &candidates.crime_against),
        lat_key: first_present(sample, &candidates.latitude),
        lon_key: first_present(sample, &candidates.longitude),
        neighborhood_key: first_present(sample, &candidates.neighborhood),
    };

    log::debug!("Resolved schema: {keys:?}");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;

    fn record(value: serde_json::Value) -> RawRecord {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn candidates() -> SchemaCandidates {
        DashboardConfig::embedded().unwrap().schema
    }

    #[test]
    fn prefers_report_date_time_over_offense_date() {
        let sample = record(serde_json::json!({
            "offense_date": "2024-01-01T00:00:00.000",
            "report_date_time": "2024-01-02T00:00:00.000",
        }));
        let keys = resolve_schema(&sample, &candidates()).unwrap();
        assert_eq!(keys.date_key, "report_date_time");
    }

    #[test]
    fn falls_back_to_offense_date() {
        let sample = record(serde_json::json!({"offense_date": "2024-01-01T00:00:00.000"}));
        let keys = resolve_schema(&sample, &candidates()).unwrap();
        assert_eq!(keys.date_key, "offense_date");
    }

    #[test]
    fn null_valued_key_still_resolves() {
        let sample = record(serde_json::json!({
            "report_date_time": "2024-01-02T00:00:00.000",
            "neighborhood": null,
        }));
        let keys = resolve_schema(&sample, &candidates()).unwrap();
        assert_eq!(keys.neighborhood_key.as_deref(), Some("neighborhood"));
    }

    #[test]
    fn optional_columns_degrade_to_none() {
        let sample = record(serde_json::json!({"offense_date": "2024-01-01T00:00:00.000"}));
        let keys = resolve_schema(&sample, &candidates()).unwrap();
        assert!(keys.precinct_key.is_none());
        assert!(keys.lat_key.is_none());
        assert!(keys.neighborhood_key.is_none());
    }

    #[test]
    fn resolves_current_seattle_schema() {
        let sample = record(serde_json::json!({
            "report_number": "2024-000001",
            "report_date_time": "2024-01-02T08:15:00.000",
            "offense_date": "2024-01-01T23:00:00.000",
            "nibrs_crime_against_category": "PROPERTY",
            "offense_sub_category": "LARCENY-THEFT",
            "offense_category": "PROPERTY CRIME",
            "precinct": "West",
            "neighborhood": "DOWNTOWN COMMERCIAL",
            "latitude": "47.6097",
            "longitude": "-122.3331",
        }));
        let keys = resolve_schema(&sample, &candidates()).unwrap();
        assert_eq!(keys.offense_group_key.as_deref(), Some("offense_category"));
        assert_eq!(
            keys.crime_against_key.as_deref(),
            Some("nibrs_crime_against_category")
        );
        assert_eq!(keys.precinct_key.as_deref(), Some("precinct"));
    }

    #[test]
    fn missing_date_column_is_an_error() {
        let sample = record(serde_json::json!({"precinct": "North"}));
        let err = resolve_schema(&sample, &candidates()).unwrap_err();
        assert!(matches!(err, SourceError::MissingDateColumn { .. }));
    }

    #[test]
    fn empty_probe_is_a_missing_date_column() {
        let err = resolve_schema(&RawRecord::new(), &candidates()).unwrap_err();
        assert!(matches!(err, SourceError::MissingDateColumn { .. }));
    }
}

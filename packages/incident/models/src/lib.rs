#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident, schema, filter, and derived view types for the crime dashboard.
//!
//! Raw provider records are resolved against a [`SchemaKeys`] mapping and
//! normalized into [`NormalizedIncident`]s. A [`FilterState`] narrows the
//! loaded set, and the analytics engine turns the pair into a
//! [`DerivedView`] for the rendering layer.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Placeholder value for categorical fields the provider did not supply.
pub const UNKNOWN: &str = "Unknown";

/// Wire form of [`FieldFilter::All`].
pub const ALL: &str = "ALL";

/// A latitude/longitude rectangle. Bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude bound.
    pub min_lat: f64,
    /// Northern latitude bound.
    pub max_lat: f64,
    /// Western longitude bound.
    pub min_lon: f64,
    /// Eastern longitude bound.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Rough bounds of the city of Seattle.
    pub const SEATTLE: Self = Self {
        min_lat: 47.45,
        max_lat: 47.75,
        min_lon: -122.45,
        max_lon: -122.20,
    };

    /// Returns `true` if the point lies strictly inside the box.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude > self.min_lat
            && latitude < self.max_lat
            && longitude > self.min_lon
            && longitude < self.max_lon
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::SEATTLE
    }
}

/// Sizing limits for a load and for the derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardLimits {
    /// Rows requested per provider page.
    pub page_size: u64,
    /// Upper bound on rows retrieved by a single load.
    pub max_total_rows: u64,
    /// Length of the default date range, ending today.
    pub lookback_days: u32,
    /// Maximum number of map points handed to the renderer.
    pub map_point_cap: usize,
    /// Number of offense groups kept in the ranking.
    pub top_n: usize,
}

impl Default for DashboardLimits {
    fn default() -> Self {
        Self {
            page_size: 5_000,
            max_total_rows: 50_000,
            lookback_days: 30,
            map_point_cap: 2_000,
            top_n: 12,
        }
    }
}

/// The semantic columns of the provider's dataset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SemanticColumn {
    /// Incident timestamp.
    Date,
    /// Police precinct.
    Precinct,
    /// Offense group (the ranking dimension).
    OffenseGroup,
    /// Crime-against category (person, property, society).
    CrimeAgainst,
    /// Latitude.
    Latitude,
    /// Longitude.
    Longitude,
    /// Neighborhood name.
    Neighborhood,
}

impl SemanticColumn {
    /// Every column, in the order they are selected from the provider.
    pub const ALL: [Self; 7] = [
        Self::Date,
        Self::Precinct,
        Self::OffenseGroup,
        Self::CrimeAgainst,
        Self::Latitude,
        Self::Longitude,
        Self::Neighborhood,
    ];
}

/// Provider field names resolved for each semantic column of one load.
///
/// Only the date column is mandatory; every other column may be missing
/// from the provider's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaKeys {
    /// Field holding the incident timestamp.
    pub date_key: String,
    /// Field holding the precinct.
    pub precinct_key: Option<String>,
    /// Field holding the offense group.
    pub offense_group_key: Option<String>,
    /// Field holding the crime-against category.
    pub crime_against_key: Option<String>,
    /// Field holding the latitude.
    pub lat_key: Option<String>,
    /// Field holding the longitude.
    pub lon_key: Option<String>,
    /// Field holding the neighborhood.
    pub neighborhood_key: Option<String>,
}

impl SchemaKeys {
    /// Returns the field resolved for `column`, if any.
    #[must_use]
    pub fn key(&self, column: SemanticColumn) -> Option<&str> {
        match column {
            SemanticColumn::Date => Some(&self.date_key),
            SemanticColumn::Precinct => self.precinct_key.as_deref(),
            SemanticColumn::OffenseGroup => self.offense_group_key.as_deref(),
            SemanticColumn::CrimeAgainst => self.crime_against_key.as_deref(),
            SemanticColumn::Latitude => self.lat_key.as_deref(),
            SemanticColumn::Longitude => self.lon_key.as_deref(),
            SemanticColumn::Neighborhood => self.neighborhood_key.as_deref(),
        }
    }

    /// Resolved field names in column order, without duplicates.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::with_capacity(7);
        for column in SemanticColumn::ALL {
            if let Some(key) = self.key(column)
                && !columns.contains(&key)
            {
                columns.push(key);
            }
        }
        columns
    }
}

/// A crime incident in the dashboard's canonical shape.
///
/// Categorical fields are never empty: anything the provider omitted is
/// [`UNKNOWN`]. Coordinates are kept even when out of bounds; only
/// `has_valid_coordinate` decides whether the incident reaches the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedIncident {
    /// When the incident was reported or occurred.
    pub timestamp: DateTime<Utc>,
    /// `YYYY-MM-DD` form of `timestamp`, used for bucketing.
    pub date: String,
    /// Police precinct.
    pub precinct: String,
    /// Offense group.
    pub offense_group: String,
    /// Crime-against category.
    pub crime_against: String,
    /// Neighborhood.
    pub neighborhood: String,
    /// Latitude (WGS84), if the provider supplied a number.
    pub latitude: Option<f64>,
    /// Longitude (WGS84), if the provider supplied a number.
    pub longitude: Option<f64>,
    /// Both coordinates present and inside the city bounding box.
    pub has_valid_coordinate: bool,
}

impl NormalizedIncident {
    /// Calendar date of the incident.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// A categorical filter that either passes everything or one exact value.
///
/// Serialized as the literal `"ALL"` or the selected value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldFilter {
    /// No filtering.
    #[default]
    All,
    /// Only incidents whose field equals this value.
    Only(String),
}

impl FieldFilter {
    /// Returns `true` if `value` passes the filter.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }

    /// Returns `true` for [`FieldFilter::All`].
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl From<String> for FieldFilter {
    fn from(value: String) -> Self {
        if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
            Self::All
        } else {
            Self::Only(value)
        }
    }
}

impl From<&str> for FieldFilter {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<FieldFilter> for String {
    fn from(filter: FieldFilter) -> Self {
        match filter {
            FieldFilter::All => ALL.to_string(),
            FieldFilter::Only(value) => value,
        }
    }
}

impl std::fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Only(value) => f.write_str(value),
        }
    }
}

/// The user's active filters.
///
/// The date range is inclusive on both ends and compared at day
/// granularity. `offense_group` is the cross-chart selection made by
/// clicking a bar in the ranking chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// First day of the range.
    pub start: NaiveDate,
    /// Last day of the range.
    pub end: NaiveDate,
    /// Precinct filter.
    pub precinct: FieldFilter,
    /// Crime-against category filter.
    pub crime_against: FieldFilter,
    /// Cross-chart offense group selection.
    pub offense_group: Option<String>,
}

impl FilterState {
    /// The default filters: the `lookback_days` days ending on `today`, no
    /// categorical filters, no selection.
    #[must_use]
    pub fn defaults_for(today: NaiveDate, lookback_days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start,
            end: today,
            precinct: FieldFilter::All,
            crime_against: FieldFilter::All,
            offense_group: None,
        }
    }

    /// Returns `true` if `day` falls within the inclusive date range.
    #[must_use]
    pub fn contains_day(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

/// Incident counts per day, as parallel label/count sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    /// `YYYY-MM-DD` labels, ascending.
    pub labels: Vec<String>,
    /// Count for each label.
    pub counts: Vec<u64>,
}

/// Top offense groups by incident count, as parallel label/count sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    /// Offense group labels, most frequent first.
    pub labels: Vec<String>,
    /// Count for each label.
    pub counts: Vec<u64>,
}

/// A point for the map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Offense group.
    pub offense_group: String,
    /// `YYYY-MM-DD` date.
    pub date: String,
    /// Police precinct.
    pub precinct: String,
    /// Neighborhood.
    pub neighborhood: String,
}

/// Counts describing how the view was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTotals {
    /// Incidents matching all filters.
    pub matched: u64,
    /// Matching incidents with a valid coordinate.
    pub mappable: u64,
    /// Points emitted for the map.
    pub plotted: u64,
    /// Stride used when downsampling the map (1 when not sampled).
    pub stride: u64,
}

/// Everything the rendering layer draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    /// Daily counts.
    pub time_series: TimeSeries,
    /// Offense group ranking.
    pub ranking: Ranking,
    /// Sampled map points.
    pub map_points: Vec<MapPoint>,
    /// Match and sampling counts.
    pub totals: ViewTotals,
}

/// Values available in the filter dropdowns for the loaded set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Distinct precincts, ascending.
    pub precincts: Vec<String>,
    /// Distinct crime-against categories, ascending.
    pub crime_against: Vec<String>,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    /// First requested day.
    pub start: NaiveDate,
    /// Last requested day.
    pub end: NaiveDate,
    /// Rows returned by the provider.
    pub rows_fetched: u64,
    /// Incidents kept after normalization.
    pub incidents: u64,
    /// Rows dropped because their date could not be parsed.
    pub dropped: u64,
    /// Whether the row cap stopped pagination.
    pub capped: bool,
    /// Field names resolved from the probe record.
    pub schema: SchemaKeys,
}

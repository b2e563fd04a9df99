#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filtering and aggregation engine for the dashboard views.
//!
//! Everything here is a pure function of the loaded incidents and the
//! active [`FilterState`]: the same inputs always produce the same
//! [`DerivedView`], so the view can be recomputed on every filter change.

pub mod aggregate;

use crime_dash_incident_models::{
    DashboardLimits, DerivedView, FilterOptions, FilterState, NormalizedIncident, ViewTotals,
};

use crate::aggregate::{distinct_sorted, offense_ranking, sample_map_points, time_series};

/// Returns `true` if `incident` passes every active filter.
///
/// Filters apply in order: date range, precinct, crime-against category,
/// then the cross-chart offense group selection.
#[must_use]
pub fn matches_filters(incident: &NormalizedIncident, filters: &FilterState) -> bool {
    filters.contains_day(incident.day())
        && filters.precinct.matches(&incident.precinct)
        && filters.crime_against.matches(&incident.crime_against)
        && filters
            .offense_group
            .as_deref()
            .is_none_or(|group| group == incident.offense_group)
}

/// Returns the incidents passing all filters, in their original order.
#[must_use]
pub fn filter_incidents<'a>(
    incidents: &'a [NormalizedIncident],
    filters: &FilterState,
) -> Vec<&'a NormalizedIncident> {
    incidents
        .iter()
        .filter(|incident| matches_filters(incident, filters))
        .collect()
}

/// Computes the time series, offense ranking, and map sample for the
/// filtered incidents.
#[must_use]
pub fn derive_view(
    incidents: &[NormalizedIncident],
    filters: &FilterState,
    limits: &DashboardLimits,
) -> DerivedView {
    let filtered = filter_incidents(incidents, filters);
    let sample = sample_map_points(&filtered, limits.map_point_cap);

    let totals = ViewTotals {
        matched: filtered.len() as u64,
        mappable: sample.mappable,
        plotted: sample.points.len() as u64,
        stride: sample.stride,
    };

    log::debug!(
        "Derived view: {} of {} incidents matched, {} plotted (stride {})",
        totals.matched,
        incidents.len(),
        totals.plotted,
        totals.stride
    );

    DerivedView {
        time_series: time_series(&filtered),
        ranking: offense_ranking(&filtered, limits.top_n),
        map_points: sample.points,
        totals,
    }
}

/// Distinct precincts and crime-against categories in the loaded set.
#[must_use]
pub fn filter_options(incidents: &[NormalizedIncident]) -> FilterOptions {
    FilterOptions {
        precincts: distinct_sorted(incidents.iter().map(|i| i.precinct.as_str())),
        crime_against: distinct_sorted(incidents.iter().map(|i| i.crime_against.as_str())),
    }
}

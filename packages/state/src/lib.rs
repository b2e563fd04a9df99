#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard application state.
//!
//! [`Dashboard`] holds the loaded incidents, the active filters, and the
//! cross-chart selection. It only changes through its transition methods,
//! each of which consumes the current state and returns the next one.
//!
//! Loads are split into [`Dashboard::begin_load`] and
//! [`Dashboard::finish_load`] so the network work can happen outside any
//! lock. Every `begin_load` bumps a generation counter; a result carrying
//! an older [`LoadTicket`] is discarded so a slow, superseded load can
//! never overwrite a newer one.

use std::sync::Arc;

use chrono::NaiveDate;
use crime_dash_analytics::{derive_view, filter_options};
use crime_dash_incident_models::{
    DashboardLimits, DerivedView, FieldFilter, FilterOptions, FilterState, LoadSummary,
    NormalizedIncident,
};
use crime_dash_source::{LoadedIncidents, SourceError};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Guidance shown alongside every load failure.
pub const LOAD_FAILURE_HINT: &str = "Try narrowing the date range.";

/// Errors from invalid state transitions.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The start date is after the end date.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Requested first day.
        start: NaiveDate,
        /// Requested last day.
        end: NaiveDate,
    },
}

/// Where the most recent load stands.
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
pub enum LoadStatus {
    /// Nothing has been loaded yet.
    Idle,
    /// A load is in flight.
    Loading,
    /// The latest load succeeded.
    Ready,
    /// The latest load failed; earlier data (if any) is still shown.
    Failed,
}

/// A user-facing description of a failed load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadFailure {
    /// What went wrong.
    pub message: String,
    /// What the user can try next.
    pub hint: String,
}

impl From<&SourceError> for LoadFailure {
    fn from(err: &SourceError) -> Self {
        let message = match err {
            SourceError::MissingDateColumn { .. } => {
                format!("The dataset schema is not recognized. {err}")
            }
            SourceError::Status { status, body } => {
                format!("The data provider returned HTTP {status}. {body}")
            }
            _ => format!("Failed to load incidents: {err}"),
        };
        Self {
            message,
            hint: LOAD_FAILURE_HINT.to_string(),
        }
    }
}

/// Identifies one load started by [`Dashboard::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    /// Generation this load belongs to.
    pub generation: u64,
    /// First day to fetch.
    pub start: NaiveDate,
    /// Last day to fetch.
    pub end: NaiveDate,
}

/// Incidents from the last successful load.
#[derive(Debug)]
pub struct Dataset {
    /// Normalized incidents.
    pub incidents: Vec<NormalizedIncident>,
    /// What the load retrieved.
    pub summary: LoadSummary,
}

/// A partial filter edit. `None` leaves a field unchanged.
///
/// The offense group selection is deliberately absent: it only changes
/// through [`Dashboard::select`] and [`Dashboard::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterUpdate {
    /// New first day.
    pub start: Option<NaiveDate>,
    /// New last day.
    pub end: Option<NaiveDate>,
    /// New precinct filter.
    pub precinct: Option<FieldFilter>,
    /// New crime-against filter.
    pub crime_against: Option<FieldFilter>,
}

/// The whole dashboard: loaded data, filters, selection, and load status.
#[derive(Debug, Clone)]
pub struct Dashboard {
    limits: DashboardLimits,
    filters: FilterState,
    dataset: Option<Arc<Dataset>>,
    generation: u64,
    status: LoadStatus,
    last_error: Option<LoadFailure>,
}

impl Dashboard {
    /// An empty dashboard with the default date range ending on `today`.
    #[must_use]
    pub fn new(limits: DashboardLimits, today: NaiveDate) -> Self {
        Self {
            filters: FilterState::defaults_for(today, limits.lookback_days),
            limits,
            dataset: None,
            generation: 0,
            status: LoadStatus::Idle,
            last_error: None,
        }
    }

    /// Active filters.
    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Current offense group selection.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.filters.offense_group.as_deref()
    }

    /// Status of the most recent load.
    #[must_use]
    pub const fn status(&self) -> LoadStatus {
        self.status
    }

    /// Failure from the most recent load, if it failed.
    #[must_use]
    pub const fn last_error(&self) -> Option<&LoadFailure> {
        self.last_error.as_ref()
    }

    /// Summary of the dataset currently shown.
    #[must_use]
    pub fn load_summary(&self) -> Option<&LoadSummary> {
        self.dataset.as_deref().map(|dataset| &dataset.summary)
    }

    /// Limits applied to loads and views.
    #[must_use]
    pub const fn limits(&self) -> &DashboardLimits {
        &self.limits
    }

    /// Loaded incidents (empty before the first successful load).
    #[must_use]
    pub fn incidents(&self) -> &[NormalizedIncident] {
        match &self.dataset {
            Some(dataset) => &dataset.incidents,
            None => &[],
        }
    }

    /// Recomputes the charts from the loaded incidents and filters.
    #[must_use]
    pub fn view(&self) -> DerivedView {
        derive_view(self.incidents(), &self.filters, &self.limits)
    }

    /// Filter dropdown values for the loaded incidents.
    #[must_use]
    pub fn options(&self) -> FilterOptions {
        filter_options(self.incidents())
    }

    /// Starts a load of the current date range, superseding any load
    /// already in flight.
    #[must_use]
    pub fn begin_load(mut self) -> (Self, LoadTicket) {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        let ticket = LoadTicket {
            generation: self.generation,
            start: self.filters.start,
            end: self.filters.end,
        };
        log::debug!("Starting load generation {}", ticket.generation);
        (self, ticket)
    }

    /// Applies `update` and starts a load of the resulting date range as a
    /// single transition.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidDateRange`] if the resulting start date
    /// is after the end date. No load is started in that case.
    pub fn begin_load_with(self, update: FilterUpdate) -> Result<(Self, LoadTicket), StateError> {
        Ok(self.set_filter(update)?.begin_load())
    }

    /// Returns `true` if `ticket` belongs to the most recently started load.
    #[must_use]
    pub const fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Applies the outcome of the load identified by `ticket`.
    ///
    /// Results from superseded loads are dropped. A successful load
    /// replaces the dataset wholesale; a failed one records the error and
    /// keeps the previous dataset. The offense group selection survives
    /// either way.
    #[must_use]
    pub fn finish_load(
        mut self,
        ticket: LoadTicket,
        result: Result<LoadedIncidents, SourceError>,
    ) -> Self {
        if !self.is_current(&ticket) {
            log::info!(
                "Discarding stale load generation {} (current is {})",
                ticket.generation,
                self.generation
            );
            return self;
        }

        match result {
            Ok(loaded) => {
                log::info!(
                    "Loaded {} incidents for {} to {}",
                    loaded.incidents.len(),
                    ticket.start,
                    ticket.end
                );
                self.dataset = Some(Arc::new(Dataset {
                    incidents: loaded.incidents,
                    summary: loaded.summary,
                }));
                self.status = LoadStatus::Ready;
                self.last_error = None;
            }
            Err(e) => {
                log::error!("Load failed: {e}");
                self.status = LoadStatus::Failed;
                self.last_error = Some(LoadFailure::from(&e));
            }
        }
        self
    }

    /// Applies a partial filter edit.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidDateRange`] if the resulting start date
    /// is after the end date.
    pub fn set_filter(mut self, update: FilterUpdate) -> Result<Self, StateError> {
        let start = update.start.unwrap_or(self.filters.start);
        let end = update.end.unwrap_or(self.filters.end);
        if start > end {
            return Err(StateError::InvalidDateRange { start, end });
        }

        self.filters.start = start;
        self.filters.end = end;
        if let Some(precinct) = update.precinct {
            self.filters.precinct = precinct;
        }
        if let Some(crime_against) = update.crime_against {
            self.filters.crime_against = crime_against;
        }
        Ok(self)
    }

    /// Cross-filters every chart to one offense group.
    #[must_use]
    pub fn select(mut self, group: impl Into<String>) -> Self {
        self.filters.offense_group = Some(group.into());
        self
    }

    /// Removes the offense group selection.
    #[must_use]
    pub fn clear(mut self) -> Self {
        self.filters.offense_group = None;
        self
    }

    /// Restores the default date range ending on `today` and clears every
    /// filter and the selection. Loaded data is kept.
    #[must_use]
    pub fn reset_all(mut self, today: NaiveDate) -> Self {
        self.filters = FilterState::defaults_for(today, self.limits.lookback_days);
        self
    }
}

#[cfg(test)]
mod tests {
    use crime_dash_incident_models::{SchemaKeys, UNKNOWN};

    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn incident(date: &str, precinct: &str, offense_group: &str) -> NormalizedIncident {
        NormalizedIncident {
            timestamp: day(date).and_hms_opt(9, 0, 0).unwrap().and_utc(),
            date: date.to_string(),
            precinct: precinct.to_string(),
            offense_group: offense_group.to_string(),
            crime_against: "PERSON".to_string(),
            neighborhood: UNKNOWN.to_string(),
            latitude: Some(47.6),
            longitude: Some(-122.33),
            has_valid_coordinate: true,
        }
    }

    fn loaded(incidents: Vec<NormalizedIncident>) -> LoadedIncidents {
        let count = incidents.len() as u64;
        LoadedIncidents {
            incidents,
            summary: LoadSummary {
                start: day("2024-03-01"),
                end: day("2024-03-31"),
                rows_fetched: count,
                incidents: count,
                dropped: 0,
                capped: false,
                schema: SchemaKeys {
                    date_key: "report_date_time".to_string(),
                    precinct_key: Some("precinct".to_string()),
                    offense_group_key: Some("offense_category".to_string()),
                    crime_against_key: None,
                    lat_key: None,
                    lon_key: None,
                    neighborhood_key: None,
                },
            },
        }
    }

    fn fixture() -> Vec<NormalizedIncident> {
        vec![
            incident("2024-03-02", "North", "ASSAULT"),
            incident("2024-03-02", "West", "THEFT"),
            incident("2024-03-05", "West", "ASSAULT"),
            incident("2024-03-09", "East", "BURGLARY"),
        ]
    }

    fn ready_dashboard() -> Dashboard {
        let (dashboard, ticket) = Dashboard::new(DashboardLimits::default(), day("2024-03-31"))
            .begin_load();
        dashboard.finish_load(ticket, Ok(loaded(fixture())))
    }

    fn provider_error() -> SourceError {
        SourceError::Status {
            status: 500,
            body: "oops".to_string(),
        }
    }

    #[test]
    fn new_dashboard_uses_default_range() {
        let dashboard = Dashboard::new(DashboardLimits::default(), day("2024-03-31"));
        assert_eq!(dashboard.filters().start, day("2024-03-01"));
        assert_eq!(dashboard.filters().end, day("2024-03-31"));
        assert_eq!(dashboard.status(), LoadStatus::Idle);
        assert!(dashboard.incidents().is_empty());
        assert_eq!(dashboard.view().totals.matched, 0);
    }

    #[test]
    fn successful_load_replaces_dataset() {
        let dashboard = ready_dashboard();
        assert_eq!(dashboard.status(), LoadStatus::Ready);
        assert_eq!(dashboard.incidents().len(), 4);

        let (dashboard, ticket) = dashboard.begin_load();
        let dashboard =
            dashboard.finish_load(ticket, Ok(loaded(vec![incident("2024-03-10", "North", "FRAUD")])));
        assert_eq!(dashboard.incidents().len(), 1);
    }

    #[test]
    fn stale_load_is_discarded() {
        let dashboard = Dashboard::new(DashboardLimits::default(), day("2024-03-31"));
        let (dashboard, first) = dashboard.begin_load();
        let (dashboard, second) = dashboard.begin_load();

        let dashboard = dashboard.finish_load(second, Ok(loaded(fixture())));
        let dashboard =
            dashboard.finish_load(first, Ok(loaded(vec![incident("2024-03-10", "North", "FRAUD")])));

        assert_eq!(dashboard.incidents().len(), 4);
        assert_eq!(dashboard.status(), LoadStatus::Ready);
    }

    #[test]
    fn stale_failure_does_not_clobber_newer_load() {
        let dashboard = Dashboard::new(DashboardLimits::default(), day("2024-03-31"));
        let (dashboard, first) = dashboard.begin_load();
        let (dashboard, second) = dashboard.begin_load();

        let dashboard = dashboard.finish_load(first, Err(provider_error()));
        assert_eq!(dashboard.status(), LoadStatus::Loading);
        assert!(dashboard.last_error().is_none());

        let dashboard = dashboard.finish_load(second, Ok(loaded(fixture())));
        assert_eq!(dashboard.status(), LoadStatus::Ready);
    }

    #[test]
    fn begin_load_with_moves_range_and_tickets_it() {
        let (dashboard, ticket) = ready_dashboard()
            .begin_load_with(FilterUpdate {
                start: Some(day("2024-02-01")),
                end: Some(day("2024-02-29")),
                ..FilterUpdate::default()
            })
            .unwrap();
        assert_eq!(ticket.start, day("2024-02-01"));
        assert_eq!(ticket.end, day("2024-02-29"));
        assert_eq!(dashboard.filters().start, day("2024-02-01"));
        assert_eq!(dashboard.status(), LoadStatus::Loading);
        assert!(dashboard.is_current(&ticket));
    }

    #[test]
    fn begin_load_with_inverted_range_starts_nothing() {
        let err = ready_dashboard()
            .begin_load_with(FilterUpdate {
                start: Some(day("2024-03-20")),
                end: Some(day("2024-03-10")),
                ..FilterUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidDateRange { .. }));
    }

    #[test]
    fn only_latest_ticket_is_current() {
        let (dashboard, first) = ready_dashboard().begin_load();
        let (dashboard, second) = dashboard.begin_load();
        assert!(!dashboard.is_current(&first));
        assert!(dashboard.is_current(&second));
    }

    #[test]
    fn failed_load_keeps_previous_data() {
        let (dashboard, ticket) = ready_dashboard().begin_load();
        let dashboard = dashboard.finish_load(ticket, Err(provider_error()));

        assert_eq!(dashboard.status(), LoadStatus::Failed);
        assert_eq!(dashboard.incidents().len(), 4);
        let failure = dashboard.last_error().unwrap();
        assert!(failure.message.contains("HTTP 500"));
        assert_eq!(failure.hint, LOAD_FAILURE_HINT);
    }

    #[test]
    fn schema_failure_message_names_candidates() {
        let (dashboard, ticket) =
            Dashboard::new(DashboardLimits::default(), day("2024-03-31")).begin_load();
        let dashboard = dashboard.finish_load(
            ticket,
            Err(SourceError::MissingDateColumn {
                candidates: vec!["report_date_time".to_string(), "offense_date".to_string()],
            }),
        );
        let failure = dashboard.last_error().unwrap();
        assert!(failure.message.contains("report_date_time, offense_date"));
        assert!(dashboard.incidents().is_empty());
    }

    #[test]
    fn select_then_clear_restores_view() {
        let dashboard = ready_dashboard();
        let before = dashboard.view();

        let dashboard = dashboard.select("ASSAULT");
        assert_eq!(dashboard.selection(), Some("ASSAULT"));
        let selected = dashboard.view();
        assert_eq!(selected.totals.matched, 2);
        assert_eq!(selected.ranking.labels, vec!["ASSAULT"]);

        let dashboard = dashboard.clear();
        assert_eq!(dashboard.selection(), None);
        assert_eq!(dashboard.view(), before);
    }

    #[test]
    fn reload_keeps_selection() {
        let dashboard = ready_dashboard().select("ASSAULT");
        let (dashboard, ticket) = dashboard.begin_load();
        let dashboard = dashboard.finish_load(ticket, Ok(loaded(fixture())));
        assert_eq!(dashboard.selection(), Some("ASSAULT"));
    }

    #[test]
    fn set_filter_applies_partial_update() {
        let dashboard = ready_dashboard()
            .set_filter(FilterUpdate {
                precinct: Some(FieldFilter::from("West")),
                ..FilterUpdate::default()
            })
            .unwrap();
        assert_eq!(dashboard.filters().precinct, FieldFilter::from("West"));
        assert_eq!(dashboard.filters().start, day("2024-03-01"));
        assert_eq!(dashboard.view().totals.matched, 2);
    }

    #[test]
    fn set_filter_rejects_inverted_range() {
        let dashboard = ready_dashboard();
        let err = dashboard
            .clone()
            .set_filter(FilterUpdate {
                start: Some(day("2024-04-01")),
                ..FilterUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, StateError::InvalidDateRange { .. }));
        assert_eq!(dashboard.filters().start, day("2024-03-01"));
    }

    #[test]
    fn narrowing_dates_filters_locally() {
        let dashboard = ready_dashboard()
            .set_filter(FilterUpdate {
                start: Some(day("2024-03-05")),
                end: Some(day("2024-03-05")),
                ..FilterUpdate::default()
            })
            .unwrap();
        assert_eq!(dashboard.incidents().len(), 4);
        assert_eq!(dashboard.view().time_series.labels, vec!["2024-03-05"]);
    }

    #[test]
    fn reset_all_restores_defaults() {
        let dashboard = ready_dashboard()
            .select("THEFT")
            .set_filter(FilterUpdate {
                start: Some(day("2024-03-05")),
                precinct: Some(FieldFilter::from("West")),
                crime_against: Some(FieldFilter::from("PROPERTY")),
                ..FilterUpdate::default()
            })
            .unwrap()
            .reset_all(day("2024-03-31"));

        assert_eq!(
            dashboard.filters(),
            &FilterState::defaults_for(day("2024-03-31"), 30)
        );
        assert_eq!(dashboard.incidents().len(), 4);
    }

    #[test]
    fn options_come_from_loaded_set() {
        let options = ready_dashboard().options();
        assert_eq!(options.precincts, vec!["East", "North", "West"]);
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime dashboard server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the dashboard state so the API contract can evolve independently.

use chrono::NaiveDate;
use crime_dash_incident_models::{DerivedView, FilterOptions, FilterState, LoadSummary};
use crime_dash_state::{Dashboard, LoadFailure, LoadStatus, StateError};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Everything the frontend needs to draw the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDashboard {
    /// Where the most recent load stands.
    pub status: LoadStatus,
    /// Active filters, including the offense group selection.
    pub filters: FilterState,
    /// Charts and map points for the active filters.
    pub view: DerivedView,
    /// Dropdown values for the loaded incidents.
    pub options: FilterOptions,
    /// Summary of the dataset currently displayed.
    pub load_summary: Option<LoadSummary>,
    /// Error from the most recent load, if it failed.
    pub error: Option<LoadFailure>,
}

impl From<&Dashboard> for ApiDashboard {
    fn from(dashboard: &Dashboard) -> Self {
        Self {
            status: dashboard.status(),
            filters: dashboard.filters().clone(),
            view: dashboard.view(),
            options: dashboard.options(),
            load_summary: dashboard.load_summary().cloned(),
            error: dashboard.last_error().cloned(),
        }
    }
}

/// Body of `POST /api/load`. Omitted dates keep the current range.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    /// First day to load.
    pub start: Option<NaiveDate>,
    /// Last day to load.
    pub end: Option<NaiveDate>,
}

/// Body of `POST /api/selection`.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectRequest {
    /// Offense group label that was clicked.
    pub group: String,
}

/// Error body returned for failed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// What went wrong.
    pub error: String,
    /// What the user can do about it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&LoadFailure> for ApiError {
    fn from(failure: &LoadFailure) -> Self {
        Self {
            error: failure.message.clone(),
            hint: Some(failure.hint.clone()),
        }
    }
}

impl From<&StateError> for ApiError {
    fn from(e: &StateError) -> Self {
        Self {
            error: e.to_string(),
            hint: None,
        }
    }
}

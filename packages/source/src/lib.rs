#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Loading crime incidents from a Socrata dataset.
//!
//! A load probes one row to resolve the dataset's field names
//! ([`schema`]), pages through the requested date window ([`socrata`]),
//! and normalizes the rows into [`NormalizedIncident`]s ([`normalize`]).
//! [`load_incidents`] runs the whole sequence.

pub mod config;
pub mod normalize;
pub mod parsing;
pub mod progress;
pub mod schema;
pub mod socrata;

use std::sync::Arc;

use chrono::NaiveDate;
use crime_dash_incident_models::{LoadSummary, NormalizedIncident};

use crate::config::DashboardConfig;
use crate::normalize::normalize_records;
use crate::progress::ProgressCallback;
use crate::schema::resolve_schema;
use crate::socrata::{FetchWindow, RecordProvider, SocrataQuery, fetch_window};

/// A provider row: field names chosen by the provider, scalar values.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur while loading incidents.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// None of the date column candidates exists in the dataset.
    #[error("No date column found (tried {})", candidates.join(", "))]
    MissingDateColumn {
        /// The candidate names that were tried.
        candidates: Vec<String>,
    },

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error (config file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Incidents produced by one load.
#[derive(Debug, Clone)]
pub struct LoadedIncidents {
    /// Normalized incidents, ordered by the date column.
    pub incidents: Vec<NormalizedIncident>,
    /// What the load retrieved and resolved.
    pub summary: LoadSummary,
}

/// Probes the dataset schema, fetches the `[start, end]` window, and
/// normalizes the result.
///
/// # Errors
///
/// Returns [`SourceError::MissingDateColumn`] if the probe row has no
/// recognizable date field, or any transport error raised while probing or
/// paging. Nothing is returned from a failed load.
pub async fn load_incidents(
    provider: &dyn RecordProvider,
    config: &DashboardConfig,
    start: NaiveDate,
    end: NaiveDate,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadedIncidents, SourceError> {
    let label = &config.provider.label;

    progress.set_message(format!("Probing {label} schema..."));
    let probe = provider.fetch_page(&SocrataQuery::probe()).await?;
    let sample = probe.into_iter().next().unwrap_or_else(|| {
        log::warn!("{label} probe returned no rows");
        RawRecord::new()
    });
    let keys = resolve_schema(&sample, &config.schema)?;

    progress.set_message(format!("Fetching {label} incidents {start} to {end}"));
    let fetched = fetch_window(
        provider,
        &FetchWindow {
            start,
            end,
            keys: &keys,
            page_size: config.limits.page_size,
            max_total_rows: config.limits.max_total_rows,
            label,
        },
        progress,
    )
    .await?;

    let normalized = normalize_records(&fetched.records, &keys, &config.bounding_box);
    let summary = LoadSummary {
        start,
        end,
        rows_fetched: fetched.records.len() as u64,
        incidents: normalized.incidents.len() as u64,
        dropped: normalized.dropped,
        capped: fetched.capped,
        schema: keys,
    };

    progress.finish(format!(
        "Loaded {} {label} incidents",
        normalized.incidents.len()
    ));

    Ok(LoadedIncidents {
        incidents: normalized.incidents,
        summary,
    })
}

//! One-shot loads rendered to the terminal.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::NaiveDate;
use crime_dash_cli_utils::{IndicatifProgress, MultiProgress};
use crime_dash_incident_models::{FieldFilter, SchemaKeys, SemanticColumn};
use crime_dash_server_models::ApiDashboard;
use crime_dash_source::config::DashboardConfig;
use crime_dash_source::load_incidents;
use crime_dash_source::schema::resolve_schema;
use crime_dash_source::socrata::{RecordProvider, SocrataProvider, SocrataQuery};
use crime_dash_state::{Dashboard, FilterUpdate};

/// What to load and how to filter it.
#[derive(Debug, Clone, Default)]
pub struct SummaryRequest {
    /// First day; defaults to the lookback window start.
    pub start: Option<NaiveDate>,
    /// Last day; defaults to today.
    pub end: Option<NaiveDate>,
    /// Only this precinct.
    pub precinct: Option<String>,
    /// Only this crime-against category.
    pub crime_against: Option<String>,
    /// Cross-filter to one offense group.
    pub offense_group: Option<String>,
}

fn provider(config: &DashboardConfig) -> Result<SocrataProvider, Box<dyn std::error::Error>> {
    Ok(SocrataProvider::new(
        config.provider.api_url.clone(),
        Duration::from_secs(config.provider.timeout_secs),
    )?)
}

/// Loads the requested window and applies the requested filters.
///
/// # Errors
///
/// Returns an error if the date range is inverted or the load fails.
pub async fn load_dashboard(
    multi: &MultiProgress,
    config: &DashboardConfig,
    request: SummaryRequest,
) -> Result<Dashboard, Box<dyn std::error::Error>> {
    let today = chrono::Local::now().date_naive();
    let dashboard = Dashboard::new(config.limits, today).set_filter(FilterUpdate {
        start: request.start,
        end: request.end,
        precinct: request.precinct.map(FieldFilter::from),
        crime_against: request.crime_against.map(FieldFilter::from),
    })?;

    let (dashboard, ticket) = dashboard.begin_load();
    let provider = provider(config)?;
    let progress = IndicatifProgress::rows_bar(
        multi,
        &format!("Loading {} incidents...", config.provider.label),
    );
    let result = load_incidents(&provider, config, ticket.start, ticket.end, &progress).await;
    let dashboard = dashboard.finish_load(ticket, result);

    if let Some(failure) = dashboard.last_error() {
        return Err(format!("{} {}", failure.message, failure.hint).into());
    }

    Ok(match request.offense_group {
        Some(group) => dashboard.select(group),
        None => dashboard,
    })
}

/// Probes the provider and resolves its column names.
///
/// # Errors
///
/// Returns an error if the probe fails or no date column is found.
pub async fn probe_schema(
    config: &DashboardConfig,
) -> Result<SchemaKeys, Box<dyn std::error::Error>> {
    let provider = provider(config)?;
    let sample = provider
        .fetch_page(&SocrataQuery::probe())
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();
    Ok(resolve_schema(&sample, &config.schema)?)
}

/// Snapshot as pretty-printed JSON, in the same shape the server returns.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(dashboard: &Dashboard) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ApiDashboard::from(dashboard))
}

/// Snapshot as plain-text tables.
#[must_use]
pub fn render_text(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    let filters = dashboard.filters();
    let view = dashboard.view();

    let _ = writeln!(out, "Incidents {} to {}", filters.start, filters.end);
    if let Some(summary) = dashboard.load_summary() {
        let _ = writeln!(
            out,
            "Fetched {} rows, kept {} ({} dropped){}",
            summary.rows_fetched,
            summary.incidents,
            summary.dropped,
            if summary.capped { ", row cap reached" } else { "" }
        );
    }
    let _ = writeln!(
        out,
        "Precinct: {}  Crime against: {}  Selection: {}",
        filters.precinct,
        filters.crime_against,
        filters.offense_group.as_deref().unwrap_or("none")
    );
    let _ = writeln!(
        out,
        "Matched {} incidents, {} mappable, {} plotted (stride {})",
        view.totals.matched, view.totals.mappable, view.totals.plotted, view.totals.stride
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "{:<12} {:>8}", "DATE", "COUNT");
    let _ = writeln!(out, "{}", "-".repeat(21));
    for (label, count) in view.time_series.labels.iter().zip(&view.time_series.counts) {
        let _ = writeln!(out, "{label:<12} {count:>8}");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{:<40} {:>8}", "OFFENSE GROUP", "COUNT");
    let _ = writeln!(out, "{}", "-".repeat(49));
    for (label, count) in view.ranking.labels.iter().zip(&view.ranking.counts) {
        let _ = writeln!(out, "{label:<40} {count:>8}");
    }

    out
}

/// Resolved columns as a two-column table.
#[must_use]
pub fn render_schema(keys: &SchemaKeys) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} FIELD", "COLUMN");
    let _ = writeln!(out, "{}", "-".repeat(50));
    for column in SemanticColumn::ALL {
        let _ = writeln!(
            out,
            "{:<16} {}",
            column.as_ref(),
            keys.key(column).unwrap_or("(not found)")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use crime_dash_incident_models::{DashboardLimits, LoadSummary, NormalizedIncident, UNKNOWN};
    use crime_dash_source::LoadedIncidents;

    use super::*;

    fn keys() -> SchemaKeys {
        SchemaKeys {
            date_key: "report_date_time".to_string(),
            precinct_key: Some("precinct".to_string()),
            offense_group_key: Some("offense_sub_category".to_string()),
            crime_against_key: None,
            lat_key: Some("latitude".to_string()),
            lon_key: Some("longitude".to_string()),
            neighborhood_key: None,
        }
    }

    fn incident(date: &str, group: &str) -> NormalizedIncident {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        NormalizedIncident {
            timestamp: day.and_hms_opt(8, 0, 0).unwrap().and_utc(),
            date: date.to_string(),
            precinct: "North".to_string(),
            offense_group: group.to_string(),
            crime_against: UNKNOWN.to_string(),
            neighborhood: UNKNOWN.to_string(),
            latitude: None,
            longitude: None,
            has_valid_coordinate: false,
        }
    }

    fn loaded_dashboard() -> Dashboard {
        let today = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let (dashboard, ticket) = Dashboard::new(DashboardLimits::default(), today).begin_load();
        let incidents = vec![
            incident("2024-01-02", "THEFT"),
            incident("2024-01-02", "THEFT"),
            incident("2024-01-05", "ASSAULT"),
        ];
        let summary = LoadSummary {
            start: ticket.start,
            end: ticket.end,
            rows_fetched: 4,
            incidents: 3,
            dropped: 1,
            capped: false,
            schema: keys(),
        };
        dashboard.finish_load(ticket, Ok(LoadedIncidents { incidents, summary }))
    }

    #[test]
    fn text_report_lists_days_and_groups() {
        let text = render_text(&loaded_dashboard());
        assert!(text.contains("Fetched 4 rows, kept 3 (1 dropped)"));
        assert!(text.contains("Selection: none"));
        assert!(text.contains("2024-01-02"));
        let theft = text.find("THEFT").unwrap();
        let assault = text.find("ASSAULT").unwrap();
        assert!(theft < assault);
    }

    #[test]
    fn text_report_shows_selection() {
        let text = render_text(&loaded_dashboard().select("ASSAULT"));
        assert!(text.contains("Selection: ASSAULT"));
        assert!(text.contains("Matched 1 incidents"));
    }

    #[test]
    fn json_report_matches_api_shape() {
        let json = render_json(&loaded_dashboard()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "ready");
        assert_eq!(value["loadSummary"]["dropped"], 1);
    }

    #[test]
    fn schema_report_marks_missing_columns() {
        let text = render_schema(&keys());
        assert!(text.contains("date             report_date_time"));
        assert!(text.contains("neighborhood     (not found)"));
    }
}

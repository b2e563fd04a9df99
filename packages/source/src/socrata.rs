//! Socrata SODA API access.
//!
//! Pages through a dataset using the `$select`, `$where`, `$order`,
//! `$limit`, and `$offset` query parameters. Requests are issued strictly
//! one after another since each offset depends on the rows already
//! received, and ordering on the date column keeps offset paging stable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use crime_dash_incident_models::SchemaKeys;

use crate::progress::ProgressCallback;
use crate::{RawRecord, SourceError};

/// Maximum number of response body characters kept in a status error.
const BODY_PREVIEW_LEN: usize = 500;

/// One SODA request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SocrataQuery {
    /// Columns to return (`$select`). Empty selects every column.
    pub select: Vec<String>,
    /// Row predicate (`$where`).
    pub where_clause: Option<String>,
    /// Sort expression (`$order`).
    pub order: Option<String>,
    /// Page size (`$limit`).
    pub limit: u64,
    /// Rows to skip (`$offset`).
    pub offset: u64,
}

impl SocrataQuery {
    /// A single unfiltered row, used to discover the dataset's field names.
    #[must_use]
    pub fn probe() -> Self {
        Self {
            limit: 1,
            ..Self::default()
        }
    }

    /// Renders the query as URL parameters.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(5);
        if !self.select.is_empty() {
            params.push(("$select", self.select.join(",")));
        }
        if let Some(where_clause) = &self.where_clause {
            params.push(("$where", where_clause.clone()));
        }
        if let Some(order) = &self.order {
            params.push(("$order", order.clone()));
        }
        params.push(("$limit", self.limit.to_string()));
        params.push(("$offset", self.offset.to_string()));
        params
    }
}

/// A source of raw record pages.
#[async_trait]
pub trait RecordProvider: Send + Sync {
    /// Executes one query and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failure, a non-success status,
    /// or a body that is not a JSON array of objects.
    async fn fetch_page(&self, query: &SocrataQuery) -> Result<Vec<RawRecord>, SourceError>;
}

/// [`RecordProvider`] backed by a live Socrata resource URL.
pub struct SocrataProvider {
    client: reqwest::Client,
    api_url: String,
}

impl SocrataProvider {
    /// Creates a provider for `api_url` (e.g.,
    /// `"https://data.seattle.gov/resource/tazs-3rd5.json"`).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl RecordProvider for SocrataProvider {
    async fn fetch_page(&self, query: &SocrataQuery) -> Result<Vec<RawRecord>, SourceError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Socrata request failed: HTTP {status}");
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Truncates a response body for inclusion in an error message.
fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_LEN {
        let head: String = body.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}

/// The date window and bounds of one paginated fetch.
pub struct FetchWindow<'a> {
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
    /// Resolved field names; the date key drives filtering and ordering.
    pub keys: &'a SchemaKeys,
    /// Rows per request.
    pub page_size: u64,
    /// Stop once this many rows have been retrieved.
    pub max_total_rows: u64,
    /// Label for log messages (e.g., `"Seattle"`).
    pub label: &'a str,
}

impl FetchWindow<'_> {
    /// `$where` predicate covering the whole of `start` through the whole
    /// of `end`.
    #[must_use]
    pub fn where_clause(&self) -> String {
        format!(
            "{} between '{}T00:00:00' and '{}T23:59:59'",
            self.keys.date_key,
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d"),
        )
    }

    /// Query for the page starting at `offset`.
    fn page_query(&self, offset: u64, limit: u64) -> SocrataQuery {
        SocrataQuery {
            select: self.keys.columns().into_iter().map(String::from).collect(),
            where_clause: Some(self.where_clause()),
            order: Some(format!("{} ASC", self.keys.date_key)),
            limit,
            offset,
        }
    }
}

/// Rows retrieved by [`fetch_window`].
#[derive(Debug, Clone, Default)]
pub struct FetchedRows {
    /// All rows, in provider order.
    pub records: Vec<RawRecord>,
    /// `true` if pagination stopped at the row cap rather than at the end
    /// of the data.
    pub capped: bool,
}

/// Fetches every row in the window, one page at a time.
///
/// Stops when a page comes back shorter than requested or when
/// `max_total_rows` rows have been retrieved. Any failed page aborts the
/// whole fetch and the rows gathered so far are discarded.
///
/// # Errors
///
/// Returns the first [`SourceError`] raised by the provider.
pub async fn fetch_window(
    provider: &dyn RecordProvider,
    window: &FetchWindow<'_>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<FetchedRows, SourceError> {
    let page_size = window.page_size.max(1);
    let mut records: Vec<RawRecord> = Vec::new();
    let mut capped = false;

    progress.set_total(window.max_total_rows);

    loop {
        let offset = records.len() as u64;
        let remaining = window.max_total_rows.saturating_sub(offset);
        if remaining == 0 {
            capped = true;
            break;
        }
        let page_limit = remaining.min(page_size);

        log::info!(
            "Fetching {} data: offset={offset}, limit={page_limit}",
            window.label
        );
        let page = provider
            .fetch_page(&window.page_query(offset, page_limit))
            .await?;

        let count = page.len() as u64;
        records.extend(page);
        progress.inc(count);

        if count < page_limit {
            break;
        }
    }

    log::info!(
        "Downloaded {} {} records total{}",
        records.len(),
        window.label,
        if capped { " (row cap reached)" } else { "" }
    );

    Ok(FetchedRows { records, capped })
}

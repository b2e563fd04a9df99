#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the crime dashboard.
//!
//! Holds a single [`Dashboard`] behind a mutex and exposes its transitions
//! as JSON endpoints. Every response that changes the dashboard returns
//! the full [`ApiDashboard`] snapshot so the frontend can redraw all
//! three charts from one payload.

mod handlers;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use chrono::NaiveDate;
use crime_dash_server_models::ApiDashboard;
use crime_dash_source::config::DashboardConfig;
use crime_dash_source::progress::ProgressCallback;
use crime_dash_source::socrata::{RecordProvider, SocrataProvider};
use crime_dash_source::{LoadedIncidents, SourceError, load_incidents};
use crime_dash_state::{Dashboard, FilterUpdate, LoadFailure, LoadTicket, StateError};

/// Shared application state.
pub struct AppState {
    /// The dashboard. Never held across an `.await`.
    dashboard: Mutex<Dashboard>,
    /// Where incident pages come from.
    provider: Arc<dyn RecordProvider>,
    /// Provider, limits, and schema settings.
    config: DashboardConfig,
}

impl AppState {
    /// Creates state with an empty dashboard whose default range ends on
    /// `today`.
    #[must_use]
    pub fn new(
        config: DashboardConfig,
        provider: Arc<dyn RecordProvider>,
        today: NaiveDate,
    ) -> Self {
        Self {
            dashboard: Mutex::new(Dashboard::new(config.limits, today)),
            provider,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Dashboard> {
        self.dashboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ApiDashboard {
        ApiDashboard::from(&*self.lock())
    }

    /// Runs an infallible transition and returns the new snapshot.
    pub fn apply(&self, transition: impl FnOnce(Dashboard) -> Dashboard) -> ApiDashboard {
        let mut dashboard = self.lock();
        *dashboard = transition(dashboard.clone());
        ApiDashboard::from(&*dashboard)
    }

    /// Runs a fallible transition. On error the dashboard is unchanged.
    ///
    /// # Errors
    ///
    /// Returns whatever [`StateError`] the transition produced.
    pub fn try_apply(
        &self,
        transition: impl FnOnce(Dashboard) -> Result<Dashboard, StateError>,
    ) -> Result<ApiDashboard, StateError> {
        let mut dashboard = self.lock();
        *dashboard = transition(dashboard.clone())?;
        Ok(ApiDashboard::from(&*dashboard))
    }

    /// Applies `update` and starts a load of the resulting date range
    /// under one lock.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidDateRange`] if the update inverts the
    /// range. The dashboard is unchanged and nothing is fetched.
    pub fn begin_load(&self, update: FilterUpdate) -> Result<LoadTicket, StateError> {
        let mut dashboard = self.lock();
        let (next, ticket) = dashboard.clone().begin_load_with(update)?;
        *dashboard = next;
        Ok(ticket)
    }

    /// Applies the outcome of the load identified by `ticket`.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadFailure`] recorded on the dashboard if this load
    /// failed. A failure from a superseded load is not recorded and not
    /// reported; the current snapshot is returned instead.
    pub fn finish_load(
        &self,
        ticket: LoadTicket,
        result: Result<LoadedIncidents, SourceError>,
    ) -> Result<ApiDashboard, LoadFailure> {
        let mut dashboard = self.lock();
        let current = dashboard.is_current(&ticket);
        *dashboard = dashboard.clone().finish_load(ticket, result);

        match dashboard.last_error() {
            Some(failure) if current => Err(failure.clone()),
            _ => Ok(ApiDashboard::from(&*dashboard)),
        }
    }

    /// Moves the date range per `update` and loads it from the provider.
    ///
    /// The lock is released while the provider is paged, so the dashboard
    /// stays readable during a load. If another load starts in the
    /// meantime, this one's result is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::InvalidRange`] if the update inverts the range
    /// and [`LoadError::Failed`] if the load failed. The previously loaded
    /// incidents are kept either way.
    pub async fn load(&self, update: FilterUpdate) -> Result<ApiDashboard, LoadError> {
        let ticket = self.begin_load(update)?;

        let progress: Arc<dyn ProgressCallback> = Arc::new(LogProgress);
        let result = load_incidents(
            self.provider.as_ref(),
            &self.config,
            ticket.start,
            ticket.end,
            &progress,
        )
        .await;

        Ok(self.finish_load(ticket, result)?)
    }
}

/// Why `POST /api/load` did not produce a snapshot.
#[derive(Debug)]
pub enum LoadError {
    /// The requested range was rejected before fetching.
    InvalidRange(StateError),
    /// The provider load failed.
    Failed(LoadFailure),
}

impl From<StateError> for LoadError {
    fn from(e: StateError) -> Self {
        Self::InvalidRange(e)
    }
}

impl From<LoadFailure> for LoadError {
    fn from(failure: LoadFailure) -> Self {
        Self::Failed(failure)
    }
}

/// Reports load progress as log lines.
struct LogProgress;

impl ProgressCallback for LogProgress {
    fn set_total(&self, total: u64) {
        log::debug!("Fetching at most {total} rows");
    }

    fn inc(&self, delta: u64) {
        log::debug!("Fetched {delta} more rows");
    }

    fn set_message(&self, msg: String) {
        log::info!("{msg}");
    }

    fn finish(&self, msg: String) {
        log::info!("{msg}");
    }
}

/// Today's date in the server's local time zone.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/dashboard", web::get().to(handlers::dashboard))
            .route("/load", web::post().to(handlers::load))
            .route("/filters", web::put().to(handlers::filters))
            .route("/selection", web::post().to(handlers::select))
            .route("/selection", web::delete().to(handlers::clear))
            .route("/reset", web::post().to(handlers::reset)),
    );
}

/// Where the server listens and whether it loads data on startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Load the default date range before the first request.
    pub initial_load: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            initial_load: true,
        }
    }
}

impl ServerOptions {
    /// Reads `BIND_ADDR` and `PORT`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            initial_load: defaults.initial_load,
        }
    }
}

/// Starts the crime dashboard API server.
///
/// Reads the dashboard configuration (see
/// [`DashboardConfig::from_env`]), optionally kicks off a load of the
/// default date range in the background, and starts the Actix-Web HTTP
/// server. This is a regular async function; the caller provides the async
/// runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration cannot be read,
/// the HTTP client cannot be built, or the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(options: ServerOptions) -> std::io::Result<()> {
    // The CLI installs its own logger first.
    pretty_env_logger::try_init_custom_env("RUST_LOG").ok();

    log::info!("Loading dashboard configuration...");
    let config = DashboardConfig::from_env().map_err(std::io::Error::other)?;
    let provider = SocrataProvider::new(
        config.provider.api_url.clone(),
        Duration::from_secs(config.provider.timeout_secs),
    )
    .map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState::new(config, Arc::new(provider), today()));

    if options.initial_load {
        let initial = state.clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = initial.load(FilterUpdate::default()).await {
                log::warn!("Initial load failed: {e:?}");
            }
        });
    }

    let ServerOptions {
        bind_addr, port, ..
    } = options;
    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_listen_locally_and_load() {
        let options = ServerOptions::default();
        assert_eq!(options.bind_addr, "127.0.0.1");
        assert_eq!(options.port, 8080);
        assert!(options.initial_load);
    }
}

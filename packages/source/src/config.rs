//! Dashboard configuration.
//!
//! The Seattle configuration is embedded at compile time. Setting
//! `CRIME_DASH_CONFIG` to a TOML file path replaces it at startup, which
//! is how the provider URL, limits, or schema candidates are overridden
//! without a rebuild.

use std::path::Path;

use crime_dash_incident_models::{BoundingBox, DashboardLimits};
use serde::Deserialize;

use crate::SourceError;

/// Environment variable naming an alternative configuration file.
pub const CONFIG_ENV_VAR: &str = "CRIME_DASH_CONFIG";

const EMBEDDED_CONFIG: &str = include_str!("../config/seattle.toml");

/// Complete dashboard configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Where records come from.
    pub provider: ProviderConfig,
    /// Paging and view limits.
    #[serde(default)]
    pub limits: DashboardLimits,
    /// Bounds a coordinate must fall in to be mapped.
    #[serde(default)]
    pub bounding_box: BoundingBox,
    /// Candidate field names for each semantic column.
    pub schema: SchemaCandidates,
}

/// The remote Socrata dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Label for log messages (e.g., `"Seattle"`).
    pub label: String,
    /// Socrata resource URL (e.g.,
    /// `"https://data.seattle.gov/resource/tazs-3rd5.json"`).
    pub api_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    120
}

/// Candidate provider field names per semantic column, highest priority
/// first.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaCandidates {
    /// Timestamp candidates. At least one must resolve.
    pub date: Vec<String>,
    /// Precinct candidates.
    #[serde(default)]
    pub precinct: Vec<String>,
    /// Offense group candidates.
    #[serde(default)]
    pub offense_group: Vec<String>,
    /// Crime-against category candidates.
    #[serde(default)]
    pub crime_against: Vec<String>,
    /// Latitude candidates.
    #[serde(default)]
    pub latitude: Vec<String>,
    /// Longitude candidates.
    #[serde(default)]
    pub longitude: Vec<String>,
    /// Neighborhood candidates.
    #[serde(default)]
    pub neighborhood: Vec<String>,
}

impl DashboardConfig {
    /// The configuration compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the embedded TOML is malformed.
    pub fn embedded() -> Result<Self, SourceError> {
        Self::parse(EMBEDDED_CONFIG)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the TOML is malformed or missing
    /// required tables.
    pub fn parse(toml_str: &str) -> Result<Self, SourceError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Loads the file named by [`CONFIG_ENV_VAR`], falling back to the
    /// embedded configuration when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the chosen configuration cannot be read
    /// or parsed.
    pub fn from_env() -> Result<Self, SourceError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => {
                log::info!("Loading dashboard config from {path}");
                Self::from_file(Path::new(&path))
            }
            _ => Self::embedded(),
        }
    }
}

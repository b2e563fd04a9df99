//! Interactive menu for the dashboard tools.
//!
//! Provides a menu-driven interface using `dialoguer` for running the CLI
//! commands without memorizing flags.

use chrono::NaiveDate;
use crime_dash_cli_utils::MultiProgress;
use crime_dash_server::ServerOptions;
use crime_dash_source::config::DashboardConfig;
use dialoguer::{Confirm, Input, Select};

use crate::report::{self, SummaryRequest};

/// Top-level actions available in the interactive menu.
enum Action {
    Summary,
    Schema,
    Server,
}

impl Action {
    const ALL: &[Self] = &[Self::Summary, Self::Schema, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Summary => "Summarize a date range",
            Self::Schema => "Inspect provider schema",
            Self::Server => "Start server",
        }
    }
}

/// Prompts for a date; an empty answer keeps the default.
fn prompt_date(prompt: &str) -> Result<Option<NaiveDate>, Box<dyn std::error::Error>> {
    let text: String = Input::new()
        .with_prompt(format!("{prompt} (YYYY-MM-DD, blank for default)"))
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            if input.trim().is_empty() || input.trim().parse::<NaiveDate>().is_ok() {
                Ok(())
            } else {
                Err("Expected a date like 2024-01-31".to_string())
            }
        })
        .interact_text()?;

    let text = text.trim();
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text.parse()?))
    }
}

/// Prompts for an optional text filter.
fn prompt_filter(prompt: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let text: String = Input::new()
        .with_prompt(format!("{prompt} (blank for all)"))
        .allow_empty(true)
        .interact_text()?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// Prompts for where the server listens, defaulting to `BIND_ADDR` and
/// `PORT`.
fn prompt_server_options() -> Result<ServerOptions, Box<dyn std::error::Error>> {
    let defaults = ServerOptions::from_env();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr)
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()?;

    let initial_load = Confirm::new()
        .with_prompt("Load the default date range on startup?")
        .default(defaults.initial_load)
        .interact()?;

    Ok(ServerOptions {
        bind_addr,
        port,
        initial_load,
    })
}

/// Runs the interactive menu, prompting the user to select and configure
/// an action.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Crime Dashboard");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Summary => {
            let config = DashboardConfig::from_env()?;
            let request = SummaryRequest {
                start: prompt_date("Start date")?,
                end: prompt_date("End date")?,
                precinct: prompt_filter("Precinct")?,
                crime_against: prompt_filter("Crime against")?,
                offense_group: None,
            };
            let mut dashboard = report::load_dashboard(multi, &config, request).await?;
            print!("{}", report::render_text(&dashboard));

            let ranking = dashboard.view().ranking.labels;
            while !ranking.is_empty()
                && Confirm::new()
                    .with_prompt("Drill into an offense group?")
                    .default(false)
                    .interact()?
            {
                let pick = Select::new()
                    .with_prompt("Offense group")
                    .items(&ranking)
                    .default(0)
                    .interact()?;
                dashboard = dashboard.select(ranking[pick].clone());
                print!("{}", report::render_text(&dashboard));
                dashboard = dashboard.clear();
            }
        }
        Action::Schema => {
            let config = DashboardConfig::from_env()?;
            let keys = report::probe_schema(&config).await?;
            print!("{}", report::render_schema(&keys));
        }
        Action::Server => crate::serve(prompt_server_options()?).await?,
    }

    Ok(())
}

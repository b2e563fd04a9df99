#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the crime dashboard.
//!
//! `summary` loads a date window and prints the same charts the dashboard
//! draws, `schema` shows which provider fields were recognized, and `serve`
//! starts the API server. Without a subcommand an interactive menu is
//! shown.
//!
//! Uses `indicatif-log-bridge` (via [`crime_dash_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;
mod report;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use crime_dash_server::ServerOptions;
use crime_dash_source::config::DashboardConfig;

use crate::report::SummaryRequest;

#[derive(Parser)]
#[command(name = "crime_dash_cli", about = "Seattle crime dashboard tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a date window and print the daily series and offense ranking
    Summary {
        /// First day (YYYY-MM-DD); defaults to the start of the lookback window
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD); defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Only incidents from this precinct
        #[arg(long)]
        precinct: Option<String>,
        /// Only incidents in this crime-against category (e.g., "PROPERTY")
        #[arg(long)]
        crime_against: Option<String>,
        /// Cross-filter every chart to one offense group
        #[arg(long)]
        offense_group: Option<String>,
        /// Print the full snapshot as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Probe the provider and print the resolved column names
    Schema,
    /// Start the API server
    Serve {
        /// Address to bind; defaults to `BIND_ADDR` or 127.0.0.1
        #[arg(long)]
        bind: Option<String>,
        /// Port to bind; defaults to `PORT` or 8080
        #[arg(long)]
        port: Option<u16>,
        /// Wait for the first `POST /api/load` instead of loading on startup
        #[arg(long)]
        no_initial_load: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_dash_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Summary {
            start,
            end,
            precinct,
            crime_against,
            offense_group,
            json,
        } => {
            let config = DashboardConfig::from_env()?;
            let request = SummaryRequest {
                start,
                end,
                precinct,
                crime_against,
                offense_group,
            };
            let dashboard = report::load_dashboard(&multi, &config, request).await?;
            if json {
                println!("{}", report::render_json(&dashboard)?);
            } else {
                print!("{}", report::render_text(&dashboard));
            }
        }
        Commands::Schema => {
            let config = DashboardConfig::from_env()?;
            let keys = report::probe_schema(&config).await?;
            print!("{}", report::render_schema(&keys));
        }
        Commands::Serve {
            bind,
            port,
            no_initial_load,
        } => {
            let options = server_options(ServerOptions::from_env(), bind, port, no_initial_load);
            serve(options).await?;
        }
    }

    Ok(())
}

/// Overrides `defaults` with whatever was given on the command line.
fn server_options(
    defaults: ServerOptions,
    bind: Option<String>,
    port: Option<u16>,
    no_initial_load: bool,
) -> ServerOptions {
    ServerOptions {
        bind_addr: bind.unwrap_or(defaults.bind_addr),
        port: port.unwrap_or(defaults.port),
        initial_load: defaults.initial_load && !no_initial_load,
    }
}

/// Runs the server on its own actix system.
///
/// The server uses actix-web's runtime, so it runs in a blocking task to
/// avoid nesting tokio runtimes.
async fn serve(options: ServerOptions) -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(crime_dash_server::run_server(options))
    })
    .await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args(args: &[&str]) -> ServerOptions {
        let cli = Cli::try_parse_from(args).unwrap();
        let Some(Commands::Serve {
            bind,
            port,
            no_initial_load,
        }) = cli.command
        else {
            panic!("expected the serve subcommand");
        };
        server_options(ServerOptions::default(), bind, port, no_initial_load)
    }

    #[test]
    fn serve_flags_override_defaults() {
        let options = serve_args(&[
            "crime_dash_cli",
            "serve",
            "--bind",
            "0.0.0.0",
            "--port",
            "9000",
            "--no-initial-load",
        ]);
        assert_eq!(
            options,
            ServerOptions {
                bind_addr: "0.0.0.0".to_string(),
                port: 9000,
                initial_load: false,
            }
        );
    }

    #[test]
    fn serve_without_flags_keeps_defaults() {
        assert_eq!(serve_args(&["crime_dash_cli", "serve"]), ServerOptions::default());
    }
}

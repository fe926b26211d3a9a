#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line entry point for map-click crime predictions.
//!
//! `crime_predict predict --lat 40.7128 --lon -74.006` runs a single
//! click through the pipeline and prints the display lines. Without a
//! subcommand the tool falls back to an interactive menu.
//!
//! Uses `indicatif-log-bridge` (via [`crime_predict_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the spinner never fight for the terminal.

mod interactive;
mod predict;

use clap::{Args, Parser, Subcommand};
use crime_predict_model::FeatureOverrides;
use crime_predict_server::ServerOptions;

#[derive(Parser)]
#[command(name = "crime_predict", about = "Map-click crime likelihood predictions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict crime likelihood for a single coordinate
    Predict {
        /// Latitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Print the full report as JSON instead of display lines
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        features: FeatureArgs,
    },
    /// List the configured location codes in lookup order
    Codes,
    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides `BIND_ADDR`)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Per-run replacements for the placeholder feature values.
#[derive(Args)]
struct FeatureArgs {
    /// Calendar year
    #[arg(long)]
    year: Option<i64>,
    /// Month, 1-12
    #[arg(long)]
    month: Option<i64>,
    /// Hour of day, 0-23
    #[arg(long)]
    hour: Option<i64>,
    /// Day of week, Monday = 0
    #[arg(long)]
    weekday: Option<i64>,
    /// Police precinct code
    #[arg(long)]
    precinct: Option<i64>,
    /// Encoded crime class
    #[arg(long)]
    crime_class: Option<i64>,
    /// Encoded victim age group
    #[arg(long)]
    age_group: Option<i64>,
    /// Encoded victim race
    #[arg(long)]
    race: Option<i64>,
    /// Encoded victim sex
    #[arg(long)]
    sex: Option<i64>,
}

impl From<FeatureArgs> for FeatureOverrides {
    fn from(args: FeatureArgs) -> Self {
        Self {
            year: args.year,
            month: args.month,
            hour: args.hour,
            weekday: args.weekday,
            address_precinct: args.precinct,
            crime_class: args.crime_class,
            victim_age_group: args.age_group,
            victim_race: args.race,
            victim_sex: args.sex,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_predict_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Predict {
            lat,
            lon,
            json,
            features,
        } => {
            predict::run(&multi, lat, lon, &features.into(), json).await?;
        }
        Commands::Codes => predict::list_codes()?,
        Commands::Serve { bind, port } => {
            let defaults = ServerOptions::from_env()?;
            serve(ServerOptions {
                bind_addr: bind.unwrap_or(defaults.bind_addr),
                port: port.unwrap_or(defaults.port),
            })
            .await?;
        }
    }

    Ok(())
}

/// Runs the API server on its own actix system.
///
/// The server uses actix-web's runtime, so it runs in a blocking task to
/// avoid nesting tokio runtimes.
async fn serve(options: ServerOptions) -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(crime_predict_server::run_server(options))
    })
    .await??;
    Ok(())
}

/// Same, but prompting for the bind address and port first.
async fn serve_interactive() -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(|| {
        actix_web::rt::System::new().block_on(crime_predict_server::interactive::run())
    })
    .await??;
    Ok(())
}

//! Resolve a single route or ETA from the command line.
//!
//! Settings load from `TRANSIT_*` environment variables and the optional
//! configuration file. Results and failures print as JSON on stdout.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use serde_json::{Value, json};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use transit_backend::TransitSettings;
use transit_backend::domain::{Error, RouteToStopRequest};
use transit_backend::wiring::TransitServices;

/// `transit-lookup` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "transit-lookup",
    about = "Resolve a route to a stop or the next arrival at a stop",
    version
)]
struct CliArgs {
    #[command(subcommand)]
    command: Probe,
}

#[derive(Debug, Clone, Subcommand)]
enum Probe {
    /// Route from a position to a stop.
    Route {
        /// Origin latitude in decimal degrees.
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Origin longitude in decimal degrees.
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Destination stop id.
        #[arg(long, allow_negative_numbers = true)]
        stop: i32,
    },
    /// Seconds until the next vehicle reaches a stop.
    Eta {
        /// Stop id.
        #[arg(long, allow_negative_numbers = true)]
        stop: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    // Subcommand flags belong to clap; settings come from env and files only.
    let settings = TransitSettings::load_from_iter([OsString::from("transit-lookup")])
        .map_err(|error| eyre!("failed to load settings: {error}"))?;
    let services = TransitServices::from_settings(&settings)
        .await
        .wrap_err("failed to connect transit services")?;

    let output = match args.command {
        Probe::Route { lat, lon, stop } => {
            let request = RouteToStopRequest {
                origin_latitude: lat,
                origin_longitude: lon,
                stop_id: stop,
            };
            match services.routes.route_to_stop(request).await {
                Ok(route) => serde_json::to_value(route).wrap_err("failed to encode route")?,
                Err(error) => error_body(Error::from(error))?,
            }
        }
        Probe::Eta { stop } => match services.etas.estimate(stop).await {
            Ok(eta) => json!({
                "stopId": stop,
                "seconds": eta.seconds,
                "source": eta.source.as_str(),
            }),
            Err(error) => error_body(Error::from(error))?,
        },
    };
    println!("{output}");
    Ok(())
}

fn error_body(error: Error) -> Result<Value> {
    let body = serde_json::to_value(&error).wrap_err("failed to encode error")?;
    Ok(json!({ "error": body }))
}

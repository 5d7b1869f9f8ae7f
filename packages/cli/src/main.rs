#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the SG housing amenity pipeline.
//!
//! Typical flow: `geocode` a transactions CSV through `OneMap`, run
//! `features` against an amenity dataset to append distance and ring-count
//! columns, then `grid` the result into H3 cells. Running without a
//! subcommand opens an interactive menu.
//!
//! Uses `indicatif-log-bridge` (via [`sg_housing_cli_utils::init_logger`])
//! so log lines and progress bars share the terminal.

mod commands;
mod interactive;

use clap::{Parser, Subcommand};

use crate::commands::{FeaturesArgs, GeocodeArgs, GridArgs};

#[derive(Parser)]
#[command(name = "sg_housing", about = "Singapore housing amenity feature pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Append nearest-distance and ring-count amenity features to a property CSV
    Features(FeaturesArgs),
    /// Geocode addresses through the `OneMap` search API
    Geocode(GeocodeArgs),
    /// Aggregate properties into H3 hexagon cells
    Grid(GridArgs),
    /// List supported amenity kinds and their output columns
    Kinds,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = sg_housing_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Features(args) => commands::run_features(&args, &multi)?,
        Commands::Geocode(args) => commands::run_geocode(&args, &multi).await?,
        Commands::Grid(args) => commands::run_grid(&args)?,
        Commands::Kinds => commands::list_kinds(),
    }

    Ok(())
}

//! Interactive menu shown when the binary runs without a subcommand.
//!
//! Prompts for the same inputs the subcommands take and dispatches to the
//! shared implementations in [`crate::commands`].

use std::path::PathBuf;

use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use sg_housing_amenity_models::AmenityKind;
use sg_housing_cli_utils::MultiProgress;
use sg_housing_grid::DEFAULT_RESOLUTION;

use crate::commands::{self, FeaturesArgs, GeocodeArgs, GridArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Features,
    Geocode,
    Grid,
    Kinds,
}

impl Task {
    const ALL: &[Self] = &[Self::Features, Self::Geocode, Self::Grid, Self::Kinds];

    const fn label(self) -> &'static str {
        match self {
            Self::Features => "Compute amenity features",
            Self::Geocode => "Geocode addresses (OneMap)",
            Self::Grid => "Aggregate into H3 cells",
            Self::Kinds => "List amenity kinds",
        }
    }
}

/// Runs the interactive menu.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected task fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("SG Housing Toolchain");
    println!();

    let labels: Vec<&str> = Task::ALL.iter().map(|t| t.label()).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Task::ALL[idx] {
        Task::Features => commands::run_features(&prompt_features()?, multi)?,
        Task::Geocode => commands::run_geocode(&prompt_geocode()?, multi).await?,
        Task::Grid => commands::run_grid(&prompt_grid()?)?,
        Task::Kinds => commands::list_kinds(),
    }

    Ok(())
}

fn prompt_features() -> Result<FeaturesArgs, Box<dyn std::error::Error>> {
    let properties = prompt_path("Property CSV")?;
    let amenities = prompt_path("Amenity CSV")?;
    let output = prompt_path("Output CSV")?;

    let kinds = AmenityKind::all();
    let labels: Vec<&str> = kinds.iter().map(AsRef::as_ref).collect();
    let defaults = vec![true; kinds.len()];
    let selected = MultiSelect::new()
        .with_prompt("Amenity kinds (space=toggle, a=all, enter=confirm)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    if selected.is_empty() {
        return Err("No amenity kinds selected".into());
    }
    let kinds = if selected.len() == kinds.len() {
        None
    } else {
        Some(
            selected
                .iter()
                .map(|&i| labels[i])
                .collect::<Vec<_>>()
                .join(","),
        )
    };

    Ok(FeaturesArgs {
        properties,
        amenities,
        output,
        config: prompt_optional_path("Feature config TOML (empty for built-in)")?,
        kinds,
    })
}

fn prompt_geocode() -> Result<GeocodeArgs, Box<dyn std::error::Error>> {
    let input = prompt_path("Input CSV")?;
    let output = prompt_path("Output CSV")?;

    let hdb = Confirm::new()
        .with_prompt("Build addresses from HDB block + street columns?")
        .default(true)
        .interact()?;

    let (address_column, hdb_columns) = if hdb {
        let block: String = Input::new()
            .with_prompt("Block column")
            .default("block".to_string())
            .interact_text()?;
        let street: String = Input::new()
            .with_prompt("Street column")
            .default("street_name".to_string())
            .interact_text()?;
        ("address".to_string(), Some(format!("{block},{street}")))
    } else {
        let column: String = Input::new()
            .with_prompt("Address column")
            .default("address".to_string())
            .interact_text()?;
        (column, None)
    };

    let token = prompt_token()?;

    let rate_limit_ms = prompt_optional_u64("Delay between requests in ms (empty for config)")?;

    Ok(GeocodeArgs {
        input,
        output,
        address_column,
        hdb_columns,
        config: None,
        token,
        concurrency: None,
        rate_limit_ms,
    })
}

fn prompt_grid() -> Result<GridArgs, Box<dyn std::error::Error>> {
    let input = prompt_path("Property CSV")?;
    let output = prompt_path("Output CSV")?;

    let resolution: u8 = Input::new()
        .with_prompt("H3 resolution (0-15)")
        .default(DEFAULT_RESOLUTION)
        .interact_text()?;

    let psf = Confirm::new()
        .with_prompt("Average price per square foot per cell?")
        .default(true)
        .interact()?;

    Ok(GridArgs {
        input,
        output,
        resolution,
        value_column: None,
        psf,
        config: None,
    })
}

/// Reads the `OneMap` token without echoing it, falling back to
/// `ONEMAP_TOKEN` when left empty.
fn prompt_token() -> Result<Option<String>, Box<dyn std::error::Error>> {
    let token = Password::new()
        .with_prompt("OneMap token (empty to use ONEMAP_TOKEN or none)")
        .allow_empty_password(true)
        .interact()?;

    Ok(token_or_env(token, std::env::var("ONEMAP_TOKEN").ok()))
}

fn token_or_env(entered: String, env: Option<String>) -> Option<String> {
    if entered.trim().is_empty() {
        env.filter(|t| !t.trim().is_empty())
    } else {
        Some(entered)
    }
}

fn prompt_path(prompt: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let input: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(PathBuf::from(input.trim()))
}

/// Returns `None` if the input is empty.
fn prompt_optional_path(prompt: &str) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    let trimmed = input.trim();
    Ok((!trimmed.is_empty()).then(|| PathBuf::from(trimmed)))
}

/// Prompts the user for an optional `u64` value.
///
/// Returns `None` if the input is empty.
fn prompt_optional_u64(prompt: &str) -> Result<Option<u64>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.trim().parse()?))
    }
}

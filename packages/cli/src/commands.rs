//! Subcommand implementations shared by the argument parser and the
//! interactive menu.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr as _;
use std::time::Instant;

use clap::Args;
use sg_housing_amenity_models::AmenityKind;
use sg_housing_cli_utils::{IndicatifProgress, MultiProgress};
use sg_housing_features::{
    FeatureConfig, FeatureError, PropertyTable, compute_all, load_amenities_path,
};
use sg_housing_geocoder::address::hdb_address;
use sg_housing_geocoder::{AddressInput, GeocodedAddress, OneMapClient, OneMapConfig};
use sg_housing_grid::{DEFAULT_RESOLUTION, ValueSource, aggregate, samples_from_table};

/// Arguments for the `features` subcommand.
#[derive(Debug, Clone, Args)]
pub struct FeaturesArgs {
    /// Property CSV with latitude/longitude columns
    #[arg(long)]
    pub properties: PathBuf,
    /// Amenity CSV with `id`, `type`, `name`, `latitude`, `longitude` columns
    #[arg(long)]
    pub amenities: PathBuf,
    /// Output CSV path
    #[arg(long)]
    pub output: PathBuf,
    /// Feature config TOML (defaults to the built-in config)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Comma-separated amenity kinds, overriding the config (e.g. "mrt,hawker")
    #[arg(long)]
    pub kinds: Option<String>,
}

/// Arguments for the `geocode` subcommand.
#[derive(Debug, Clone, Args)]
pub struct GeocodeArgs {
    /// Input CSV
    #[arg(long)]
    pub input: PathBuf,
    /// Output CSV (input columns plus latitude/longitude/matched address)
    #[arg(long)]
    pub output: PathBuf,
    /// Column holding the full address text
    #[arg(long, default_value = "address")]
    pub address_column: String,
    /// Build addresses from HDB block + street columns instead
    /// (e.g. "block,street_name")
    #[arg(long)]
    pub hdb_columns: Option<String>,
    /// `OneMap` config TOML (defaults to the built-in config)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// `OneMap` API token
    #[arg(long, env = "ONEMAP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Number of concurrent requests (overrides the config)
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Delay before each request in milliseconds (overrides the config)
    #[arg(long)]
    pub rate_limit_ms: Option<u64>,
}

/// Arguments for the `grid` subcommand.
#[derive(Debug, Clone, Args)]
pub struct GridArgs {
    /// Property CSV with latitude/longitude columns
    #[arg(long)]
    pub input: PathBuf,
    /// Output CSV of H3 cells
    #[arg(long)]
    pub output: PathBuf,
    /// H3 resolution (0-15)
    #[arg(long, default_value_t = DEFAULT_RESOLUTION)]
    pub resolution: u8,
    /// Numeric column to average per cell
    #[arg(long, conflicts_with = "psf")]
    pub value_column: Option<String>,
    /// Average price per square foot from the configured price and floor
    /// area columns
    #[arg(long)]
    pub psf: bool,
    /// Feature config TOML, for column names (defaults to the built-in config)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Parses a comma-separated kind list.
fn parse_kinds(list: &str) -> Result<Vec<AmenityKind>, Box<dyn std::error::Error>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            AmenityKind::from_str(s).map_err(|_| format!("Unknown amenity kind: '{s}'").into())
        })
        .collect()
}

/// Computes amenity distance features and writes the enriched table.
///
/// # Errors
///
/// Returns an error if loading, computing or writing fails.
pub fn run_features(
    args: &FeaturesArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let mut config = FeatureConfig::load(args.config.as_deref())?;
    if let Some(kinds) = &args.kinds {
        config.kinds = parse_kinds(kinds)?;
    }

    let mut table = PropertyTable::from_path(&args.properties)?;
    let amenities = load_amenities_path(&args.amenities)?;

    let progress = IndicatifProgress::rows_bar(multi, "Amenity features");
    let summary = compute_all(&mut table, &amenities, &config, &progress)?;

    table.write_path(&args.output)?;

    log::info!(
        "Features complete: {} properties, {} dropped, {} kinds ({} empty) in {:.1}s",
        summary.processed_rows,
        summary.dropped_rows,
        config.kinds.len(),
        summary.empty_kinds.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Builds geocoder inputs from the table's address or HDB columns.
fn address_inputs(
    table: &PropertyTable,
    args: &GeocodeArgs,
) -> Result<Vec<AddressInput>, Box<dyn std::error::Error>> {
    let column = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| format!("Missing column: {name}"))
    };

    let addresses: Vec<String> = if let Some(columns) = &args.hdb_columns {
        let (block, street) = columns
            .split_once(',')
            .ok_or("--hdb-columns expects \"<block>,<street>\"")?;
        let block_idx = column(block.trim())?;
        let street_idx = column(street.trim())?;
        table
            .rows()
            .iter()
            .map(|row| hdb_address(&row[block_idx], &row[street_idx]))
            .collect()
    } else {
        let idx = column(args.address_column.as_str())?;
        table.column_values(idx).map(String::from).collect()
    };

    Ok(addresses
        .into_iter()
        .enumerate()
        .map(|(i, address)| AddressInput {
            id: i.to_string(),
            address,
        })
        .collect())
}

/// Geocodes every row of the input table through `OneMap` and writes the
/// table with coordinate, address, postal and building columns.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the client cannot be
/// built, or the output cannot be written. Individual request failures
/// leave empty coordinates and are logged.
pub async fn run_geocode(
    args: &GeocodeArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let mut config = OneMapConfig::load(args.config.as_deref())?.with_token(args.token.clone());
    if let Some(concurrency) = args.concurrency {
        config.concurrent_requests = concurrency;
    }
    if let Some(rate_limit_ms) = args.rate_limit_ms {
        config.rate_limit_ms = rate_limit_ms;
    }

    let mut table = PropertyTable::from_path(&args.input)?;
    let inputs = address_inputs(&table, args)?;

    let client = OneMapClient::new(config)?;
    let progress = IndicatifProgress::requests_bar(multi, "Geocoding");
    let batch = client.geocode_batch(&inputs, &progress).await;

    let matched: BTreeMap<usize, _> = batch
        .matched
        .into_iter()
        .filter_map(|(id, geocoded)| id.parse::<usize>().ok().map(|i| (i, geocoded)))
        .collect();

    write_geocode_columns(&mut table, &matched)?;
    table.write_path(&args.output)?;

    log::info!(
        "Geocoding complete: {}/{} matched, {} unmatched, {} failed in {:.1}s",
        matched.len(),
        inputs.len(),
        batch.unmatched.len(),
        batch.failed.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Columns written by the `geocode` subcommand, in output order.
const GEOCODE_COLUMNS: [&str; 5] = [
    "latitude",
    "longitude",
    "matched_address",
    "postal",
    "building",
];

/// Builds the [`GEOCODE_COLUMNS`] values for `rows` rows. Rows absent from
/// `matched` (no match, not geocodable, or failed) get blank cells.
fn geocode_columns(rows: usize, matched: &BTreeMap<usize, GeocodedAddress>) -> [Vec<String>; 5] {
    let mut columns: [Vec<String>; 5] = Default::default();

    for i in 0..rows {
        let cells = matched.get(&i).map_or_else(<[String; 5]>::default, |geocoded| {
            [
                geocoded.latitude.to_string(),
                geocoded.longitude.to_string(),
                geocoded.matched_address.clone().unwrap_or_default(),
                geocoded.postal.clone().unwrap_or_default(),
                geocoded.building.clone().unwrap_or_default(),
            ]
        });
        for (column, cell) in columns.iter_mut().zip(cells) {
            column.push(cell);
        }
    }

    columns
}

/// Writes the geocoding result columns into `table`, replacing any that
/// already exist.
fn write_geocode_columns(
    table: &mut PropertyTable,
    matched: &BTreeMap<usize, GeocodedAddress>,
) -> Result<(), FeatureError> {
    let columns = geocode_columns(table.len(), matched);
    for (name, values) in GEOCODE_COLUMNS.into_iter().zip(columns) {
        table.set_column(name, values)?;
    }
    Ok(())
}

/// Aggregates properties into H3 cells and writes the cell table.
///
/// # Errors
///
/// Returns an error if loading, aggregating or writing fails.
pub fn run_grid(args: &GridArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = FeatureConfig::load(args.config.as_deref())?;
    let table = PropertyTable::from_path(&args.input)?;

    let source = match (&args.value_column, args.psf) {
        (Some(column), _) => ValueSource::Column(column.clone()),
        (None, true) => ValueSource::Psf,
        (None, false) => ValueSource::None,
    };

    let samples = samples_from_table(&table, &config.columns, &source)?;
    let cells = aggregate(&samples, args.resolution)?;
    sg_housing_grid::write_cells_path(&cells, &args.output)?;
    Ok(())
}

/// Prints every supported amenity kind with its output columns.
pub fn list_kinds() {
    for kind in AmenityKind::all() {
        println!("{kind:<12} {}", kind.feature_columns().join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_lists() {
        assert_eq!(
            parse_kinds("mrt, Hawker,,school").unwrap(),
            vec![AmenityKind::Mrt, AmenityKind::Hawker, AmenityKind::School]
        );
        assert!(parse_kinds("mrt,casino").is_err());
    }

    fn geocode_args(hdb_columns: Option<&str>) -> GeocodeArgs {
        GeocodeArgs {
            input: PathBuf::from("in.csv"),
            output: PathBuf::from("out.csv"),
            address_column: "address".to_string(),
            hdb_columns: hdb_columns.map(String::from),
            config: None,
            token: None,
            concurrency: None,
            rate_limit_ms: None,
        }
    }

    #[test]
    fn builds_inputs_from_hdb_columns() {
        let table = PropertyTable::from_reader(
            "block,street_name,resale_price\n406,ANG MO KIO AVE 10,500000\n".as_bytes(),
        )
        .unwrap();

        let inputs = address_inputs(&table, &geocode_args(Some("block, street_name"))).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].id, "0");
        assert_eq!(inputs[0].address, "406 ANG MO KIO AVE 10");

        assert!(address_inputs(&table, &geocode_args(None)).is_err());
    }

    fn ang_mo_kio() -> GeocodedAddress {
        GeocodedAddress {
            latitude: 1.362,
            longitude: 103.8539,
            matched_address: Some("406 ANG MO KIO AVENUE 10 SINGAPORE 560406".to_string()),
            postal: Some("560406".to_string()),
            building: None,
        }
    }

    fn cell<'a>(table: &'a PropertyTable, row: usize, column: &str) -> &'a str {
        let idx = table.column_index(column).unwrap();
        &table.rows()[row][idx]
    }

    #[test]
    fn geocode_columns_fill_matched_rows_and_blank_the_rest() {
        let matched = BTreeMap::from([(0, ang_mo_kio())]);
        let [latitude, longitude, address, postal, building] = geocode_columns(2, &matched);

        assert_eq!(latitude, ["1.362", ""]);
        assert_eq!(longitude, ["103.8539", ""]);
        assert_eq!(address[0], "406 ANG MO KIO AVENUE 10 SINGAPORE 560406");
        assert_eq!(address[1], "");
        assert_eq!(postal, ["560406", ""]);
        assert_eq!(building, ["", ""]);
    }

    #[test]
    fn geocode_columns_are_appended_to_the_input() {
        let mut table = PropertyTable::from_reader(
            "block,street_name\n406,ANG MO KIO AVE 10\n999,NOWHERE RD\n".as_bytes(),
        )
        .unwrap();

        write_geocode_columns(&mut table, &BTreeMap::from([(0, ang_mo_kio())])).unwrap();

        assert_eq!(
            table.headers(),
            [
                "block",
                "street_name",
                "latitude",
                "longitude",
                "matched_address",
                "postal",
                "building",
            ]
        );
        assert_eq!(cell(&table, 0, "postal"), "560406");
        assert_eq!(cell(&table, 1, "latitude"), "");
        assert_eq!(cell(&table, 1, "matched_address"), "");
    }

    #[test]
    fn regeocoding_overwrites_existing_coordinates() {
        let mut table = PropertyTable::from_reader(
            "address,latitude,longitude\n406 ANG MO KIO AVE 10,0.0,0.0\nNIL,1.0,1.0\n"
                .as_bytes(),
        )
        .unwrap();

        write_geocode_columns(&mut table, &BTreeMap::from([(0, ang_mo_kio())])).unwrap();

        assert_eq!(
            table.headers(),
            [
                "address",
                "latitude",
                "longitude",
                "matched_address",
                "postal",
                "building",
            ]
        );
        assert_eq!(cell(&table, 0, "latitude"), "1.362");
        assert_eq!(cell(&table, 0, "longitude"), "103.8539");
        assert_eq!(cell(&table, 1, "latitude"), "");
        assert_eq!(cell(&table, 1, "longitude"), "");
    }
}

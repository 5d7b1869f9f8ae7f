#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! H3 hexagonal grid aggregation.
//!
//! Assigns each property to an H3 cell and rolls rows up per cell: a row
//! count plus the mean of an optional value (a numeric column or
//! price-per-square-foot). Used to map transaction density and price
//! levels without relying on administrative boundaries.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use h3o::{CellIndex, LatLng, Resolution};
use serde::Serialize;
use sg_housing_amenity_models::pricing::price_per_sqft;
use sg_housing_features::table::parse_number;
use sg_housing_features::{ColumnConfig, FeatureError, PropertyTable};
use thiserror::Error;

/// Default aggregation resolution (~0.7 km² hexagons).
pub const DEFAULT_RESOLUTION: u8 = 8;

/// Errors from grid aggregation.
#[derive(Debug, Error)]
pub enum GridError {
    /// The requested H3 resolution is outside 0..=15.
    #[error("Invalid H3 resolution: {0}")]
    InvalidResolution(u8),

    /// Coordinates could not be mapped to a cell.
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates {
        /// Latitude.
        lat: f64,
        /// Longitude.
        lon: f64,
    },

    /// A value column was requested but is absent.
    #[error("Missing column: {name}")]
    MissingColumn {
        /// Column name.
        name: String,
    },

    /// Reading the property table failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Writing the cell CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to average per cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValueSource {
    /// Counts only.
    #[default]
    None,
    /// Mean of a numeric column.
    Column(String),
    /// Mean price per square foot from the configured price and floor
    /// area columns.
    Psf,
}

/// One property position with an optional value to average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSample {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Value contributing to the cell mean.
    pub value: Option<f64>,
}

/// Aggregated statistics for one H3 cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    /// H3 cell index in hexadecimal form.
    pub cell: String,
    /// H3 resolution.
    pub resolution: u8,
    /// Number of properties in the cell.
    pub count: u64,
    /// Number of properties that contributed a value.
    pub valued: u64,
    /// Mean of the contributed values.
    pub mean_value: Option<f64>,
    /// Cell centre latitude.
    pub center_lat: f64,
    /// Cell centre longitude.
    pub center_lon: f64,
}

/// Maps a coordinate to its H3 cell at `resolution`.
///
/// # Errors
///
/// Returns [`GridError`] for an out-of-range resolution or invalid
/// coordinates.
pub fn cell_for(lat: f64, lon: f64, resolution: u8) -> Result<CellIndex, GridError> {
    let res = Resolution::try_from(resolution).map_err(|_| GridError::InvalidResolution(resolution))?;
    let coord = LatLng::new(lat, lon).map_err(|_| GridError::InvalidCoordinates { lat, lon })?;
    Ok(coord.to_cell(res))
}

#[derive(Default)]
struct CellAccumulator {
    count: u64,
    valued: u64,
    sum: f64,
}

/// Aggregates samples into H3 cells, ordered by cell index.
///
/// # Errors
///
/// Returns [`GridError`] for an out-of-range resolution or if any sample
/// has invalid coordinates.
pub fn aggregate(samples: &[GridSample], resolution: u8) -> Result<Vec<GridCell>, GridError> {
    let mut cells: BTreeMap<u64, CellAccumulator> = BTreeMap::new();

    for sample in samples {
        let cell = cell_for(sample.latitude, sample.longitude, resolution)?;
        let acc = cells.entry(u64::from(cell)).or_default();
        acc.count += 1;
        if let Some(value) = sample.value.filter(|v| v.is_finite()) {
            acc.valued += 1;
            acc.sum += value;
        }
    }

    let mut out = Vec::with_capacity(cells.len());
    for (raw, acc) in cells {
        let Ok(cell) = CellIndex::try_from(raw) else {
            continue;
        };
        let center = LatLng::from(cell);

        #[allow(clippy::cast_precision_loss)]
        let mean_value = (acc.valued > 0).then(|| acc.sum / acc.valued as f64);

        out.push(GridCell {
            cell: cell.to_string(),
            resolution,
            count: acc.count,
            valued: acc.valued,
            mean_value,
            center_lat: center.lat(),
            center_lon: center.lng(),
        });
    }

    log::info!(
        "Aggregated {} samples into {} H3 cells at resolution {resolution}",
        samples.len(),
        out.len()
    );

    Ok(out)
}

/// Extracts grid samples from a property table. Rows without usable
/// coordinates are skipped.
///
/// # Errors
///
/// Returns [`GridError`] if coordinate columns or the requested value
/// columns are missing.
pub fn samples_from_table(
    table: &PropertyTable,
    columns: &ColumnConfig,
    source: &ValueSource,
) -> Result<Vec<GridSample>, GridError> {
    let require = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| GridError::MissingColumn {
                name: name.to_string(),
            })
    };

    let value_of: Box<dyn Fn(&[String]) -> Option<f64>> = match source {
        ValueSource::None => Box::new(|_: &[String]| None::<f64>),
        ValueSource::Column(name) => {
            let idx = require(name.as_str())?;
            Box::new(move |row: &[String]| parse_number(&row[idx]))
        }
        ValueSource::Psf => {
            let price_idx = require(columns.price.as_str())?;
            let area_idx = require(columns.floor_area.as_str())?;
            Box::new(move |row: &[String]| {
                price_per_sqft(parse_number(&row[price_idx])?, parse_number(&row[area_idx])?)
            })
        }
    };

    let points = table.property_points(columns)?;
    let samples: Vec<GridSample> = points
        .iter()
        .zip(table.rows())
        .filter_map(|(point, row)| {
            point.as_ref().map(|p| GridSample {
                latitude: p.latitude,
                longitude: p.longitude,
                value: value_of(row.as_slice()),
            })
        })
        .collect();

    let skipped = points.len() - samples.len();
    if skipped > 0 {
        log::warn!("Skipped {skipped} rows with missing or invalid coordinates");
    }

    Ok(samples)
}

/// Writes aggregated cells as CSV.
///
/// # Errors
///
/// Returns [`GridError::Csv`] if serialization fails.
pub fn write_cells<W: Write>(cells: &[GridCell], writer: W) -> Result<(), GridError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for cell in cells {
        csv_writer.serialize(cell)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes aggregated cells to a CSV file.
///
/// # Errors
///
/// Returns [`GridError`] if the file cannot be created or written.
pub fn write_cells_path(cells: &[GridCell], path: &Path) -> Result<(), GridError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_cells(cells, std::io::BufWriter::new(file))?;
    log::info!("Wrote {} cells to {}", cells.len(), path.display());
    Ok(())
}

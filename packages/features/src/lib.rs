#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Amenity distance feature assembly.
//!
//! Loads a property table and an amenity dataset from CSV, drops
//! properties without usable coordinates, and appends per-kind columns:
//!
//! * `dist_to_nearest_<kind>`: haversine meters to the nearest amenity
//! * `<kind>_within_500m`, `<kind>_within_1km`, `<kind>_within_2km`
//!
//! Existing feature columns are overwritten, so re-running on a table that
//! already carries features yields the same output.

pub mod amenities;
pub mod assemble;
pub mod config;
pub mod table;

use thiserror::Error;

pub use amenities::{AmenitiesByKind, load_amenities, load_amenities_path};
pub use assemble::{AssemblySummary, append_amenity_features, compute_all};
pub use config::{ColumnConfig, FeatureConfig};
pub use table::PropertyTable;

/// Errors from feature assembly.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A required column is absent from the table.
    #[error("Missing column: {name}")]
    MissingColumn {
        /// Configured column name.
        name: String,
    },

    /// A row or column does not match the table width/height.
    #[error("Row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        /// Offending row index.
        row: usize,
        /// Expected number of cells.
        expected: usize,
        /// Actual number of cells.
        actual: usize,
    },
}

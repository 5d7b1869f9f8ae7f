//! Amenity dataset loading.
//!
//! Amenity CSVs carry one row per amenity with `id`, `type`, an optional
//! `name`, and `latitude`/`longitude` columns. Rows are grouped by
//! [`AmenityKind`]; rows with unknown types or unusable coordinates are
//! dropped and counted.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr as _;

use serde::Deserialize;
use sg_housing_amenity_models::{AmenityKind, AmenityPoint};

use crate::FeatureError;
use crate::table::parse_number;

/// Amenities grouped by kind.
pub type AmenitiesByKind = BTreeMap<AmenityKind, Vec<AmenityPoint>>;

#[derive(Debug, Deserialize)]
struct AmenityRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(alias = "lat")]
    latitude: String,
    #[serde(alias = "lon", alias = "lng")]
    longitude: String,
}

/// Reads and groups amenities from CSV.
///
/// # Errors
///
/// Returns [`FeatureError::Csv`] if the CSV is malformed or lacks a
/// required column.
pub fn load_amenities<R: Read>(reader: R) -> Result<AmenitiesByKind, FeatureError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut grouped = AmenitiesByKind::new();
    let mut unknown_kind = 0_usize;
    let mut bad_coordinates = 0_usize;

    for record in csv_reader.deserialize::<AmenityRecord>() {
        let record = record?;

        let Ok(kind) = AmenityKind::from_str(record.kind.trim()) else {
            log::debug!("Unknown amenity type '{}' for {}", record.kind, record.id);
            unknown_kind += 1;
            continue;
        };

        let (Some(latitude), Some(longitude)) = (
            parse_number(&record.latitude),
            parse_number(&record.longitude),
        ) else {
            bad_coordinates += 1;
            continue;
        };

        grouped.entry(kind).or_default().push(AmenityPoint {
            id: record.id,
            kind,
            name: record.name.filter(|n| !n.trim().is_empty()),
            latitude,
            longitude,
        });
    }

    if unknown_kind > 0 {
        log::warn!("Skipped {unknown_kind} amenities with unknown types");
    }
    if bad_coordinates > 0 {
        log::warn!("Skipped {bad_coordinates} amenities with missing or invalid coordinates");
    }
    for (kind, points) in &grouped {
        log::info!("Loaded {} {kind} amenities", points.len());
    }

    Ok(grouped)
}

/// Reads and groups amenities from a CSV file.
///
/// # Errors
///
/// Returns [`FeatureError`] if the file cannot be opened or parsed.
pub fn load_amenities_path(path: &Path) -> Result<AmenitiesByKind, FeatureError> {
    let file = std::fs::File::open(path)?;
    load_amenities(std::io::BufReader::new(file))
}

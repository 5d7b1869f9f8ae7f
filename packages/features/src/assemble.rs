//! Per-property feature assembly.
//!
//! For every amenity kind, builds one [`AmenityIndex`] and walks the
//! property table row by row, writing the nearest-distance column and the
//! three ring-count columns.

use std::sync::Arc;

use sg_housing_amenity_models::{AmenityFeatures, AmenityKind};
use sg_housing_progress::ProgressCallback;
use sg_housing_spatial::AmenityIndex;

use crate::FeatureError;
use crate::amenities::AmenitiesByKind;
use crate::config::FeatureConfig;
use crate::table::PropertyTable;

/// Summary of one feature assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblySummary {
    /// Rows dropped for missing or invalid coordinates.
    pub dropped_rows: usize,
    /// Rows that received features.
    pub processed_rows: usize,
    /// Kinds that had no amenities loaded.
    pub empty_kinds: Vec<AmenityKind>,
}

/// Computes features for one amenity kind and writes its four columns into
/// `table`, overwriting them if they already exist.
///
/// Rows whose coordinates cannot be parsed get empty/zero features.
///
/// # Errors
///
/// Returns [`FeatureError::MissingColumn`] if the coordinate columns are
/// absent.
pub fn append_amenity_features(
    table: &mut PropertyTable,
    config: &FeatureConfig,
    kind: AmenityKind,
    index: &AmenityIndex,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(), FeatureError> {
    let points = table.property_points(&config.columns)?;

    progress.set_message(format!("{kind} features"));
    progress.set_total(points.len() as u64);

    let features: Vec<AmenityFeatures> = points
        .iter()
        .map(|point| {
            let features = point.as_ref().map_or_else(AmenityFeatures::default, |p| {
                index.features_at(p.longitude, p.latitude)
            });
            progress.inc(1);
            features
        })
        .collect();

    let mut columns: Vec<Vec<String>> = vec![Vec::with_capacity(features.len()); 4];
    for row in &features {
        for (column, cell) in columns.iter_mut().zip(row.to_cells()) {
            column.push(cell);
        }
    }

    for (name, values) in kind.feature_columns().into_iter().zip(columns) {
        table.set_column(&name, values)?;
    }

    log::debug!(
        "Computed {kind} features for {} rows against {} amenities",
        features.len(),
        index.len()
    );

    Ok(())
}

/// Drops rows without usable coordinates, then appends features for every
/// kind listed in `config`.
///
/// Kinds absent from `amenities` are computed against an empty index,
/// which yields an empty nearest distance and zero counts.
///
/// The progress bar is cleared rather than finished when an error aborts
/// the run.
///
/// # Errors
///
/// Returns [`FeatureError`] if the coordinate columns are absent.
pub fn compute_all(
    table: &mut PropertyTable,
    amenities: &AmenitiesByKind,
    config: &FeatureConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<AssemblySummary, FeatureError> {
    let dropped_rows = match table.retain_valid_coordinates(&config.columns) {
        Ok(dropped) => dropped,
        Err(e) => {
            progress.finish_and_clear();
            return Err(e);
        }
    };
    let mut summary = AssemblySummary {
        dropped_rows,
        processed_rows: table.len(),
        empty_kinds: Vec::new(),
    };

    for &kind in &config.kinds {
        let points = amenities.get(&kind).map_or(&[][..], Vec::as_slice);
        if points.is_empty() {
            log::warn!("No {kind} amenities loaded; distances will be empty");
            summary.empty_kinds.push(kind);
        }

        let index = AmenityIndex::build(points);
        if let Err(e) = append_amenity_features(table, config, kind, &index, progress) {
            progress.finish_and_clear();
            return Err(e);
        }
        log::info!("Computed {kind} features for {} properties", table.len());
    }

    progress.finish(format!(
        "Computed {} amenity kinds for {} properties",
        config.kinds.len(),
        table.len()
    ));

    Ok(summary)
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Property, amenity and distance-feature types.
//!
//! These types are shared by the spatial index, the feature assembly step
//! and the CLI. Coordinates are always WGS84 decimal degrees.

pub mod pricing;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A geocoded property (HDB flat, condo unit, etc.).
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPoint {
    /// Identifier carried through from the source table.
    pub id: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// A single amenity location of a known [`AmenityKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct AmenityPoint {
    /// Identifier from the amenity dataset.
    pub id: String,
    /// Amenity category.
    pub kind: AmenityKind,
    /// Display name (e.g. "Tiong Bahru Market").
    pub name: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// Amenity categories that distance features are computed for.
///
/// Parsed from and printed as `snake_case` (`"hawker"`, `"mrt"`, ...),
/// which is also the form used in output column names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AmenityKind {
    /// Primary and secondary schools.
    School,
    /// Hawker centres.
    Hawker,
    /// Parks and park connectors.
    Park,
    /// MRT/LRT stations.
    Mrt,
    /// Supermarkets.
    Supermarket,
    /// Shopping malls.
    Mall,
    /// Hospitals and polyclinics.
    Hospital,
    /// Childcare and kindergarten centres.
    Childcare,
}

impl AmenityKind {
    /// Every supported kind, in declaration order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Name of the nearest-distance column, e.g. `dist_to_nearest_mrt`.
    #[must_use]
    pub fn nearest_column(self) -> String {
        format!("dist_to_nearest_{self}")
    }

    /// Name of the count column for `ring`, e.g. `mrt_within_500m`.
    #[must_use]
    pub fn ring_column(self, ring: Ring) -> String {
        format!("{self}_within_{ring}")
    }

    /// All four output columns for this kind, nearest distance first.
    #[must_use]
    pub fn feature_columns(self) -> Vec<String> {
        let mut columns = vec![self.nearest_column()];
        columns.extend(Ring::ALL.iter().map(|&ring| self.ring_column(ring)));
        columns
    }
}

/// Counting rings around a property.
///
/// Each ring has an exact haversine threshold and a generous degree radius
/// used to pull candidates out of the spatial index before the exact
/// filter. The degree radii are sized for Singapore's latitude, where one
/// degree is roughly 111 km in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub enum Ring {
    /// 500 meters.
    #[strum(serialize = "500m")]
    M500,
    /// 1 kilometer.
    #[strum(serialize = "1km")]
    Km1,
    /// 2 kilometers.
    #[strum(serialize = "2km")]
    Km2,
}

impl Ring {
    /// All rings from smallest to largest.
    pub const ALL: [Self; 3] = [Self::M500, Self::Km1, Self::Km2];

    /// Exact ring threshold in meters (inclusive).
    #[must_use]
    pub const fn meters(self) -> f64 {
        match self {
            Self::M500 => 500.0,
            Self::Km1 => 1_000.0,
            Self::Km2 => 2_000.0,
        }
    }

    /// Approximate search radius in raw degrees for the candidate query.
    #[must_use]
    pub const fn candidate_degrees(self) -> f64 {
        match self {
            Self::M500 => 0.005,
            Self::Km1 => 0.01,
            Self::Km2 => 0.02,
        }
    }

    /// The largest ring.
    #[must_use]
    pub const fn outermost() -> Self {
        Self::Km2
    }
}

/// Distance features for one property against one amenity kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AmenityFeatures {
    /// Haversine distance to the nearest amenity, or `None` when the
    /// amenity set is empty.
    pub nearest_m: Option<f64>,
    /// Amenities within 500 m.
    pub within_500m: u32,
    /// Amenities within 1 km.
    pub within_1km: u32,
    /// Amenities within 2 km.
    pub within_2km: u32,
}

impl AmenityFeatures {
    /// Count for a given ring.
    #[must_use]
    pub const fn count(&self, ring: Ring) -> u32 {
        match ring {
            Ring::M500 => self.within_500m,
            Ring::Km1 => self.within_1km,
            Ring::Km2 => self.within_2km,
        }
    }

    /// Sets the count for a given ring.
    pub const fn set_count(&mut self, ring: Ring, count: u32) {
        match ring {
            Ring::M500 => self.within_500m = count,
            Ring::Km1 => self.within_1km = count,
            Ring::Km2 => self.within_2km = count,
        }
    }

    /// Renders the features as CSV cells in [`AmenityKind::feature_columns`]
    /// order. A missing nearest distance becomes an empty cell.
    #[must_use]
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.nearest_m
                .map_or_else(String::new, |d| format!("{d:.2}")),
        ];
        cells.extend(Ring::ALL.iter().map(|&ring| self.count(ring).to_string()));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(AmenityKind::from_str("MRT").unwrap(), AmenityKind::Mrt);
        assert_eq!(
            AmenityKind::from_str("hawker").unwrap(),
            AmenityKind::Hawker
        );
        assert!(AmenityKind::from_str("casino").is_err());
    }

    #[test]
    fn kind_serde_matches_display() {
        let json = serde_json::to_string(&AmenityKind::Supermarket).unwrap();
        assert_eq!(json, "\"supermarket\"");
        assert_eq!(AmenityKind::Supermarket.to_string(), "supermarket");
    }

    #[test]
    fn column_names_follow_convention() {
        assert_eq!(
            AmenityKind::School.feature_columns(),
            vec![
                "dist_to_nearest_school",
                "school_within_500m",
                "school_within_1km",
                "school_within_2km",
            ]
        );
    }

    #[test]
    fn rings_are_ordered_and_nested() {
        for pair in Ring::ALL.windows(2) {
            assert!(pair[0].meters() < pair[1].meters());
            assert!(pair[0].candidate_degrees() < pair[1].candidate_degrees());
        }
        assert_eq!(Ring::outermost(), Ring::Km2);
    }

    #[test]
    fn empty_nearest_renders_blank_cell() {
        let features = AmenityFeatures::default();
        assert_eq!(features.to_cells(), vec!["", "0", "0", "0"]);

        let mut features = AmenityFeatures {
            nearest_m: Some(123.456),
            ..AmenityFeatures::default()
        };
        features.set_count(Ring::Km2, 4);
        assert_eq!(features.to_cells(), vec!["123.46", "0", "0", "4"]);
    }
}

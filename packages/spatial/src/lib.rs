#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for amenity distance features.
//!
//! Builds an R-tree over raw `[longitude, latitude]` amenity coordinates
//! and answers nearest-neighbour and ring-count queries for properties.
//!
//! Index queries run on unprojected degrees, which is only an
//! approximation of ground distance. Every query therefore follows the
//! same two steps: pull candidates from the index with a generous degree
//! radius, then decide membership with the exact [`haversine_m`] distance.

pub mod haversine;

use rstar::RTree;
use rstar::primitives::GeomWithData;
use sg_housing_amenity_models::{AmenityFeatures, AmenityPoint, Ring};

pub use haversine::{EARTH_RADIUS_M, haversine_m, haversine_points};

/// An amenity position in the R-tree, tagged with its offset into
/// [`AmenityIndex::ids`].
type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// The nearest amenity to a query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestAmenity {
    /// Identifier of the amenity.
    pub id: String,
    /// Haversine distance in meters.
    pub distance_m: f64,
}

/// Read-only spatial index over the amenities of a single kind.
///
/// Built once per amenity kind and queried for every property.
pub struct AmenityIndex {
    tree: RTree<IndexedPoint>,
    ids: Vec<String>,
}

impl AmenityIndex {
    /// Bulk-loads the given amenities into an R-tree.
    ///
    /// Amenities with non-finite coordinates are skipped.
    #[must_use]
    pub fn build(amenities: &[AmenityPoint]) -> Self {
        let mut ids = Vec::with_capacity(amenities.len());
        let mut points = Vec::with_capacity(amenities.len());

        for amenity in amenities {
            if !amenity.longitude.is_finite() || !amenity.latitude.is_finite() {
                log::debug!("Skipping amenity {} with invalid coordinates", amenity.id);
                continue;
            }
            points.push(GeomWithData::new(
                [amenity.longitude, amenity.latitude],
                ids.len(),
            ));
            ids.push(amenity.id.clone());
        }

        Self {
            tree: RTree::bulk_load(points),
            ids,
        }
    }

    /// Number of indexed amenities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no amenities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Finds the nearest amenity under Euclidean distance on raw degrees and
    /// reports its exact haversine distance.
    ///
    /// Returns `None` for an empty index.
    #[must_use]
    pub fn nearest(&self, lon: f64, lat: f64) -> Option<NearestAmenity> {
        let entry = self.tree.nearest_neighbor(&[lon, lat])?;
        let [amenity_lon, amenity_lat] = *entry.geom();

        Some(NearestAmenity {
            id: self.ids[entry.data].clone(),
            distance_m: haversine_m(lon, lat, amenity_lon, amenity_lat),
        })
    }

    /// All amenity positions within `radius_deg` degrees (Euclidean, raw
    /// degrees) of the query point. This is the approximate candidate set
    /// and must be filtered by exact distance before use.
    #[must_use]
    pub fn candidates_within_degrees(&self, lon: f64, lat: f64, radius_deg: f64) -> Vec<[f64; 2]> {
        self.tree
            .locate_within_distance([lon, lat], radius_deg * radius_deg)
            .map(|entry| *entry.geom())
            .collect()
    }

    /// Counts amenities whose haversine distance is within `ring`.
    #[must_use]
    pub fn count_within(&self, lon: f64, lat: f64, ring: Ring) -> u32 {
        let candidates = self.candidates_within_degrees(lon, lat, ring.candidate_degrees());
        count_in_ring(lon, lat, &candidates, ring)
    }

    /// Computes the nearest distance and all ring counts for one property.
    ///
    /// The nearest distance is the smaller of the Euclidean-nearest
    /// amenity's haversine distance and the closest outer-ring candidate,
    /// so it never exceeds the distance of an amenity that was counted.
    #[must_use]
    pub fn features_at(&self, lon: f64, lat: f64) -> AmenityFeatures {
        let mut features = AmenityFeatures::default();

        let Some(nearest) = self.nearest(lon, lat) else {
            return features;
        };

        let outer = Ring::outermost();
        let candidates = self.candidates_within_degrees(lon, lat, outer.candidate_degrees());
        let distances: Vec<f64> = candidates
            .iter()
            .map(|&[c_lon, c_lat]| haversine_m(lon, lat, c_lon, c_lat))
            .collect();

        let closest_candidate = distances.iter().copied().fold(f64::INFINITY, f64::min);
        features.nearest_m = Some(nearest.distance_m.min(closest_candidate));

        for ring in Ring::ALL {
            let count = if ring == outer {
                count_distances(&distances, ring)
            } else {
                self.count_within(lon, lat, ring)
            };
            features.set_count(ring, count);
        }

        features
    }
}

/// Exact haversine filter over an approximate candidate set.
fn count_in_ring(lon: f64, lat: f64, candidates: &[[f64; 2]], ring: Ring) -> u32 {
    let distances: Vec<f64> = candidates
        .iter()
        .map(|&[c_lon, c_lat]| haversine_m(lon, lat, c_lon, c_lat))
        .collect();
    count_distances(&distances, ring)
}

fn count_distances(distances: &[f64], ring: Ring) -> u32 {
    let count = distances.iter().filter(|&&d| d <= ring.meters()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

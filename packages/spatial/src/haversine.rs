//! Great-circle distance on a spherical Earth.

use geo::Point;

/// Mean Earth radius in meters used for all distance features.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two `(longitude, latitude)` pairs
/// in decimal degrees.
///
/// NaN inputs yield NaN.
#[must_use]
pub fn haversine_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// [`haversine_m`] over [`geo::Point`]s (x = longitude, y = latitude).
#[must_use]
pub fn haversine_points(a: Point<f64>, b: Point<f64>) -> f64 {
    haversine_m(a.x(), a.y(), b.x(), b.y())
}

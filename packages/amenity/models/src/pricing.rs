//! Price-per-area metrics (PSM / PSF).

/// Square feet in one square meter.
pub const SQFT_PER_SQM: f64 = 10.7639;

/// Price per square meter.
///
/// Returns `None` when the area is not strictly positive or either input
/// is not finite.
#[must_use]
pub fn price_per_sqm(price: f64, floor_area_sqm: f64) -> Option<f64> {
    if !price.is_finite() || !floor_area_sqm.is_finite() || floor_area_sqm <= 0.0 {
        return None;
    }
    Some(price / floor_area_sqm)
}

/// Price per square foot, given a floor area in square meters.
#[must_use]
pub fn price_per_sqft(price: f64, floor_area_sqm: f64) -> Option<f64> {
    price_per_sqm(price, floor_area_sqm).map(|psm| psm / SQFT_PER_SQM)
}

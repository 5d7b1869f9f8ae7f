//! Feature assembly configuration.
//!
//! The default configuration is embedded from `config/features.toml`. A
//! user-supplied TOML file may override any subset of it; omitted fields
//! fall back to the same defaults.

use std::path::Path;

use serde::Deserialize;
use sg_housing_amenity_models::AmenityKind;

use crate::FeatureError;

/// Embedded default configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/features.toml");

/// Top-level configuration for the feature assembly step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeatureConfig {
    /// Amenity kinds to compute, in output column order.
    #[serde(default = "AmenityKind::all")]
    pub kinds: Vec<AmenityKind>,
    /// Column names in the property table.
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Names of the property table columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnConfig {
    /// Row identifier. Row numbers are used when the column is absent.
    #[serde(default = "default_id")]
    pub id: String,
    /// Latitude column. Falls back to [`LATITUDE_ALIASES`].
    #[serde(default = "default_latitude")]
    pub latitude: String,
    /// Longitude column. Falls back to [`LONGITUDE_ALIASES`].
    #[serde(default = "default_longitude")]
    pub longitude: String,
    /// Transaction price column, used for PSF aggregation.
    #[serde(default = "default_price")]
    pub price: String,
    /// Floor area column in square meters, used for PSF aggregation.
    #[serde(default = "default_floor_area")]
    pub floor_area: String,
}

/// Alternative latitude column names accepted when the configured one is
/// missing.
pub const LATITUDE_ALIASES: &[&str] = &["latitude", "lat"];

/// Alternative longitude column names accepted when the configured one is
/// missing.
pub const LONGITUDE_ALIASES: &[&str] = &["longitude", "lon", "lng"];

fn default_id() -> String {
    "id".to_string()
}

fn default_latitude() -> String {
    "latitude".to_string()
}

fn default_longitude() -> String {
    "longitude".to_string()
}

fn default_price() -> String {
    "resale_price".to_string()
}

fn default_floor_area() -> String {
    "floor_area_sqm".to_string()
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            id: default_id(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            price: default_price(),
            floor_area: default_floor_area(),
        }
    }
}

impl FeatureConfig {
    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Config`] if the TOML is malformed or names
    /// an unknown amenity kind.
    pub fn from_toml(toml_str: &str) -> Result<Self, FeatureError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Loads the configuration from `path`, or the embedded default when
    /// no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, FeatureError> {
        let Some(path) = path else {
            return Self::from_toml(DEFAULT_CONFIG_TOML);
        };

        log::info!("Loading feature config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_parses() {
        let config = FeatureConfig::load(None).unwrap();
        assert_eq!(config.kinds, AmenityKind::all());
        assert_eq!(config.columns, ColumnConfig::default());
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config = FeatureConfig::from_toml(
            r#"
            kinds = ["mrt", "hawker"]

            [columns]
            latitude = "lat_wgs84"
            "#,
        )
        .unwrap();

        assert_eq!(config.kinds, vec![AmenityKind::Mrt, AmenityKind::Hawker]);
        assert_eq!(config.columns.latitude, "lat_wgs84");
        assert_eq!(config.columns.longitude, "longitude");
        assert_eq!(config.columns.id, "id");
    }

    #[test]
    fn empty_config_uses_all_kinds() {
        let config = FeatureConfig::from_toml("").unwrap();
        assert_eq!(config.kinds.len(), AmenityKind::all().len());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(FeatureConfig::from_toml(r#"kinds = ["casino"]"#).is_err());
    }
}

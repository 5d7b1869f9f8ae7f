//! `OneMap` search API client.
//!
//! See <https://www.onemap.gov.sg/apidocs/search>. The search endpoint
//! accepts free-text addresses, building names and postal codes, and
//! returns paged results with WGS84 coordinates encoded as strings.

use serde::Deserialize;

use crate::GeocodeError;
use crate::GeocodedAddress;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    found: u64,
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct SearchResult {
    latitude: String,
    longitude: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    postal: Option<String>,
    #[serde(default)]
    building: Option<String>,
}

/// Query parameters for a single search request.
#[must_use]
pub fn search_params(query: &str) -> [(&str, &str); 4] {
    [
        ("searchVal", query),
        ("returnGeom", "Y"),
        ("getAddrDetails", "Y"),
        ("pageNum", "1"),
    ]
}

/// `OneMap` fills absent fields with the literal `"NIL"`.
fn non_nil(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != "NIL")
}

/// Parses a search response; the first result wins.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] if the body does not have the expected
/// shape or the coordinates are not numbers.
pub fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let response: SearchResponse =
        serde_json::from_value(body.clone()).map_err(|e| GeocodeError::Parse {
            message: format!("Unexpected OneMap response: {e}"),
        })?;

    if response.found == 0 {
        return Ok(None);
    }
    let Some(first) = response.results.into_iter().next() else {
        return Ok(None);
    };

    let parse_coord = |value: &str, name: &str| {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GeocodeError::Parse {
                message: format!("Invalid {name} in OneMap response: {value:?}"),
            })
    };

    Ok(Some(GeocodedAddress {
        latitude: parse_coord(&first.latitude, "LATITUDE")?,
        longitude: parse_coord(&first.longitude, "LONGITUDE")?,
        matched_address: non_nil(first.address),
        postal: non_nil(first.postal),
        building: non_nil(first.building),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_result() {
        let body = serde_json::json!({
            "found": 2,
            "totalNumPages": 1,
            "pageNum": 1,
            "results": [
                {
                    "SEARCHVAL": "406 ANG MO KIO AVENUE 10",
                    "BLK_NO": "406",
                    "ROAD_NAME": "ANG MO KIO AVENUE 10",
                    "BUILDING": "NIL",
                    "ADDRESS": "406 ANG MO KIO AVENUE 10 SINGAPORE 560406",
                    "POSTAL": "560406",
                    "X": "30314.7936118357",
                    "Y": "39590.5558541268",
                    "LATITUDE": "1.36200453938712",
                    "LONGITUDE": "103.853879910407"
                },
                {
                    "LATITUDE": "1.0",
                    "LONGITUDE": "103.0"
                }
            ]
        });

        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 1.362_004_539).abs() < 1e-6);
        assert!((result.longitude - 103.853_879_91).abs() < 1e-6);
        assert_eq!(result.postal.as_deref(), Some("560406"));
        assert!(result.building.is_none());
        assert_eq!(
            result.matched_address.as_deref(),
            Some("406 ANG MO KIO AVENUE 10 SINGAPORE 560406")
        );
    }

    #[test]
    fn no_results_is_none() {
        let body = serde_json::json!({"found": 0, "totalNumPages": 0, "pageNum": 1, "results": []});
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn bad_coordinates_are_parse_errors() {
        let body = serde_json::json!({
            "found": 1,
            "results": [{"LATITUDE": "", "LONGITUDE": "103.8"}]
        });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn unexpected_shape_is_parse_error() {
        let body = serde_json::json!({"error": "Invalid token"});
        // Missing `found`/`results` defaults to no match.
        assert!(parse_response(&body).unwrap().is_none());

        let body = serde_json::json!([1, 2, 3]);
        assert!(parse_response(&body).is_err());
    }
}

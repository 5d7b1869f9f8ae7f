//! Address cleaning for Singapore property records.
//!
//! Transaction datasets describe locations in several ways:
//! - HDB block + street: `"BLK 406 ANG MO KIO AVE 10"`
//! - Abbreviated street names: `"C'WEALTH CRES"`, `"JLN BT MERAH"`
//! - Bare postal codes: `"560406"`
//!
//! `OneMap` matches full street names far more reliably than the
//! abbreviations used in HDB resale data, so abbreviations are expanded
//! before querying.

use std::sync::LazyLock;

use regex::Regex;

/// Leading "BLK"/"BLOCK" keyword before an HDB block number.
static BLOCK_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:BLK|BLOCK)\.?(?:\s+|$)").expect("valid regex"));

/// A six-digit Singapore postal code, optionally prefixed with "S" or
/// "SINGAPORE".
static POSTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:SINGAPORE\s*|S\s*)?\(?(\d{6})\)?$").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Street-name abbreviations used in HDB resale data.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("AVE", "AVENUE"),
    ("BT", "BUKIT"),
    ("C'WEALTH", "COMMONWEALTH"),
    ("CL", "CLOSE"),
    ("CRES", "CRESCENT"),
    ("CTRL", "CENTRAL"),
    ("CTR", "CENTRE"),
    ("DR", "DRIVE"),
    ("GDNS", "GARDENS"),
    ("HTS", "HEIGHTS"),
    ("JLN", "JALAN"),
    ("KG", "KAMPONG"),
    ("LOR", "LORONG"),
    ("MKT", "MARKET"),
    ("NTH", "NORTH"),
    ("PK", "PARK"),
    ("PL", "PLACE"),
    ("RD", "ROAD"),
    ("ST", "STREET"),
    ("STH", "SOUTH"),
    ("TER", "TERRACE"),
    ("TG", "TANJONG"),
    ("UPP", "UPPER"),
];

/// Non-geocodable placeholder values.
static SKIP_PATTERNS: &[&str] = &["NIL", "N/A", "NA", "NONE", "UNKNOWN", "-"];

/// Result of cleaning an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanedAddress {
    /// A six-digit postal code.
    Postal(String),
    /// A free-text street query.
    Street(String),
    /// Empty or placeholder input.
    NotGeocodable,
}

impl CleanedAddress {
    /// The search string to send, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Postal(q) | Self::Street(q) => Some(q),
            Self::NotGeocodable => None,
        }
    }
}

/// Cleans a raw address string for `OneMap` search.
#[must_use]
pub fn clean_address(raw: &str) -> CleanedAddress {
    let addr = WHITESPACE_RE
        .replace_all(raw.trim(), " ")
        .to_uppercase();

    if addr.is_empty() || SKIP_PATTERNS.contains(&addr.as_str()) {
        return CleanedAddress::NotGeocodable;
    }

    if let Some(caps) = POSTAL_RE.captures(&addr) {
        return CleanedAddress::Postal(caps[1].to_string());
    }

    let addr = BLOCK_PREFIX_RE.replace(&addr, "");
    let expanded: Vec<&str> = addr
        .split(' ')
        .map(|word| {
            ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == word)
                .map_or(word, |(_, full)| *full)
        })
        .collect();

    let query = expanded.join(" ");
    if query.is_empty() {
        return CleanedAddress::NotGeocodable;
    }

    CleanedAddress::Street(query)
}

/// Joins an HDB block number and street name into one address line.
#[must_use]
pub fn hdb_address(block: &str, street_name: &str) -> String {
    format!("{} {}", block.trim(), street_name.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_block_prefix_and_expands_abbreviations() {
        assert_eq!(
            clean_address("BLK 406 ANG MO KIO AVE 10"),
            CleanedAddress::Street("406 ANG MO KIO AVENUE 10".to_string())
        );
    }

    #[test]
    fn expands_multiple_abbreviations() {
        assert_eq!(
            clean_address("  91  c'wealth   dr "),
            CleanedAddress::Street("91 COMMONWEALTH DRIVE".to_string())
        );
        assert_eq!(
            clean_address("JLN BT MERAH"),
            CleanedAddress::Street("JALAN BUKIT MERAH".to_string())
        );
    }

    #[test]
    fn leaves_words_containing_abbreviations_alone() {
        assert_eq!(
            clean_address("10 STIRLING RD"),
            CleanedAddress::Street("10 STIRLING ROAD".to_string())
        );
    }

    #[test]
    fn detects_postal_codes() {
        assert_eq!(
            clean_address("560406"),
            CleanedAddress::Postal("560406".to_string())
        );
        assert_eq!(
            clean_address("Singapore 560406"),
            CleanedAddress::Postal("560406".to_string())
        );
        assert_eq!(
            clean_address("S(560406)"),
            CleanedAddress::Postal("560406".to_string())
        );
    }

    #[test]
    fn skips_placeholders() {
        assert_eq!(clean_address(""), CleanedAddress::NotGeocodable);
        assert_eq!(clean_address("nil"), CleanedAddress::NotGeocodable);
        assert_eq!(clean_address("BLK "), CleanedAddress::NotGeocodable);
        assert!(CleanedAddress::NotGeocodable.query().is_none());
    }

    #[test]
    fn builds_hdb_address() {
        assert_eq!(
            hdb_address(" 406 ", "ANG MO KIO AVE 10"),
            "406 ANG MO KIO AVE 10"
        );
    }
}

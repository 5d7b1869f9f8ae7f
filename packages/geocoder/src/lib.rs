#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for Singapore property addresses.
//!
//! Converts address strings (HDB block + street, building names, postal
//! codes) to WGS84 coordinates using the `OneMap` search API. Batches are
//! fanned out over a bounded number of concurrent requests, each preceded
//! by a fixed politeness delay, and every request retries transient
//! failures with exponential backoff.
//!
//! Configuration, including the optional API token, is passed in
//! explicitly through [`OneMapConfig`].

pub mod address;
pub mod onemap;
pub mod retry;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt as _};
use serde::Deserialize;
use sg_housing_progress::ProgressCallback;
use thiserror::Error;

use crate::address::clean_address;
use crate::retry::RetryPolicy;

/// Embedded default `OneMap` configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/onemap.toml");

/// A geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Full address of the matched result.
    pub matched_address: Option<String>,
    /// Six-digit postal code of the matched result.
    pub postal: Option<String>,
    /// Building name of the matched result.
    pub building: Option<String>,
}

/// An address to be geocoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInput {
    /// Identifier for correlating results back to the source record.
    pub id: String,
    /// Raw address text.
    pub address: String,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("HTTP status {status}")]
    Status {
        /// Status code.
        status: u16,
    },

    /// Response body was not JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error (config file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// `OneMap` client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OneMapConfig {
    /// Search endpoint URL.
    pub base_url: String,
    /// API access token, sent as the `Authorization` header when present.
    #[serde(default)]
    pub token: Option<String>,
    /// Number of in-flight requests during batch geocoding.
    #[serde(default = "default_concurrent")]
    pub concurrent_requests: usize,
    /// Fixed delay before every request, in milliseconds.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry attempts for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_concurrent() -> usize {
    4
}

const fn default_rate_limit_ms() -> u64 {
    250
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    5
}

impl OneMapConfig {
    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> Result<Self, GeocodeError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Loads the configuration from `path`, or the embedded default when
    /// no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, GeocodeError> {
        match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?),
            None => Self::from_toml(DEFAULT_CONFIG_TOML),
        }
    }

    /// Sets the API token.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Retry policy derived from `max_retries`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }
}

/// Outcome of a batch geocoding run.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Successfully geocoded addresses, keyed by input id.
    pub matched: Vec<(String, GeocodedAddress)>,
    /// IDs of addresses with no match or no geocodable text.
    pub unmatched: Vec<String>,
    /// IDs of addresses whose requests failed, with the error message.
    pub failed: Vec<(String, String)>,
}

/// `OneMap` search client.
pub struct OneMapClient {
    client: reqwest::Client,
    config: OneMapConfig,
}

impl OneMapClient {
    /// Builds a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: OneMapConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &OneMapConfig {
        &self.config
    }

    /// Geocodes one search string. Returns `Ok(None)` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails after all retries or
    /// the response cannot be parsed.
    pub async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let params = onemap::search_params(query);
        let body = retry::send_json(
            || {
                let request = self.client.get(&self.config.base_url).query(&params);
                match &self.config.token {
                    Some(token) => request.header(reqwest::header::AUTHORIZATION, token),
                    None => request,
                }
            },
            self.config.retry_policy(),
        )
        .await?;

        onemap::parse_response(&body)
    }

    /// Cleans and geocodes one address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails after all retries.
    pub async fn geocode_address(
        &self,
        raw: &str,
    ) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let cleaned = clean_address(raw);
        let Some(query) = cleaned.query() else {
            log::debug!("Not geocodable: '{raw}'");
            return Ok(None);
        };
        self.geocode(query).await
    }

    /// Geocodes a batch of addresses with bounded concurrency.
    ///
    /// Each request waits `rate_limit_ms` before being sent. Failures are
    /// collected in [`BatchResult::failed`] and never abort the batch.
    pub async fn geocode_batch(
        &self,
        inputs: &[AddressInput],
        progress: &Arc<dyn ProgressCallback>,
    ) -> BatchResult {
        let concurrency = self.config.concurrent_requests.max(1);
        let delay = Duration::from_millis(self.config.rate_limit_ms);

        log::info!(
            "Geocoding {} addresses via OneMap (concurrency={concurrency}, delay={delay:?})...",
            inputs.len()
        );
        progress.set_total(inputs.len() as u64);

        let outcomes: Vec<_> = stream::iter(inputs.iter().map(|input| async move {
            tokio::time::sleep(delay).await;
            let result = self.geocode_address(&input.address).await;
            progress.inc(1);
            (input.id.clone(), result)
        }))
        .buffer_unordered(concurrency)
        .collect()
        .await;

        let mut batch = BatchResult::default();
        for (id, result) in outcomes {
            match result {
                Ok(Some(geocoded)) => batch.matched.push((id, geocoded)),
                Ok(None) => batch.unmatched.push(id),
                Err(e) => {
                    log::warn!("OneMap error for '{id}': {e}");
                    batch.failed.push((id, e.to_string()));
                }
            }
        }

        log::info!(
            "Geocoded {} matched, {} unmatched, {} failed",
            batch.matched.len(),
            batch.unmatched.len(),
            batch.failed.len()
        );
        progress.finish(format!("Geocoded {}/{}", batch.matched.len(), inputs.len()));

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_housing_progress::null_progress;

    #[test]
    fn embedded_config_parses() {
        let config = OneMapConfig::load(None).unwrap();
        assert!(config.base_url.starts_with("https://"));
        assert!(config.token.is_none());
        assert_eq!(config.concurrent_requests, 4);
        assert_eq!(config.retry_policy().max_retries, config.max_retries);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = OneMapConfig::from_toml(r#"base_url = "http://localhost:9""#).unwrap();
        assert_eq!(config.rate_limit_ms, 250);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = OneMapConfig::load(None)
            .unwrap()
            .with_token(Some("  ".to_string()));
        assert!(config.token.is_none());

        let config = config.with_token(Some("abc".to_string()));
        assert_eq!(config.token.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn batch_skips_non_geocodable_inputs_without_network() {
        let config = OneMapConfig {
            rate_limit_ms: 0,
            ..OneMapConfig::from_toml(r#"base_url = "http://127.0.0.1:9/search""#).unwrap()
        };
        let client = OneMapClient::new(config).unwrap();
        let inputs = vec![
            AddressInput {
                id: "a".to_string(),
                address: "NIL".to_string(),
            },
            AddressInput {
                id: "b".to_string(),
                address: "   ".to_string(),
            },
        ];

        let batch = client.geocode_batch(&inputs, &null_progress()).await;
        assert!(batch.matched.is_empty());
        assert!(batch.failed.is_empty());
        let mut unmatched = batch.unmatched;
        unmatched.sort();
        assert_eq!(unmatched, ["a", "b"]);
    }
}

//! Geo resolution of client addresses
//!
//! Resolution is best effort. Every failure collapses to the
//! [`UNKNOWN_COUNTRY`] sentinel at the call site via [`resolve_or_unknown`];
//! a lookup problem never fails or blocks the request that triggered it
//! beyond the lookup timeout.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

pub mod cache;

pub use cache::CachedResolver;

/// Country recorded when resolution fails or yields nothing
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// Geo lookup failures
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Failed to fetch geo data: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Geo API returned unexpected status: {0}")]
    Status(u16),

    #[error("Failed to parse geo data: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Invalid geo lookup URL: {0}")]
    Url(String),
}

/// Resolves a client address to a country code
#[async_trait]
pub trait CountryResolver: Send + Sync {
    /// Returns the country code, [`UNKNOWN_COUNTRY`] for an empty answer,
    /// or an error for any transport or decoding failure.
    async fn resolve(&self, address: &str) -> Result<String, GeoError>;
}

/// Outcome of a best-effort resolution
#[derive(Debug)]
pub struct Resolution {
    pub country: String,
    /// Set when the sentinel was substituted because of a failure
    pub error: Option<GeoError>,
}

impl Resolution {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Resolve and substitute the sentinel on failure
pub async fn resolve_or_unknown(resolver: &dyn CountryResolver, address: &str) -> Resolution {
    match resolver.resolve(address).await {
        Ok(country) => Resolution {
            country,
            error: None,
        },
        Err(error) => Resolution {
            country: UNKNOWN_COUNTRY.to_string(),
            error: Some(error),
        },
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    country: String,
}

/// Resolver backed by an ipinfo-style HTTP API: `GET {base}/{ip}/json`
#[derive(Clone)]
pub struct HttpGeoResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeoResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GeoError::Request)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn lookup_url(&self, address: &str) -> Result<url::Url, GeoError> {
        let mut url =
            url::Url::parse(&self.base_url).map_err(|e| GeoError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| GeoError::Url(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push(address)
            .push("json");
        Ok(url)
    }
}

#[async_trait]
impl CountryResolver for HttpGeoResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, address: &str) -> Result<String, GeoError> {
        let url = self.lookup_url(address)?;

        let response = self.client.get(url).send().await.map_err(GeoError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let body: GeoResponse = response.json().await.map_err(GeoError::Decode)?;
        let country = body.country.trim();

        if country.is_empty() {
            debug!("Geo API returned an empty country");
            return Ok(UNKNOWN_COUNTRY.to_string());
        }

        Ok(country.to_string())
    }
}

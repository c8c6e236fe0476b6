use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::database::models::Coordinates;

#[derive(Debug, Clone, Error)]
pub enum GeocodeError {
    #[error("no location found for address '{0}'")]
    NoMatch(String),

    #[error("geocoding is not configured")]
    NotConfigured,

    #[error("geocoding upstream failure: {0}")]
    Upstream(String),
}

/// Address to coordinates lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

/// Google Geocoding API client
pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleGeocoder {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Upstream("request timed out".to_string())
                } else {
                    GeocodeError::Upstream(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(GeocodeError::Upstream(format!("HTTP {}", response.status())));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Upstream(format!("unreadable response: {}", e)))?;

        body.into_coordinates(address)
    }
}

/// Stand-in used when no API key is configured
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Coordinates, GeocodeError> {
        Err(GeocodeError::NotConfigured)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinates,
}

impl GeocodeResponse {
    fn into_coordinates(self, address: &str) -> Result<Coordinates, GeocodeError> {
        match self.status.as_str() {
            "OK" => self
                .results
                .into_iter()
                .next()
                .map(|r| r.geometry.location)
                .ok_or_else(|| GeocodeError::NoMatch(address.to_string())),
            "ZERO_RESULTS" => Err(GeocodeError::NoMatch(address.to_string())),
            other => Err(GeocodeError::Upstream(match self.error_message {
                Some(msg) => format!("{}: {}", other, msg),
                None => other.to_string(),
            })),
        }
    }
}

//! Nominatim (OpenStreetMap) geocoder.

use std::time::Duration;

use async_trait::async_trait;
use nakshatra_core::chart::{GeoLocation, Geocoder};
use nakshatra_core::error::ChartError;
use serde::Deserialize;
use tracing::debug;

/// Resolves place names through a Nominatim-compatible `/search` endpoint.
///
/// Nominatim's usage policy requires an identifying `User-Agent`.
pub struct NominatimGeocoder {
    base_url: String,
    user_agent: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChartError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChartError::Geocoding(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            client,
        })
    }
}

fn coordinate(raw: &str, place: &str) -> Result<f64, ChartError> {
    raw.trim()
        .parse()
        .map_err(|_| ChartError::Geocoding(format!("non-numeric coordinate '{raw}' for {place}")))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn locate(&self, place: &str) -> Result<GeoLocation, ChartError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| ChartError::Geocoding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChartError::Geocoding(format!("geocoder returned {status}: {body}")));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|e| ChartError::Geocoding(format!("unexpected geocoder response: {e}")))?;
        let first = places
            .into_iter()
            .next()
            .ok_or_else(|| ChartError::PlaceNotFound(place.to_string()))?;

        let location = GeoLocation {
            latitude: coordinate(&first.lat, place)?,
            longitude: coordinate(&first.lon, place)?,
        };
        debug!(place, lat = location.latitude, lon = location.longitude, "Geocoded birth place");
        Ok(location)
    }
}

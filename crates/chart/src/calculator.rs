//! HTTP client for the external chart calculation service.
//!
//! Contract: `POST {service_url}/chart` with a [`ChartRequest`] body returns
//! a [`ChartComputation`]. A 4xx answer means the service rejected the birth
//! data; anything else unsuccessful is a service failure.

use std::time::Duration;

use async_trait::async_trait;
use nakshatra_core::chart::{ChartCalculator, ChartComputation, ChartRequest};
use nakshatra_core::error::ChartError;
use tracing::debug;

pub struct HttpChartCalculator {
    service_url: String,
    client: reqwest::Client,
}

impl HttpChartCalculator {
    pub fn new(service_url: impl Into<String>, timeout: Duration) -> Result<Self, ChartError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChartError::Service(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            service_url: service_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl ChartCalculator for HttpChartCalculator {
    fn name(&self) -> &str {
        "http"
    }

    async fn compute(&self, request: &ChartRequest) -> Result<ChartComputation, ChartError> {
        debug!(
            name = %request.name,
            lat = request.latitude,
            lon = request.longitude,
            ayanamsa = %request.ayanamsa,
            "Requesting chart computation"
        );

        let response = self
            .client
            .post(format!("{}/chart", self.service_url))
            .json(request)
            .send()
            .await
            .map_err(|e| ChartError::Service(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChartError::InvalidBirthData(format!("chart service returned {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChartError::Service(format!("chart service returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ChartError::Service(format!("malformed chart response: {e}")))
    }

    async fn health_check(&self) -> Result<bool, ChartError> {
        let response = self
            .client
            .get(format!("{}/health", self.service_url))
            .send()
            .await
            .map_err(|e| ChartError::Service(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

//! Birth chart resolution for Nakshatra.
//!
//! - [`NominatimGeocoder`]: birth place to coordinates
//! - [`HttpChartCalculator`]: the external sidereal chart service
//! - [`ChartResolver`]: profile validation, geocoding and chart assembly

pub mod calculator;
pub mod geocode;
pub mod resolver;

pub use calculator::HttpChartCalculator;
pub use geocode::NominatimGeocoder;
pub use resolver::ChartResolver;

use std::sync::Arc;
use std::time::Duration;

use nakshatra_config::AppConfig;
use nakshatra_core::ChartError;

/// Build a resolver wired to the configured geocoder and chart service.
pub fn build_from_config(config: &AppConfig) -> Result<ChartResolver, ChartError> {
    let chart = &config.chart;
    let timeout = Duration::from_secs(chart.timeout_secs);

    let geocoder = NominatimGeocoder::new(&chart.geocoder_url, &chart.user_agent, timeout)?;
    let calculator = HttpChartCalculator::new(&chart.service_url, timeout)?;

    tracing::debug!(
        geocoder = %chart.geocoder_url,
        service = %chart.service_url,
        "Configured chart resolver"
    );

    Ok(ChartResolver::new(Arc::new(geocoder), Arc::new(calculator))
        .with_settings(&chart.ayanamsa, &chart.house_system)
        .with_utc_offset(chart.utc_offset.clone()))
}

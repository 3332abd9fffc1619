//! Birth chart (kundali) types and the collaborators that produce them.
//!
//! The chart is computed once per session by an external calculation service
//! after the birth place has been geocoded. Everything here is read-only
//! once built. Field aliases accept the key names emitted by common Vedic
//! chart libraries (`rasi`, `house_nr`, `P1`, ...).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ChartError;
use crate::vocabulary::{Nakshatra, ZodiacSign};

/// Coordinates returned by a geocoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthDetails {
    pub birth_date: String,
    pub birth_time: String,
    pub birth_place: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    #[serde(default)]
    pub second: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDetails {
    pub latitude: f64,
    pub longitude: f64,
    /// `+HH:MM` or `-HH:MM`
    pub utc_offset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSettings {
    pub ayanamsa: String,
    pub house_system: String,
}

/// Placement of one of the key points (sun, moon, ascendant).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanetaryPosition {
    #[serde(default)]
    pub sign: Option<String>,
    #[serde(default)]
    pub nakshatra: Option<String>,
    #[serde(default)]
    pub nakshatra_pada: Option<u8>,
    #[serde(default)]
    pub nakshatra_lord: Option<String>,
    #[serde(default)]
    pub rasi_lord: Option<String>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl PlanetaryPosition {
    pub fn zodiac(&self) -> Option<ZodiacSign> {
        self.sign.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn lunar_mansion(&self) -> Option<Nakshatra> {
        self.nakshatra.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyPositions {
    pub sun: PlanetaryPosition,
    pub moon: PlanetaryPosition,
    pub ascendant: PlanetaryPosition,
    #[serde(default)]
    pub lagna_lord: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetPlacement {
    #[serde(alias = "object")]
    pub name: String,
    #[serde(alias = "rasi")]
    pub sign: String,
    #[serde(default, alias = "house_nr")]
    pub house: Option<u8>,
    #[serde(default)]
    pub nakshatra: Option<String>,
    #[serde(default)]
    pub nakshatra_lord: Option<String>,
    #[serde(default)]
    pub rasi_lord: Option<String>,
    #[serde(default)]
    pub is_retrograde: Option<bool>,
    #[serde(default, alias = "longitude_dec_deg")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseCusp {
    #[serde(alias = "house_nr")]
    pub number: u8,
    #[serde(alias = "rasi")]
    pub sign: String,
    #[serde(default, alias = "longitude_dec_deg")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub nakshatra: Option<String>,
    #[serde(default)]
    pub rasi_lord: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetaryAspect {
    #[serde(alias = "P1")]
    pub first: String,
    #[serde(alias = "P2")]
    pub second: String,
    #[serde(alias = "AspectType")]
    pub kind: String,
    #[serde(alias = "AspectDeg")]
    pub degrees: u16,
    #[serde(default, alias = "AspectOrb")]
    pub orb: f64,
}

/// A sub-period inside a mahadasha.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BhuktiPeriod {
    pub lord: String,
    pub start: String,
    pub end: String,
}

/// A Vimshottari mahadasha with its bhuktis, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashaPeriod {
    pub lord: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub bhuktis: Vec<BhuktiPeriod>,
}

/// The full kundali of one person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    pub user_name: String,
    pub birth_details: BirthDetails,
    pub location: LocationDetails,
    pub chart_settings: ChartSettings,
    pub key_positions: KeyPositions,
    pub planets: Vec<PlanetPlacement>,
    pub houses: Vec<HouseCusp>,
    #[serde(default, alias = "planetary_aspects")]
    pub aspects: Vec<PlanetaryAspect>,
    #[serde(default, alias = "vimshottari_dasa")]
    pub dasha: Vec<DashaPeriod>,
}

/// The mahadasha (and bhukti, when one matches) running on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentDasha {
    pub dasha: String,
    pub dasha_start: String,
    pub dasha_end: String,
    pub bhukti: Option<BhuktiPeriod>,
}

impl CurrentDasha {
    pub fn describe(&self) -> String {
        let mut out = format!(
            "{} mahadasha ({} to {})",
            self.dasha, self.dasha_start, self.dasha_end
        );
        if let Some(bhukti) = &self.bhukti {
            out.push_str(&format!(", {} bhukti ({} to {})", bhukti.lord, bhukti.start, bhukti.end));
        }
        out
    }
}

/// Parse a dasha boundary date. Chart libraries emit `DD-MM-YYYY`; ISO dates are accepted too.
pub fn parse_period_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

fn contains(start: &str, end: &str, day: NaiveDate) -> bool {
    match (parse_period_date(start), parse_period_date(end)) {
        (Some(start), Some(end)) => start <= day && day <= end,
        _ => {
            tracing::debug!(start, end, "Skipping period with unparseable dates");
            false
        }
    }
}

impl ChartSummary {
    pub fn sun_sign(&self) -> Option<ZodiacSign> {
        self.key_positions.sun.zodiac()
    }

    pub fn moon_sign(&self) -> Option<ZodiacSign> {
        self.key_positions.moon.zodiac()
    }

    pub fn ascendant_sign(&self) -> Option<ZodiacSign> {
        self.key_positions.ascendant.zodiac()
    }

    /// Sun, moon and ascendant signs, deduplicated, in that order.
    pub fn native_signs(&self) -> Vec<ZodiacSign> {
        let mut signs = Vec::with_capacity(3);
        for sign in [self.sun_sign(), self.moon_sign(), self.ascendant_sign()].into_iter().flatten() {
            if !signs.contains(&sign) {
                signs.push(sign);
            }
        }
        signs
    }

    /// The dasha period containing `day`, with the bhukti containing it if any.
    pub fn current_dasha(&self, day: NaiveDate) -> Option<CurrentDasha> {
        let period = self.dasha.iter().find(|p| contains(&p.start, &p.end, day))?;
        let bhukti = period
            .bhuktis
            .iter()
            .find(|b| contains(&b.start, &b.end, day))
            .cloned();
        Some(CurrentDasha {
            dasha: period.lord.clone(),
            dasha_start: period.start.clone(),
            dasha_end: period.end.clone(),
            bhukti,
        })
    }
}

/// Input to the chart calculation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Leave unset to let the service derive it from the coordinates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
    pub ayanamsa: String,
    pub house_system: String,
}

/// What the chart calculation service returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartComputation {
    /// The offset the service actually applied
    pub utc_offset: String,
    pub key_positions: KeyPositions,
    pub planets: Vec<PlanetPlacement>,
    pub houses: Vec<HouseCusp>,
    #[serde(default, alias = "planetary_aspects")]
    pub aspects: Vec<PlanetaryAspect>,
    #[serde(default, alias = "vimshottari_dasa")]
    pub dasha: Vec<DashaPeriod>,
}

/// Resolves a free-text place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &str;

    async fn locate(&self, place: &str) -> std::result::Result<GeoLocation, ChartError>;
}

/// Computes a sidereal birth chart.
#[async_trait]
pub trait ChartCalculator: Send + Sync {
    fn name(&self) -> &str;

    async fn compute(&self, request: &ChartRequest) -> std::result::Result<ChartComputation, ChartError>;

    async fn health_check(&self) -> std::result::Result<bool, ChartError> {
        Ok(true)
    }
}

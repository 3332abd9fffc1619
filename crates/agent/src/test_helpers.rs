//! Shared test helpers for pipeline stage tests.

use async_trait::async_trait;
use nakshatra_core::chart::{
    BirthDetails, ChartCalculator, ChartComputation, ChartRequest, ChartSettings, ChartSummary, GeoLocation,
    Geocoder, LocationDetails,
};
use nakshatra_core::error::{ChartError, KnowledgeError, ProviderError};
use nakshatra_core::knowledge::{
    ContextCategory, KnowledgeDocument, KnowledgePassage, KnowledgeStore, MetadataFilters, MetadataTags,
};
use nakshatra_core::message::Message;
use nakshatra_core::profile::{Language, UserProfile};
use nakshatra_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use nakshatra_core::vocabulary::{LifeArea, ZodiacSign};
use std::sync::Mutex;

pub const CHART_FIXTURE: &str = include_str!("../../../fixtures/chart_computation.json");

/// A mock provider that answers from a queue of scripted results.
///
/// Every request is recorded. Panics if more calls are made than results provided.
pub struct ScriptedProvider {
    results: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(results: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            panic!("ScriptedProvider: no more results (call #{call})");
        }
        let text = results.remove(0)?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// A knowledge store serving a fixed passage list.
///
/// With `honour_filters` off it returns everything regardless of filters,
/// like a store whose metadata index has drifted.
pub struct FixedStore {
    passages: Vec<KnowledgePassage>,
    honour_filters: bool,
    unavailable: bool,
    searches: Mutex<Vec<(String, MetadataFilters)>>,
}

impl FixedStore {
    pub fn new(passages: Vec<KnowledgePassage>) -> Self {
        Self {
            passages,
            honour_filters: true,
            unavailable: false,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn ignoring_filters(mut self) -> Self {
        self.honour_filters = false;
        self
    }

    pub fn unavailable() -> Self {
        let mut store = Self::new(Vec::new());
        store.unavailable = true;
        store
    }

    pub fn searches(&self) -> Vec<(String, MetadataFilters)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeStore for FixedStore {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(
        &self,
        query: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> Result<Vec<KnowledgePassage>, KnowledgeError> {
        self.searches.lock().unwrap().push((query.to_string(), filters.clone()));
        if self.unavailable {
            return Err(KnowledgeError::Unavailable("connection refused".into()));
        }
        Ok(self
            .passages
            .iter()
            .filter(|p| !self.honour_filters || filters.matches(&p.tags))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn upsert(&self, documents: Vec<KnowledgeDocument>) -> Result<usize, KnowledgeError> {
        Ok(documents.len())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.passages.len())
    }

    async fn reset(&self) -> Result<(), KnowledgeError> {
        Ok(())
    }
}

pub struct FixedGeocoder;

#[async_trait]
impl Geocoder for FixedGeocoder {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn locate(&self, place: &str) -> Result<GeoLocation, ChartError> {
        if place == "Atlantis" {
            return Err(ChartError::PlaceNotFound(place.into()));
        }
        Ok(GeoLocation { latitude: 18.52, longitude: 73.86 })
    }
}

/// Serves the chart fixture, or fails every call when `broken`.
pub struct FixtureCalculator {
    pub broken: bool,
}

#[async_trait]
impl ChartCalculator for FixtureCalculator {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn compute(&self, _request: &ChartRequest) -> Result<ChartComputation, ChartError> {
        if self.broken {
            return Err(ChartError::Service("chart service returned 500".into()));
        }
        serde_json::from_str(CHART_FIXTURE).map_err(|e| ChartError::Service(e.to_string()))
    }
}

pub fn profile() -> UserProfile {
    UserProfile {
        name: "Asha".into(),
        birth_date: "1992-08-17".into(),
        birth_time: "06:45".into(),
        birth_place: "Pune, India".into(),
        preferred_language: Language::English,
    }
}

/// The fixture chart: Sun in Leo, Moon in Virgo, Aries ascendant.
pub fn sample_chart() -> ChartSummary {
    let computation: ChartComputation = serde_json::from_str(CHART_FIXTURE).unwrap();
    ChartSummary {
        user_name: "Asha".into(),
        birth_details: BirthDetails {
            birth_date: "1992-08-17".into(),
            birth_time: "06:45".into(),
            birth_place: "Pune, India".into(),
            year: 1992,
            month: 8,
            day: 17,
            hour: 6,
            minute: 45,
            second: 0,
        },
        location: LocationDetails {
            latitude: 18.52,
            longitude: 73.86,
            utc_offset: computation.utc_offset,
        },
        chart_settings: ChartSettings {
            ayanamsa: "Lahiri".into(),
            house_system: "Equal".into(),
        },
        key_positions: computation.key_positions,
        planets: computation.planets,
        houses: computation.houses,
        aspects: computation.aspects,
        dasha: computation.dasha,
    }
}

pub fn passage(id: &str, text: &str, category: ContextCategory, tags: MetadataTags) -> KnowledgePassage {
    KnowledgePassage {
        id: id.into(),
        text: text.into(),
        category,
        tags,
        score: 0.9,
    }
}

/// A small mixed corpus: Leo and Virgo traits plus career guidance.
pub fn corpus() -> Vec<KnowledgePassage> {
    vec![
        passage(
            "leo-1",
            "Leo natives are generous, proud and natural leaders.",
            ContextCategory::ZodiacTraits,
            MetadataTags { zodiac: Some(ZodiacSign::Leo), ..Default::default() },
        ),
        passage(
            "virgo-1",
            "Virgo natives are analytical and precise.",
            ContextCategory::ZodiacTraits,
            MetadataTags { zodiac: Some(ZodiacSign::Virgo), ..Default::default() },
        ),
        passage(
            "career-1",
            "Saturn rewards patient, disciplined work.",
            ContextCategory::LifeGuidance,
            MetadataTags { life_area: Some(LifeArea::Career), ..Default::default() },
        ),
    ]
}

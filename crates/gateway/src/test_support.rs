//! Mock collaborators for gateway tests.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use nakshatra_agent::{Composer, Planner, Retriever, TurnPipeline};
use nakshatra_chart::ChartResolver;
use nakshatra_config::AppConfig;
use nakshatra_core::chart::{ChartCalculator, ChartComputation, ChartRequest, GeoLocation, Geocoder};
use nakshatra_core::error::{ChartError, KnowledgeError, ProviderError};
use nakshatra_core::knowledge::{
    ContextCategory, KnowledgeDocument, KnowledgePassage, KnowledgeStore, MetadataFilters, MetadataTags,
};
use nakshatra_core::message::Message;
use nakshatra_core::provider::{Provider, ProviderRequest, ProviderResponse};
use nakshatra_core::vocabulary::ZodiacSign;
use nakshatra_memory::InMemorySessionStore;

use crate::{GatewayState, SharedState};

const CHART_FIXTURE: &str = include_str!("../../../fixtures/chart_computation.json");

/// Answers planner calls with a fixed plan and chat calls with a fixed reply.
pub struct MockProvider {
    plan: String,
    reply: Result<String, String>,
}

impl MockProvider {
    pub fn new(plan: &str, reply: Result<&str, &str>) -> Self {
        Self {
            plan: plan.to_string(),
            reply: reply.map(str::to_string).map_err(str::to_string),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "gateway_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let text = if request.response_format.is_some() {
            self.plan.clone()
        } else {
            self.reply.clone().map_err(|message| ProviderError::ApiError {
                status_code: 503,
                message,
            })?
        };
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: "mock-model".into(),
        })
    }
}

struct MockGeocoder;

#[async_trait]
impl Geocoder for MockGeocoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn locate(&self, place: &str) -> Result<GeoLocation, ChartError> {
        if place == "Atlantis" {
            return Err(ChartError::PlaceNotFound(place.into()));
        }
        Ok(GeoLocation { latitude: 18.52, longitude: 73.86 })
    }
}

struct MockCalculator;

#[async_trait]
impl ChartCalculator for MockCalculator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compute(&self, _request: &ChartRequest) -> Result<ChartComputation, ChartError> {
        serde_json::from_str(CHART_FIXTURE).map_err(|e| ChartError::Service(e.to_string()))
    }
}

/// Two zodiac passages, filtered the way a real store would.
pub struct MockStore;

#[async_trait]
impl KnowledgeStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(
        &self,
        _query: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> Result<Vec<KnowledgePassage>, KnowledgeError> {
        let passages = [(ZodiacSign::Leo, "Leo natives are generous."), (ZodiacSign::Virgo, "Virgo natives are precise.")]
            .into_iter()
            .map(|(sign, text)| KnowledgePassage {
                id: sign.as_str().to_lowercase(),
                text: text.into(),
                category: ContextCategory::ZodiacTraits,
                tags: MetadataTags { zodiac: Some(sign), ..Default::default() },
                score: 0.8,
            })
            .filter(|p| filters.matches(&p.tags))
            .take(limit)
            .collect();
        Ok(passages)
    }

    async fn upsert(&self, documents: Vec<KnowledgeDocument>) -> Result<usize, KnowledgeError> {
        Ok(documents.len())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(2)
    }

    async fn reset(&self) -> Result<(), KnowledgeError> {
        Ok(())
    }
}

pub fn test_state_with(provider: MockProvider, config: AppConfig) -> SharedState {
    let provider: Arc<dyn Provider> = Arc::new(provider);
    let knowledge: Arc<dyn KnowledgeStore> = Arc::new(MockStore);
    let resolver = Arc::new(ChartResolver::new(Arc::new(MockGeocoder), Arc::new(MockCalculator)));
    let pipeline = TurnPipeline::new(
        resolver,
        Planner::new(provider.clone(), "structured"),
        Retriever::new(knowledge.clone(), 3),
        Composer::new(provider.clone(), "chat"),
        Arc::new(InMemorySessionStore::new()),
    );
    Arc::new(GatewayState {
        config,
        pipeline: Arc::new(pipeline),
        provider,
        knowledge,
        start_time: Instant::now(),
    })
}

pub fn test_state(provider: MockProvider) -> SharedState {
    test_state_with(provider, AppConfig::default())
}

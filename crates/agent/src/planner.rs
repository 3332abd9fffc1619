//! Context query planner: decides whether a turn needs the knowledge base.
//!
//! The decision is delegated to the structured-output model through a JSON
//! schema. Planning never fails a turn: any provider error or malformed
//! answer degrades to [`RetrievalDecision::Skip`].

use std::sync::Arc;

use nakshatra_config::AppConfig;
use nakshatra_core::chart::ChartSummary;
use nakshatra_core::knowledge::{ContextCategory, MetadataFilters, RetrievalQuery};
use nakshatra_core::message::{Message, Role};
use nakshatra_core::provider::{Provider, ProviderRequest, ResponseFormat};
use nakshatra_core::vocabulary::{LifeArea, Nakshatra, Planet, ZodiacSign};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::prompts;

/// What the planner decided for one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalDecision {
    Skip { reason: String },
    Retrieve(RetrievalQuery),
}

impl RetrievalDecision {
    pub fn skip(reason: impl Into<String>) -> Self {
        RetrievalDecision::Skip { reason: reason.into() }
    }

    pub fn needs_retrieval(&self) -> bool {
        matches!(self, RetrievalDecision::Retrieve(_))
    }
}

/// Trim, lower-case and collapse whitespace, for comparing user messages.
pub fn normalize_message(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the same question was asked and answered within `history`.
pub fn already_answered(message: &str, history: &[Message]) -> bool {
    let wanted = normalize_message(message);
    history.windows(2).any(|pair| {
        pair[0].role == Role::User
            && pair[1].role == Role::Assistant
            && normalize_message(&pair[0].content) == wanted
    })
}

fn enum_of(terms: Vec<&'static str>) -> Value {
    json!({ "type": "array", "items": { "type": "string", "enum": terms } })
}

/// Strict JSON schema for the planner's answer.
pub fn decision_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["needs_retrieval", "query", "filters", "reasoning"],
        "properties": {
            "needs_retrieval": { "type": "boolean" },
            "query": { "type": ["string", "null"] },
            "filters": {
                "type": "object",
                "additionalProperties": false,
                "required": ["zodiac", "planet", "life_area", "nakshatra"],
                "properties": {
                    "zodiac": enum_of(ZodiacSign::ALL.iter().map(|v| v.as_str()).collect()),
                    "planet": enum_of(Planet::ALL.iter().map(|v| v.as_str()).collect()),
                    "life_area": enum_of(LifeArea::ALL.iter().map(|v| v.as_str()).collect()),
                    "nakshatra": enum_of(Nakshatra::ALL.iter().map(|v| v.as_str()).collect()),
                }
            },
            "reasoning": { "type": ["string", "null"] }
        }
    })
}

/// Interpret the model's raw answer.
///
/// `needs_rag`, `rag_query` and `metadata_filters` are accepted as
/// synonyms of the schema's field names.
pub fn parse_decision(raw: &str) -> Result<RetrievalDecision, String> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|e| format!("unparseable JSON: {e}"))?;
    let object = value.as_object().ok_or("decision is not a JSON object")?;

    let needs_retrieval = object
        .get("needs_retrieval")
        .or_else(|| object.get("needs_rag"))
        .and_then(Value::as_bool)
        .ok_or("missing needs_retrieval")?;

    let reasoning = object.get("reasoning").and_then(Value::as_str).unwrap_or_default();
    if !needs_retrieval {
        let reason = if reasoning.is_empty() { "planner chose no retrieval" } else { reasoning };
        return Ok(RetrievalDecision::skip(reason));
    }

    let query = object
        .get("query")
        .or_else(|| object.get("rag_query"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let filters = object
        .get("filters")
        .or_else(|| object.get("metadata_filters"))
        .and_then(Value::as_object)
        .map(MetadataFilters::from_raw)
        .unwrap_or_default();

    RetrievalQuery::new(query, filters)
        .map(RetrievalDecision::Retrieve)
        .ok_or_else(|| "needs_retrieval without a query".to_string())
}

/// Keep only zodiac filters naming one of the native's own signs.
///
/// Returns the signs that were removed. An emptied zodiac category imposes
/// no restriction, so the chart can narrow the planner's choice but never
/// replace it.
pub fn restrict_to_native_signs(filters: &mut MetadataFilters, chart: &ChartSummary) -> Vec<ZodiacSign> {
    let native = chart.native_signs();
    let (kept, dropped): (Vec<_>, Vec<_>) = filters.zodiac.iter().copied().partition(|sign| native.contains(sign));
    filters.zodiac = kept;
    dropped
}

pub struct Planner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    history_turns: usize,
    excerpt_chars: usize,
}

impl Planner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            history_turns: 6,
            excerpt_chars: 200,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self {
            provider,
            model: config.llm.structured_model.clone(),
            temperature: config.llm.structured_temperature,
            history_turns: config.planner.history_turns,
            excerpt_chars: config.planner.excerpt_chars,
        }
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    /// Decide whether `message` needs retrieval.
    ///
    /// `history` is the conversation before this message; only its last
    /// `history_turns` messages are considered.
    pub async fn plan(
        &self,
        message: &str,
        chart: Option<&ChartSummary>,
        history: &[Message],
        last_context: &[ContextCategory],
    ) -> RetrievalDecision {
        let recent = &history[history.len().saturating_sub(self.history_turns)..];

        if already_answered(message, recent) {
            info!("Question already answered in recent history, skipping retrieval");
            return RetrievalDecision::skip("already answered in recent history");
        }

        let system = prompts::planner_system(chart, recent, last_context, self.excerpt_chars);
        let request = ProviderRequest::new(
            &self.model,
            vec![Message::system(system), Message::user(format!("User Question: {message}"))],
        )
        .with_temperature(self.temperature)
        .with_response_format(ResponseFormat::JsonSchema {
            name: "retrieval_plan".into(),
            schema: decision_schema(),
        });

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Planner call failed, skipping retrieval");
                return RetrievalDecision::skip("planner unavailable");
            }
        };

        match parse_decision(&response.message.content) {
            Ok(mut decision) => {
                if let (RetrievalDecision::Retrieve(query), Some(chart)) = (&mut decision, chart) {
                    let dropped = restrict_to_native_signs(query.filters_mut(), chart);
                    if !dropped.is_empty() {
                        warn!(
                            dropped = ?dropped,
                            native = ?chart.native_signs(),
                            "Dropping zodiac filters outside the native's signs"
                        );
                    }
                }
                match &decision {
                    RetrievalDecision::Retrieve(query) => debug!(
                        query = query.text(),
                        filters = ?query.filters().labels(),
                        "Planner requested retrieval"
                    ),
                    RetrievalDecision::Skip { reason } => debug!(reason = %reason, "Planner skipped retrieval"),
                }
                decision
            }
            Err(problem) => {
                warn!(problem = %problem, "Malformed planner response, skipping retrieval");
                RetrievalDecision::skip(format!("malformed plan: {problem}"))
            }
        }
    }
}

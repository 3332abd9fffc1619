//! Knowledge base types: passages, metadata filters and the store trait.
//!
//! Every passage in the knowledge base is tagged with values from the fixed
//! vocabulary. A retrieval query restricts results with [`MetadataFilters`]:
//! values inside a category are alternatives (OR), categories combine with
//! AND, and an empty category imposes no restriction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;
use crate::vocabulary::{LifeArea, Nakshatra, Planet, ZodiacSign};

/// The kind of source a passage was ingested from.
///
/// This is the label reported back to callers as "context used".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextCategory {
    ZodiacTraits,
    PlanetaryImpact,
    Nakshatras,
    LifeGuidance,
    General,
}

impl ContextCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextCategory::ZodiacTraits => "zodiac_traits",
            ContextCategory::PlanetaryImpact => "planetary_impact",
            ContextCategory::Nakshatras => "nakshatras",
            ContextCategory::LifeGuidance => "life_guidance",
            ContextCategory::General => "general",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "zodiac_traits" => Some(ContextCategory::ZodiacTraits),
            "planetary_impact" => Some(ContextCategory::PlanetaryImpact),
            "nakshatras" | "nakshtras" => Some(ContextCategory::Nakshatras),
            "life_guidance" => Some(ContextCategory::LifeGuidance),
            "general" => Some(ContextCategory::General),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContextCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vocabulary tags attached to a stored passage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zodiac: Option<ZodiacSign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<Planet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_area: Option<LifeArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nakshatra: Option<Nakshatra>,
}

/// Filter constraints for a retrieval query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zodiac: Vec<ZodiacSign>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub planet: Vec<Planet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub life_area: Vec<LifeArea>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nakshatra: Vec<Nakshatra>,
}

fn accepts<T: PartialEq>(allowed: &[T], tag: Option<&T>) -> bool {
    allowed.is_empty() || tag.is_some_and(|t| allowed.contains(t))
}

fn parse_values<T: std::str::FromStr>(category: &str, value: &serde_json::Value) -> Vec<T> {
    let raw: Vec<&str> = match value {
        serde_json::Value::String(s) => vec![s.as_str()],
        serde_json::Value::Array(items) => items.iter().filter_map(|v| v.as_str()).collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .filter_map(|term| match term.parse::<T>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::debug!(category, term, "Dropping filter value outside the vocabulary");
                None
            }
        })
        .collect()
}

fn push_unique<T: PartialEq>(into: &mut Vec<T>, values: Vec<T>) {
    for value in values {
        if !into.contains(&value) {
            into.push(value);
        }
    }
}

impl MetadataFilters {
    pub fn is_empty(&self) -> bool {
        self.zodiac.is_empty() && self.planet.is_empty() && self.life_area.is_empty() && self.nakshatra.is_empty()
    }

    /// AND across categories, OR within one.
    pub fn matches(&self, tags: &MetadataTags) -> bool {
        accepts(&self.zodiac, tags.zodiac.as_ref())
            && accepts(&self.planet, tags.planet.as_ref())
            && accepts(&self.life_area, tags.life_area.as_ref())
            && accepts(&self.nakshatra, tags.nakshatra.as_ref())
    }

    /// Build filters from loosely-typed model output.
    ///
    /// Unknown category keys and values outside the vocabulary are dropped.
    /// Both singular keys (`zodiac`) and the plural forms used by older
    /// corpora (`zodiacs`, `planetary_factors`, `life_areas`, `nakshtra`)
    /// are understood.
    pub fn from_raw(raw: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut filters = Self::default();
        for (key, value) in raw {
            match key.trim().to_ascii_lowercase().as_str() {
                "zodiac" | "zodiacs" | "zodiac_sign" | "zodiac_signs" => {
                    push_unique(&mut filters.zodiac, parse_values(key, value))
                }
                "planet" | "planets" | "planetary_factor" | "planetary_factors" => {
                    push_unique(&mut filters.planet, parse_values(key, value))
                }
                "life_area" | "life_areas" => push_unique(&mut filters.life_area, parse_values(key, value)),
                "nakshatra" | "nakshatras" | "nakshtra" => {
                    push_unique(&mut filters.nakshatra, parse_values(key, value))
                }
                other => tracing::debug!(category = other, "Dropping unknown filter category"),
            }
        }
        filters
    }

    /// `category:value` labels, for logs and prompts.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        labels.extend(self.zodiac.iter().map(|v| format!("zodiac:{v}")));
        labels.extend(self.planet.iter().map(|v| format!("planet:{v}")));
        labels.extend(self.life_area.iter().map(|v| format!("life_area:{v}")));
        labels.extend(self.nakshatra.iter().map(|v| format!("nakshatra:{v}")));
        labels
    }
}

/// A semantic search request. The query text is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalQuery {
    text: String,
    filters: MetadataFilters,
}

impl RetrievalQuery {
    /// Returns `None` when the query text is blank.
    pub fn new(text: impl Into<String>, filters: MetadataFilters) -> Option<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(Self { text, filters })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn filters(&self) -> &MetadataFilters {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut MetadataFilters {
        &mut self.filters
    }
}

/// A document ready to be written to a knowledge store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub text: String,
    pub category: ContextCategory,
    #[serde(default)]
    pub tags: MetadataTags,
    /// Source file stem the document came from
    #[serde(default)]
    pub source: String,
}

/// A passage returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePassage {
    pub id: String,
    pub text: String,
    pub category: ContextCategory,
    #[serde(default)]
    pub tags: MetadataTags,
    /// Cosine similarity, higher is closer
    #[serde(default)]
    pub score: f32,
}

/// Distinct categories of the given passages, in first-seen order.
pub fn categories_of(passages: &[KnowledgePassage]) -> Vec<ContextCategory> {
    let mut seen = Vec::new();
    for passage in passages {
        if !seen.contains(&passage.category) {
            seen.push(passage.category);
        }
    }
    seen
}

/// A vector store holding the astrology knowledge base.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// A human-readable name for this store (e.g., "chroma", "local").
    fn name(&self) -> &str;

    /// Top `limit` passages for `query`, restricted to those matching `filters`.
    async fn search(
        &self,
        query: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> std::result::Result<Vec<KnowledgePassage>, KnowledgeError>;

    /// Add documents, replacing any with the same id. Returns how many were written.
    async fn upsert(&self, documents: Vec<KnowledgeDocument>) -> std::result::Result<usize, KnowledgeError>;

    /// Number of stored documents.
    async fn count(&self) -> std::result::Result<usize, KnowledgeError>;

    /// Drop every stored document.
    async fn reset(&self) -> std::result::Result<(), KnowledgeError>;

    async fn health_check(&self) -> std::result::Result<bool, KnowledgeError> {
        self.count().await.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(zodiac: Option<ZodiacSign>, life_area: Option<LifeArea>) -> MetadataTags {
        MetadataTags { zodiac, life_area, ..Default::default() }
    }

    #[test]
    fn empty_filters_match_everything() {
        let filters = MetadataFilters::default();
        assert!(filters.is_empty());
        assert!(filters.matches(&MetadataTags::default()));
        assert!(filters.matches(&tags(Some(ZodiacSign::Leo), None)));
    }

    #[test]
    fn values_within_a_category_are_alternatives() {
        let filters = MetadataFilters { zodiac: vec![ZodiacSign::Leo, ZodiacSign::Virgo], ..Default::default() };
        assert!(filters.matches(&tags(Some(ZodiacSign::Virgo), None)));
        assert!(!filters.matches(&tags(Some(ZodiacSign::Aries), None)));
        assert!(!filters.matches(&tags(None, Some(LifeArea::Love))));
    }

    #[test]
    fn categories_combine_with_and() {
        let filters = MetadataFilters {
            zodiac: vec![ZodiacSign::Leo],
            life_area: vec![LifeArea::Career],
            ..Default::default()
        };
        assert!(filters.matches(&tags(Some(ZodiacSign::Leo), Some(LifeArea::Career))));
        assert!(!filters.matches(&tags(Some(ZodiacSign::Leo), None)));
        assert!(!filters.matches(&tags(None, Some(LifeArea::Career))));
    }

    #[test]
    fn raw_filters_drop_unknown_categories_and_values() {
        let raw = json!({
            "zodiacs": ["Leo", "Ophiuchus"],
            "planetary_factors": "Saturn",
            "nakshtra": ["moola"],
            "colour": ["red"],
            "life_areas": []
        });
        let filters = MetadataFilters::from_raw(raw.as_object().unwrap());
        assert_eq!(filters.zodiac, vec![ZodiacSign::Leo]);
        assert_eq!(filters.planet, vec![Planet::Saturn]);
        assert_eq!(filters.nakshatra, vec![Nakshatra::Mula]);
        assert!(filters.life_area.is_empty());
        assert_eq!(filters.labels(), vec!["zodiac:Leo", "planet:Saturn", "nakshatra:Mula"]);
    }

    #[test]
    fn retrieval_query_rejects_blank_text() {
        assert!(RetrievalQuery::new("   ", MetadataFilters::default()).is_none());
        let query = RetrievalQuery::new("  Leo traits ", MetadataFilters::default()).unwrap();
        assert_eq!(query.text(), "Leo traits");
    }

    #[test]
    fn categories_are_deduplicated_in_order() {
        let passage = |category| KnowledgePassage {
            id: "x".into(),
            text: "t".into(),
            category,
            tags: MetadataTags::default(),
            score: 0.0,
        };
        let passages = vec![
            passage(ContextCategory::ZodiacTraits),
            passage(ContextCategory::LifeGuidance),
            passage(ContextCategory::ZodiacTraits),
        ];
        assert_eq!(
            categories_of(&passages),
            vec![ContextCategory::ZodiacTraits, ContextCategory::LifeGuidance]
        );
    }

    #[test]
    fn category_labels_round_trip_through_parse() {
        for category in [
            ContextCategory::ZodiacTraits,
            ContextCategory::PlanetaryImpact,
            ContextCategory::Nakshatras,
            ContextCategory::LifeGuidance,
            ContextCategory::General,
        ] {
            assert_eq!(ContextCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(ContextCategory::parse("nakshtras"), Some(ContextCategory::Nakshatras));
        assert_eq!(serde_json::to_string(&ContextCategory::ZodiacTraits).unwrap(), "\"zodiac_traits\"");
    }
}

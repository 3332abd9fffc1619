//! ChromaDB knowledge store over the v2 REST API.
//!
//! Embeddings are computed client-side with the configured embedding model
//! and sent alongside the documents, so the collection never needs a
//! server-side embedding function. Metadata filters are translated into a
//! Chroma `where` clause; the collection uses cosine distance and scores
//! are reported as `1 - distance`.

use std::time::Duration;

use async_trait::async_trait;
use nakshatra_core::error::KnowledgeError;
use nakshatra_core::knowledge::{
    ContextCategory, KnowledgeDocument, KnowledgePassage, KnowledgeStore, MetadataFilters, MetadataTags,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::embedder::Embedder;

const TENANT: &str = "default_tenant";
const DATABASE: &str = "default_database";

pub struct ChromaStore {
    base_url: String,
    collection: String,
    embedder: Embedder,
    client: reqwest::Client,
    collection_id: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

/// Column-oriented query result; one inner list per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

impl ChromaStore {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        embedder: Embedder,
        timeout: Duration,
    ) -> Result<Self, KnowledgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KnowledgeError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            embedder,
            client,
            collection_id: RwLock::new(None),
        })
    }

    fn collections_url(&self) -> String {
        format!("{}/api/v2/tenants/{TENANT}/databases/{DATABASE}/collections", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, KnowledgeError> {
        let response = request
            .send()
            .await
            .map_err(|e| KnowledgeError::Unavailable(format!("chroma {what}: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(KnowledgeError::QueryFailed(format!("chroma {what} returned {status}: {body}")))
    }

    /// Resolve (creating if needed) the collection id, cached after the first call.
    async fn collection_id(&self) -> Result<String, KnowledgeError> {
        if let Some(id) = self.collection_id.read().await.clone() {
            return Ok(id);
        }

        let body = json!({
            "name": self.collection,
            "metadata": { "hnsw:space": "cosine" },
            "get_or_create": true,
        });
        let response = self
            .send(self.client.post(self.collections_url()).json(&body), "get_or_create")
            .await?;
        let created: CollectionResponse = response
            .json()
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("bad collection response: {e}")))?;

        debug!(collection = %self.collection, id = %created.id, "Resolved chroma collection");
        *self.collection_id.write().await = Some(created.id.clone());
        Ok(created.id)
    }
}

/// Translate filters into a Chroma `where` clause, `None` when unrestricted.
pub fn where_clause(filters: &MetadataFilters) -> Option<Value> {
    fn clause<T: ToString>(key: &str, values: &[T]) -> Option<Value> {
        if values.is_empty() {
            return None;
        }
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Some(json!({ key: { "$in": values } }))
    }

    let mut clauses: Vec<Value> = [
        clause("zodiac", &filters.zodiac),
        clause("planet", &filters.planet),
        clause("life_area", &filters.life_area),
        clause("nakshatra", &filters.nakshatra),
    ]
    .into_iter()
    .flatten()
    .collect();

    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "$and": clauses })),
    }
}

/// Flat metadata stored with each document.
pub fn document_metadata(document: &KnowledgeDocument) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("category".into(), json!(document.category.as_str()));
    metadata.insert("source".into(), json!(document.source));
    if let Some(zodiac) = document.tags.zodiac {
        metadata.insert("zodiac".into(), json!(zodiac.as_str()));
    }
    if let Some(planet) = document.tags.planet {
        metadata.insert("planet".into(), json!(planet.as_str()));
    }
    if let Some(life_area) = document.tags.life_area {
        metadata.insert("life_area".into(), json!(life_area.as_str()));
    }
    if let Some(nakshatra) = document.tags.nakshatra {
        metadata.insert("nakshatra".into(), json!(nakshatra.as_str()));
    }
    metadata
}

fn tag<T: std::str::FromStr>(metadata: &Map<String, Value>, key: &str) -> Option<T> {
    metadata.get(key)?.as_str()?.parse().ok()
}

fn passage_from(id: String, text: String, metadata: &Map<String, Value>, distance: f32) -> KnowledgePassage {
    let category = metadata
        .get("category")
        .and_then(Value::as_str)
        .and_then(ContextCategory::parse)
        .unwrap_or(ContextCategory::General);
    KnowledgePassage {
        id,
        text,
        category,
        tags: MetadataTags {
            zodiac: tag(metadata, "zodiac"),
            planet: tag(metadata, "planet"),
            life_area: tag(metadata, "life_area"),
            nakshatra: tag(metadata, "nakshatra"),
        },
        score: 1.0 - distance,
    }
}

fn passages_from(response: QueryResponse) -> Vec<KnowledgePassage> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response.documents.and_then(|d| d.into_iter().next()).unwrap_or_default();
    let metadatas = response.metadatas.and_then(|m| m.into_iter().next()).unwrap_or_default();
    let distances = response.distances.and_then(|d| d.into_iter().next()).unwrap_or_default();
    let empty = Map::new();

    ids.into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let text = documents.get(i).cloned().flatten()?;
            let metadata = metadatas.get(i).and_then(Option::as_ref).unwrap_or(&empty);
            let distance = distances.get(i).copied().flatten().unwrap_or(1.0);
            Some(passage_from(id, text, metadata, distance))
        })
        .collect()
}

#[async_trait]
impl KnowledgeStore for ChromaStore {
    fn name(&self) -> &str {
        "chroma"
    }

    async fn search(
        &self,
        query: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> Result<Vec<KnowledgePassage>, KnowledgeError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_one(query).await?;
        let id = self.collection_id().await?;

        let mut body = json!({
            "query_embeddings": [embedding],
            "n_results": limit,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(clause) = where_clause(filters) {
            body["where"] = clause;
        }

        let url = format!("{}/{id}/query", self.collections_url());
        let response = self.send(self.client.post(url).json(&body), "query").await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("bad query response: {e}")))?;

        let passages = passages_from(parsed);
        debug!(store = "chroma", filters = ?filters.labels(), returned = passages.len(), "Chroma query complete");
        Ok(passages)
    }

    async fn upsert(&self, documents: Vec<KnowledgeDocument>) -> Result<usize, KnowledgeError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let embeddings = self
            .embedder
            .embed(documents.iter().map(|d| d.text.clone()).collect())
            .await?;
        let id = self.collection_id().await?;

        let body = json!({
            "ids": documents.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            "embeddings": embeddings,
            "documents": documents.iter().map(|d| d.text.as_str()).collect::<Vec<_>>(),
            "metadatas": documents.iter().map(document_metadata).collect::<Vec<_>>(),
        });

        let url = format!("{}/{id}/upsert", self.collections_url());
        self.send(self.client.post(url).json(&body), "upsert")
            .await
            .map_err(|e| KnowledgeError::Storage(e.to_string()))?;
        Ok(documents.len())
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        let id = self.collection_id().await?;
        let url = format!("{}/{id}/count", self.collections_url());
        let response = self.send(self.client.get(url), "count").await?;
        response
            .json::<usize>()
            .await
            .map_err(|e| KnowledgeError::QueryFailed(format!("bad count response: {e}")))
    }

    async fn reset(&self) -> Result<(), KnowledgeError> {
        let url = format!("{}/{}", self.collections_url(), self.collection);
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| KnowledgeError::Unavailable(format!("chroma delete: {e}")))?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Storage(format!("chroma delete returned {status}: {body}")));
        }

        *self.collection_id.write().await = None;
        info!(collection = %self.collection, "Chroma collection dropped");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, KnowledgeError> {
        let url = format!("{}/api/v2/heartbeat", self.base_url);
        self.send(self.client.get(url), "heartbeat").await?;
        Ok(true)
    }
}

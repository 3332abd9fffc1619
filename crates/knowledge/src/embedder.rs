//! Embedding calls on behalf of the knowledge stores.

use std::sync::Arc;

use nakshatra_core::error::KnowledgeError;
use nakshatra_core::provider::{EmbeddingRequest, Provider};

/// A provider bound to one embedding model.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One vector per input, in input order.
    pub async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, KnowledgeError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let expected = inputs.len();
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs,
            })
            .await
            .map_err(|e| KnowledgeError::EmbeddingFailed(e.to_string()))?;

        if response.embeddings.len() != expected {
            return Err(KnowledgeError::EmbeddingFailed(format!(
                "expected {expected} embeddings, provider returned {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, KnowledgeError> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KnowledgeError::EmbeddingFailed("empty embedding response".into()))
    }
}

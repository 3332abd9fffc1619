//! Deterministic embedding provider for store tests.

use async_trait::async_trait;
use nakshatra_core::error::ProviderError;
use nakshatra_core::message::Message;
use nakshatra_core::provider::{EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse};
use std::sync::atomic::{AtomicUsize, Ordering};

const TERMS: &[&str] = &[
    "leo", "virgo", "aries", "career", "love", "saturn", "moon", "sun", "spiritual", "traits",
];

/// Embeds text as keyword counts over a small fixed vocabulary.
///
/// Texts sharing keywords end up close in cosine space, which is enough to
/// assert on ranking without a real model.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut vector: Vec<f32> = TERMS.iter().map(|t| lower.matches(t).count() as f32).collect();
    vector.push(0.05);
    vector
}

#[async_trait]
impl Provider for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            message: Message::assistant(""),
            usage: None,
            model: request.model,
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| keyword_vector(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// Rejects every embedding call.
pub struct BrokenEmbedder;

#[async_trait]
impl Provider for BrokenEmbedder {
    fn name(&self) -> &str {
        "broken"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

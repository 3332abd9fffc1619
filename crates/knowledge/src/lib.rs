//! Knowledge stores for Nakshatra.
//!
//! Provides:
//! - [`ChromaStore`]: ChromaDB over its REST API (the default backend)
//! - [`LocalVectorStore`]: embedded JSONL index with in-process cosine search
//! - [`ingest`]: loading the astrology corpus into either store

pub mod chroma;
pub mod embedder;
pub mod ingest;
pub mod local;
pub mod vector;

#[cfg(test)]
mod testing;

pub use chroma::ChromaStore;
pub use embedder::Embedder;
pub use ingest::{IngestReport, ingest_dir};
pub use local::LocalVectorStore;

use std::sync::Arc;
use std::time::Duration;

use nakshatra_config::AppConfig;
use nakshatra_core::{KnowledgeError, KnowledgeStore, Provider};

/// Build the knowledge store selected by `knowledge.backend`.
pub fn build_from_config(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
) -> Result<Arc<dyn KnowledgeStore>, KnowledgeError> {
    let embedder = Embedder::new(provider, &config.llm.embedding_model);
    let knowledge = &config.knowledge;

    match knowledge.backend.as_str() {
        "chroma" => {
            let store = ChromaStore::new(
                &knowledge.chroma_url,
                &knowledge.collection,
                embedder,
                Duration::from_secs(config.llm.timeout_secs),
            )?;
            tracing::debug!(url = %knowledge.chroma_url, collection = %knowledge.collection, "Using chroma knowledge store");
            Ok(Arc::new(store))
        }
        "local" => {
            tracing::debug!(path = %knowledge.local_path.display(), "Using local knowledge store");
            Ok(Arc::new(LocalVectorStore::open(embedder, knowledge.local_path.clone())))
        }
        "memory" => Ok(Arc::new(LocalVectorStore::in_memory(embedder))),
        other => Err(KnowledgeError::Unavailable(format!("unknown knowledge backend '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    #[test]
    fn backend_selection() {
        let provider: Arc<dyn Provider> = Arc::new(KeywordEmbedder::default());
        let mut config = AppConfig::default();
        assert_eq!(build_from_config(&config, provider.clone()).unwrap().name(), "chroma");

        config.knowledge.backend = "memory".into();
        assert_eq!(build_from_config(&config, provider.clone()).unwrap().name(), "local");

        config.knowledge.backend = "pinecone".into();
        assert!(build_from_config(&config, provider).is_err());
    }
}

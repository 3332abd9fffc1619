//! Knowledge retriever.
//!
//! Wraps a [`KnowledgeStore`] and enforces the query contract regardless
//! of backend: at most `top_k` passages, every one matching the filters.

use std::sync::Arc;

use nakshatra_core::error::KnowledgeError;
use nakshatra_core::knowledge::{KnowledgePassage, KnowledgeStore, RetrievalQuery};
use tracing::{debug, warn};

pub struct Retriever {
    store: Arc<dyn KnowledgeStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn KnowledgeStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    pub fn store(&self) -> &Arc<dyn KnowledgeStore> {
        &self.store
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Up to `top_k` passages for `query`, best first.
    pub async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<KnowledgePassage>, KnowledgeError> {
        if self.top_k == 0 {
            return Ok(Vec::new());
        }

        let filters = query.filters();
        let found = self.store.search(query.text(), filters, self.top_k).await?;
        let returned = found.len();

        let mut passages: Vec<KnowledgePassage> = found.into_iter().filter(|p| filters.matches(&p.tags)).collect();
        if passages.len() < returned {
            warn!(
                store = self.store.name(),
                dropped = returned - passages.len(),
                "Store returned passages outside the requested filters"
            );
        }
        passages.truncate(self.top_k);

        debug!(
            store = self.store.name(),
            query = query.text(),
            filters = ?filters.labels(),
            passages = passages.len(),
            "Retrieved knowledge"
        );
        Ok(passages)
    }
}

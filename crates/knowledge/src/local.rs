//! Embedded vector store persisted as JSON lines.
//!
//! Each line of the index file is one [`IndexedDocument`]. The whole index
//! is loaded on creation and rewritten on every mutation, which keeps the
//! store human-inspectable and dependency-free for corpora of a few
//! thousand passages. Without a path the store lives purely in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use nakshatra_core::error::KnowledgeError;
use nakshatra_core::knowledge::{KnowledgeDocument, KnowledgePassage, KnowledgeStore, MetadataFilters};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::embedder::Embedder;
use crate::vector::{IndexedDocument, vector_search};

pub struct LocalVectorStore {
    embedder: Embedder,
    path: Option<PathBuf>,
    entries: Arc<RwLock<Vec<IndexedDocument>>>,
}

impl LocalVectorStore {
    /// Open the index at `path`, starting empty if the file does not exist yet.
    pub fn open(embedder: Embedder, path: PathBuf) -> Self {
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "Local knowledge index loaded");
        Self {
            embedder,
            path: Some(path),
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn in_memory(embedder: Embedder) -> Self {
        Self {
            embedder,
            path: None,
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load_from_disk(path: &Path) -> Vec<IndexedDocument> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<IndexedDocument>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted knowledge index line");
                    None
                }
            })
            .collect()
    }

    fn flush(&self, entries: &[IndexedDocument]) -> Result<(), KnowledgeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KnowledgeError::Storage(format!("Failed to create index directory: {e}")))?;
        }

        let mut content = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| KnowledgeError::Storage(format!("Failed to serialize index entry: {e}")))?;
            content.push_str(&line);
            content.push('\n');
        }

        std::fs::write(path, content)
            .map_err(|e| KnowledgeError::Storage(format!("Failed to write knowledge index: {e}")))
    }
}

#[async_trait]
impl KnowledgeStore for LocalVectorStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn search(
        &self,
        query: &str,
        filters: &MetadataFilters,
        limit: usize,
    ) -> Result<Vec<KnowledgePassage>, KnowledgeError> {
        if limit == 0 || self.entries.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;
        let entries = self.entries.read().await;
        let passages = vector_search(&entries, &query_embedding, filters, limit);
        debug!(
            store = "local",
            candidates = entries.len(),
            returned = passages.len(),
            "Vector search complete"
        );
        Ok(passages)
    }

    async fn upsert(&self, documents: Vec<KnowledgeDocument>) -> Result<usize, KnowledgeError> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts = documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = self.embedder.embed(texts).await?;

        let mut entries = self.entries.write().await;
        let written = documents.len();
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            let indexed = IndexedDocument { document, embedding };
            match entries.iter_mut().find(|e| e.document.id == indexed.document.id) {
                Some(existing) => *existing = indexed,
                None => entries.push(indexed),
            }
        }
        self.flush(&entries)?;
        Ok(written)
    }

    async fn count(&self) -> Result<usize, KnowledgeError> {
        Ok(self.entries.read().await.len())
    }

    async fn reset(&self) -> Result<(), KnowledgeError> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.flush(&entries)
    }
}

//! Vector similarity search over embedded knowledge documents.
//!
//! Pure-Rust cosine similarity plus a filtered top-k ranking used by the
//! local store. Remote stores do the same work server-side.

use nakshatra_core::knowledge::{KnowledgeDocument, KnowledgePassage, MetadataFilters};
use serde::{Deserialize, Serialize};

/// A document together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    #[serde(flatten)]
    pub document: KnowledgeDocument,
    pub embedding: Vec<f32>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank documents matching `filters` by cosine similarity to a query embedding.
///
/// Returns at most `limit` passages sorted by descending similarity, with
/// `score` set to the similarity. Ties keep insertion order.
pub fn vector_search(
    entries: &[IndexedDocument],
    query_embedding: &[f32],
    filters: &MetadataFilters,
    limit: usize,
) -> Vec<KnowledgePassage> {
    let mut scored: Vec<(f32, &IndexedDocument)> = entries
        .iter()
        .filter(|entry| filters.matches(&entry.document.tags))
        .map(|entry| (cosine_similarity(&entry.embedding, query_embedding), entry))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(score, entry)| KnowledgePassage {
            id: entry.document.id.clone(),
            text: entry.document.text.clone(),
            category: entry.document.category,
            tags: entry.document.tags.clone(),
            score,
        })
        .collect()
}

//! Corpus ingestion: turns the astrology data directory into tagged documents.
//!
//! Two file shapes are understood:
//!
//! - `*.json`: `{ main_key: { sub_key: value } }`. Every inner pair becomes
//!   one document `"sub_key: value"` (lists joined with `", "`), tagged from
//!   `main_key` according to the file it came from.
//! - `*.txt`: every non-empty line becomes one document, with a leading
//!   bullet `-` stripped.
//!
//! The file stem decides the category and which vocabulary the main key
//! belongs to (`zodiac_traits` → zodiac, `planetary_impact` → planet, ...).
//! Document ids are content hashes, so re-ingesting an unchanged corpus
//! overwrites rather than duplicates.

use std::path::{Path, PathBuf};

use nakshatra_core::error::KnowledgeError;
use nakshatra_core::knowledge::{ContextCategory, KnowledgeDocument, KnowledgeStore, MetadataTags};
use nakshatra_core::vocabulary::{LifeArea, Nakshatra, Planet, ZodiacSign};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Which vocabulary a JSON main key is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Zodiac,
    Planet,
    Nakshatra,
    /// Every document in the file carries this life area.
    LifeArea(LifeArea),
    Untagged,
}

/// Category and tag vocabulary for a source file stem.
pub fn source_profile(stem: &str) -> (ContextCategory, TagKind) {
    match stem.to_ascii_lowercase().as_str() {
        "zodiac_traits" => (ContextCategory::ZodiacTraits, TagKind::Zodiac),
        "planetary_impact" => (ContextCategory::PlanetaryImpact, TagKind::Planet),
        "nakshatras" | "nakshtras" => (ContextCategory::Nakshatras, TagKind::Nakshatra),
        "love_guidance" => (ContextCategory::LifeGuidance, TagKind::LifeArea(LifeArea::Love)),
        "spiritual_guidance" => (ContextCategory::LifeGuidance, TagKind::LifeArea(LifeArea::Spirituality)),
        "career_guidance" | "carrer_guidance" => (ContextCategory::LifeGuidance, TagKind::LifeArea(LifeArea::Career)),
        _ => (ContextCategory::General, TagKind::Untagged),
    }
}

fn parse_tag<T: std::str::FromStr>(source: &str, key: &str) -> Option<T> {
    match key.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(source, key, "Main key outside the vocabulary, leaving document untagged");
            None
        }
    }
}

fn tags_for(source: &str, kind: TagKind, main_key: Option<&str>) -> MetadataTags {
    let mut tags = MetadataTags::default();
    match (kind, main_key) {
        (TagKind::Zodiac, Some(key)) => tags.zodiac = parse_tag::<ZodiacSign>(source, key),
        (TagKind::Planet, Some(key)) => tags.planet = parse_tag::<Planet>(source, key),
        (TagKind::Nakshatra, Some(key)) => tags.nakshatra = parse_tag::<Nakshatra>(source, key),
        (TagKind::LifeArea(area), key) => {
            tags.life_area = Some(area);
            // Guidance files are keyed by sign.
            tags.zodiac = key.and_then(|key| parse_tag::<ZodiacSign>(source, key));
        }
        _ => {}
    }
    tags
}

/// Stable id: SHA-256 of source, key and text.
pub fn document_id(source: &str, key: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(key.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Documents from one JSON source file.
pub fn documents_from_json(stem: &str, content: &str) -> Result<Vec<KnowledgeDocument>, KnowledgeError> {
    let data: serde_json::Map<String, Value> =
        serde_json::from_str(content).map_err(|e| KnowledgeError::Ingestion {
            source_name: stem.to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;
    let (category, kind) = source_profile(stem);

    let mut documents = Vec::new();
    for (main_key, main_value) in &data {
        let Value::Object(entries) = main_value else {
            debug!(source = stem, key = %main_key, "Skipping non-object entry");
            continue;
        };
        let tags = tags_for(stem, kind, Some(main_key));
        for (sub_key, sub_value) in entries {
            let text = format!("{sub_key}: {}", render_value(sub_value));
            documents.push(KnowledgeDocument {
                id: document_id(stem, &format!("{main_key}/{sub_key}"), &text),
                text,
                category,
                tags: tags.clone(),
                source: stem.to_string(),
            });
        }
    }
    Ok(documents)
}

/// Documents from one plain-text source file.
pub fn documents_from_text(stem: &str, content: &str) -> Vec<KnowledgeDocument> {
    let (category, kind) = source_profile(stem);
    let tags = tags_for(stem, kind, None);

    content
        .lines()
        .map(|line| line.trim().trim_start_matches('-').trim())
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| KnowledgeDocument {
            id: document_id(stem, &format!("line-{}", i + 1), line),
            text: line.to_string(),
            category,
            tags: tags.clone(),
            source: stem.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub documents: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    pub documents_written: usize,
    pub total_in_store: usize,
}

async fn source_files(dir: &Path) -> Result<Vec<PathBuf>, KnowledgeError> {
    let io_error = |e: std::io::Error| KnowledgeError::Ingestion {
        source_name: dir.display().to_string(),
        reason: e.to_string(),
    };

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        let is_source = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "json" || e == "txt");
        let is_file = entry.file_type().await.map_err(io_error)?.is_file();
        if is_file && is_source {
            files.push(path);
        }
    }
    // JSON before text, then by name, so runs are reproducible.
    files.sort_by_key(|p| (p.extension().is_some_and(|e| e != "json"), p.clone()));
    Ok(files)
}

/// Parse every source file under `dir` without touching a store.
pub async fn load_corpus(dir: &Path) -> Result<Vec<(PathBuf, Vec<KnowledgeDocument>)>, KnowledgeError> {
    let is_dir = tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir());
    if !is_dir {
        return Err(KnowledgeError::Ingestion {
            source_name: dir.display().to_string(),
            reason: "data directory does not exist".into(),
        });
    }

    let mut corpus = Vec::new();
    for path in source_files(dir).await? {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| KnowledgeError::Ingestion {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let documents = if path.extension().is_some_and(|e| e == "json") {
            documents_from_json(&stem, &content)?
        } else {
            documents_from_text(&stem, &content)
        };
        if documents.is_empty() {
            warn!(file = %path.display(), "No documents extracted");
        }
        corpus.push((path, documents));
    }
    Ok(corpus)
}

/// Load the corpus under `dir` into `store`, optionally dropping existing contents first.
pub async fn ingest_dir(
    store: &dyn KnowledgeStore,
    dir: &Path,
    batch_size: usize,
    recreate: bool,
) -> Result<IngestReport, KnowledgeError> {
    let corpus = load_corpus(dir).await?;

    if recreate {
        info!(store = store.name(), "Resetting knowledge store before ingestion");
        store.reset().await?;
    }

    let mut report = IngestReport::default();
    for (path, documents) in corpus {
        let count = documents.len();
        let mut batch = Vec::with_capacity(batch_size.max(1));
        for document in documents {
            batch.push(document);
            if batch.len() >= batch_size.max(1) {
                report.documents_written += store.upsert(std::mem::take(&mut batch)).await?;
            }
        }
        if !batch.is_empty() {
            report.documents_written += store.upsert(batch).await?;
        }
        info!(file = %path.display(), documents = count, "Ingested source file");
        report.files.push(FileReport { file: path, documents: count });
    }

    report.total_in_store = store.count().await?;
    info!(
        files = report.files.len(),
        written = report.documents_written,
        total = report.total_in_store,
        "Ingestion complete"
    );
    Ok(report)
}

//! `nakshatra ingest`: Load the astrology corpus into the knowledge store.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
    recreate: bool,
    batch_size: Option<usize>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    if !config.has_api_key() {
        anyhow::bail!("No API key configured; embeddings need OPENAI_API_KEY");
    }

    let data_dir = data_dir.unwrap_or_else(|| config.knowledge.data_dir.clone());
    let batch_size = batch_size.unwrap_or(config.knowledge.batch_size).max(1);

    let provider = nakshatra_providers::build_from_config(&config).context("Failed to build provider")?;
    let store =
        nakshatra_knowledge::build_from_config(&config, provider).context("Failed to open knowledge store")?;

    println!("📚 Ingesting {} into {} store", data_dir.display(), store.name());
    if recreate {
        println!("   Recreating collection '{}'", config.knowledge.collection);
    }

    let report = nakshatra_knowledge::ingest_dir(store.as_ref(), &data_dir, batch_size, recreate)
        .await
        .with_context(|| format!("Ingestion from {} failed", data_dir.display()))?;

    for file in &report.files {
        println!("   {:<40} {:>6} documents", file.file.display(), file.documents);
    }
    println!();
    println!("   Written:  {}", report.documents_written);
    println!("   In store: {}", report.total_in_store);

    Ok(())
}

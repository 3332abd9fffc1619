//! `nakshatra chat`: One consultation turn against a local session.
//!
//! Sessions live in the sqlite store so a conversation can be continued
//! across invocations with the same `--session`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use nakshatra_core::profile::UserProfile;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    session_id: &str,
    message: &str,
    profile: Option<UserProfile>,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if !config.has_api_key() {
        anyhow::bail!("No API key configured; set OPENAI_API_KEY or llm.api_key in the config file");
    }
    if config.session.backend == "memory" {
        config.session.backend = "sqlite".into();
    }

    let provider = nakshatra_providers::build_from_config(&config).context("Failed to build provider")?;
    let knowledge = nakshatra_knowledge::build_from_config(&config, provider.clone())
        .context("Failed to open knowledge store")?;
    let sessions = nakshatra_memory::build_from_config(&config)
        .await
        .context("Failed to open session store")?;
    let resolver = nakshatra_chart::build_from_config(&config).context("Failed to build chart resolver")?;

    let pipeline = nakshatra_agent::build_pipeline(&config, provider, knowledge, sessions, Arc::new(resolver));
    let outcome = pipeline
        .run_turn(session_id, message, profile.as_ref())
        .await
        .context("Turn failed")?;

    println!("{}", outcome.reply);
    println!();
    let signs = [outcome.sun_sign, outcome.moon_sign, outcome.ascendant_sign]
        .map(|sign| sign.map_or_else(|| "?".to_string(), |s| s.to_string()));
    println!("   Sun / Moon / Ascendant: {} / {} / {}", signs[0], signs[1], signs[2]);
    if let Some(dasha) = &outcome.current_dasha {
        println!("   Current dasha: {dasha}");
    }
    if !outcome.context_used.is_empty() {
        let labels: Vec<&str> = outcome.context_used.iter().map(|c| c.as_str()).collect();
        println!("   Context used: {}", labels.join(", "));
    }

    Ok(())
}

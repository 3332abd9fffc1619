//! `nakshatra chart`: Compute a kundali and print it.

use std::path::Path;

use anyhow::Context;
use nakshatra_core::profile::UserProfile;

use super::load_config;

pub async fn run(config_path: Option<&Path>, profile: UserProfile) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let resolver = nakshatra_chart::build_from_config(&config).context("Failed to build chart resolver")?;

    let chart = resolver
        .resolve(&profile)
        .await
        .with_context(|| format!("Could not compute a chart for {}", profile.name))?;

    println!("{}", serde_json::to_string_pretty(&chart)?);
    Ok(())
}

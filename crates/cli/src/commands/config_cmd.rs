//! `nakshatra config`: Configuration management commands.

use std::path::Path;

use anyhow::Context;
use nakshatra_config::AppConfig;

use super::load_config;

pub fn show(config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("***".into());
    }
    let toml_str = toml::to_string_pretty(&config).context("Failed to render config")?;
    println!("{toml_str}");
    Ok(())
}

pub fn print_default() {
    println!("{}", AppConfig::default_toml());
}

pub fn path(config_path: Option<&Path>) {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    println!("{}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let parsed: AppConfig = toml::from_str(&AppConfig::default_toml()).unwrap();
        assert_eq!(parsed.knowledge.collection, "astro_docs");
        assert!(parsed.validate().is_ok());
    }
}

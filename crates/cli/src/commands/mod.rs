pub mod chart;
pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod gateway;
pub mod ingest;

use std::path::Path;

use anyhow::Context;
use clap::Args;
use nakshatra_config::AppConfig;
use nakshatra_core::profile::{Language, UserProfile};

/// Load the config from `path`, or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.context("Failed to load config")
}

pub fn parse_language(raw: &str) -> Result<Language, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "en" | "english" => Ok(Language::English),
        "hi" | "hindi" => Ok(Language::Hindi),
        other => Err(format!("unsupported language '{other}' (expected en or hi)")),
    }
}

#[derive(Args)]
pub struct BirthArgs {
    /// Name of the native
    #[arg(long)]
    name: String,

    /// Birth date, YYYY-MM-DD
    #[arg(long)]
    birth_date: String,

    /// Birth time, HH:MM (24-hour)
    #[arg(long)]
    birth_time: String,

    /// Birth place, e.g. "Pune, India"
    #[arg(long)]
    birth_place: String,

    /// Reply language: en or hi
    #[arg(long, default_value = "en", value_parser = parse_language)]
    language: Language,
}

impl BirthArgs {
    pub fn into_profile(self) -> anyhow::Result<UserProfile> {
        let profile = UserProfile {
            name: self.name,
            birth_date: self.birth_date,
            birth_time: self.birth_time,
            birth_place: self.birth_place,
            preferred_language: self.language,
        };
        profile.validate()?;
        Ok(profile)
    }
}

/// Birth details that may be omitted when continuing a session.
#[derive(Args)]
pub struct OptionalBirthArgs {
    #[arg(long, requires_all = ["birth_date", "birth_time", "birth_place"])]
    name: Option<String>,

    #[arg(long)]
    birth_date: Option<String>,

    #[arg(long)]
    birth_time: Option<String>,

    #[arg(long)]
    birth_place: Option<String>,

    #[arg(long, default_value = "en", value_parser = parse_language)]
    language: Language,
}

impl OptionalBirthArgs {
    pub fn into_profile(self) -> anyhow::Result<Option<UserProfile>> {
        let (Some(name), Some(birth_date), Some(birth_time), Some(birth_place)) =
            (self.name, self.birth_date, self.birth_time, self.birth_place)
        else {
            return Ok(None);
        };
        BirthArgs {
            name,
            birth_date,
            birth_time,
            birth_place,
            language: self.language,
        }
        .into_profile()
        .map(Some)
    }
}

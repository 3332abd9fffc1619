//! Configuration loading, validation, and management for Nakshatra.
//!
//! Loads configuration from `~/.nakshatra/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! Environment variables (highest priority):
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `OPENAI_API_KEY` | `llm.api_key` | none |
//! | `OPENAI_BASE_URL` | `llm.base_url` | `https://api.openai.com/v1` |
//! | `LLM_CHAT_MODEL` | `llm.chat_model` | `gpt-4o-mini` |
//! | `LLM_CHAT_TEMPERATURE` | `llm.chat_temperature` | `0.7` |
//! | `LLM_STRUCTURED_MODEL` | `llm.structured_model` | `gpt-4o-mini` |
//! | `LLM_STRUCTURED_TEMPERATURE` | `llm.structured_temperature` | `0.0` |
//! | `OPENAI_MODEL` | `llm.embedding_model` | `text-embedding-3-small` |
//! | `CHROMA_URL` | `knowledge.chroma_url` | `http://localhost:8000` |
//! | `NAKSHATRA_KNOWLEDGE_BACKEND` | `knowledge.backend` | `chroma` |
//! | `NAKSHATRA_SESSION_BACKEND` | `session.backend` | `memory` |
//! | `NAKSHATRA_CHART_SERVICE_URL` | `chart.service_url` | `http://localhost:8088` |
//! | `NAKSHATRA_GEOCODER_URL` | `chart.geocoder_url` | `https://nominatim.openstreetmap.org` |
//! | `NAKSHATRA_HOST` | `gateway.host` | `127.0.0.1` |
//! | `NAKSHATRA_PORT` | `gateway.port` | `8000` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.nakshatra/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion and embedding models
    #[serde(default)]
    pub llm: LlmConfig,

    /// Vector store and ingestion
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Chart calculation and geocoding collaborators
    #[serde(default)]
    pub chart: ChartConfig,

    /// Retrieval planning
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Conversation persistence
    #[serde(default)]
    pub session: SessionConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model that writes the final answer
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,

    /// Model that produces the retrieval plan as JSON
    #[serde(default = "default_structured_model")]
    pub structured_model: String,

    #[serde(default)]
    pub structured_temperature: f32,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_chat_temperature() -> f32 {
    0.7
}
fn default_structured_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            chat_temperature: default_chat_temperature(),
            structured_model: default_structured_model(),
            structured_temperature: 0.0,
            embedding_model: default_embedding_model(),
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("chat_temperature", &self.chat_temperature)
            .field("structured_model", &self.structured_model)
            .field("structured_temperature", &self.structured_temperature)
            .field("embedding_model", &self.embedding_model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// `chroma`, `local`, or `memory` (non-persistent)
    #[serde(default = "default_knowledge_backend")]
    pub backend: String,

    #[serde(default = "default_chroma_url")]
    pub chroma_url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// Passages returned per retrieval
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// JSONL index used by the `local` backend
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,

    /// Source files read by `nakshatra ingest`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Documents embedded per provider call during ingestion
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_knowledge_backend() -> String {
    "chroma".into()
}
fn default_chroma_url() -> String {
    "http://localhost:8000".into()
}
fn default_collection() -> String {
    "astro_docs".into()
}
fn default_top_k() -> usize {
    5
}
fn default_local_path() -> PathBuf {
    AppConfig::config_dir().join("knowledge.jsonl")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_batch_size() -> usize {
    64
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            backend: default_knowledge_backend(),
            chroma_url: default_chroma_url(),
            collection: default_collection(),
            top_k: default_top_k(),
            local_path: default_local_path(),
            data_dir: default_data_dir(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Root of the chart calculation service
    #[serde(default = "default_chart_service_url")]
    pub service_url: String,

    /// Nominatim-compatible search endpoint root
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Nominatim rejects requests without an identifying agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_ayanamsa")]
    pub ayanamsa: String,

    #[serde(default = "default_house_system")]
    pub house_system: String,

    /// Fixed `+HH:MM` offset; unset lets the chart service derive it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,

    #[serde(default = "default_chart_timeout")]
    pub timeout_secs: u64,
}

fn default_chart_service_url() -> String {
    "http://localhost:8088".into()
}
fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org".into()
}
fn default_user_agent() -> String {
    format!("nakshatra/{}", env!("CARGO_PKG_VERSION"))
}
fn default_ayanamsa() -> String {
    "Lahiri".into()
}
fn default_house_system() -> String {
    "Equal".into()
}
fn default_chart_timeout() -> u64 {
    20
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            service_url: default_chart_service_url(),
            geocoder_url: default_geocoder_url(),
            user_agent: default_user_agent(),
            ayanamsa: default_ayanamsa(),
            house_system: default_house_system(),
            utc_offset: None,
            timeout_secs: default_chart_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Messages of recent history shown to the planner
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Characters kept from each history message
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

fn default_history_turns() -> usize {
    6
}
fn default_excerpt_chars() -> usize {
    200
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `memory` or `sqlite`
    #[serde(default = "default_session_backend")]
    pub backend: String,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_session_backend() -> String {
    "memory".into()
}
fn default_sqlite_path() -> PathBuf {
    AppConfig::config_dir().join("sessions.db")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_session_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// A turn still running after this is dropped before it is saved
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins; empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Requests per minute across all clients; 0 disables the limit
    #[serde(default)]
    pub rate_limit_per_minute: u32,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_max_body_bytes() -> usize {
    64 * 1024
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout(),
            cors_origins: Vec::new(),
            rate_limit_per_minute: 0,
        }
    }
}

const KNOWLEDGE_BACKENDS: &[&str] = &["chroma", "local", "memory"];
const SESSION_BACKENDS: &[&str] = &["memory", "sqlite"];

impl AppConfig {
    /// Load configuration from the default path, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path` (defaults when missing), then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read(path)?;
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("LLM_CHAT_MODEL") {
            self.llm.chat_model = model;
        }
        if let Some(model) = lookup("LLM_STRUCTURED_MODEL") {
            self.llm.structured_model = model;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.embedding_model = model;
        }
        if let Some(raw) = lookup("LLM_CHAT_TEMPERATURE") {
            self.llm.chat_temperature = parse_env("LLM_CHAT_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = lookup("LLM_STRUCTURED_TEMPERATURE") {
            self.llm.structured_temperature = parse_env("LLM_STRUCTURED_TEMPERATURE", &raw)?;
        }
        if let Some(url) = lookup("CHROMA_URL") {
            self.knowledge.chroma_url = url;
        }
        if let Some(backend) = lookup("NAKSHATRA_KNOWLEDGE_BACKEND") {
            self.knowledge.backend = backend;
        }
        if let Some(backend) = lookup("NAKSHATRA_SESSION_BACKEND") {
            self.session.backend = backend;
        }
        if let Some(url) = lookup("NAKSHATRA_CHART_SERVICE_URL") {
            self.chart.service_url = url;
        }
        if let Some(url) = lookup("NAKSHATRA_GEOCODER_URL") {
            self.chart.geocoder_url = url;
        }
        if let Some(host) = lookup("NAKSHATRA_HOST") {
            self.gateway.host = host;
        }
        if let Some(raw) = lookup("NAKSHATRA_PORT") {
            self.gateway.port = parse_env("NAKSHATRA_PORT", &raw)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".nakshatra")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("llm.chat_temperature", self.llm.chat_temperature),
            ("llm.structured_temperature", self.llm.structured_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.knowledge.top_k == 0 {
            return Err(ConfigError::ValidationError("knowledge.top_k must be > 0".into()));
        }

        if self.knowledge.batch_size == 0 {
            return Err(ConfigError::ValidationError("knowledge.batch_size must be > 0".into()));
        }

        if !KNOWLEDGE_BACKENDS.contains(&self.knowledge.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "knowledge.backend must be one of {KNOWLEDGE_BACKENDS:?}, got '{}'",
                self.knowledge.backend
            )));
        }

        if !SESSION_BACKENDS.contains(&self.session.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "session.backend must be one of {SESSION_BACKENDS:?}, got '{}'",
                self.session.backend
            )));
        }

        if let Some(offset) = &self.chart.utc_offset {
            if !is_utc_offset(offset) {
                return Err(ConfigError::ValidationError(format!(
                    "chart.utc_offset '{offset}' must look like +05:30"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{name}='{raw}' is not a valid value")))
}

/// `+HH:MM` / `-HH:MM` with hours up to 14 and minutes below 60.
pub fn is_utc_offset(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 6 || !matches!(bytes[0], b'+' | b'-') || bytes[3] != b':' {
        return false;
    }
    let (Ok(hours), Ok(minutes)) = (raw[1..3].parse::<u8>(), raw[4..6].parse::<u8>()) else {
        return false;
    };
    hours <= 14 && minutes < 60
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.chat_model, "gpt-4o-mini");
        assert_eq!(config.llm.structured_temperature, 0.0);
        assert_eq!(config.llm.embedding_model, "text-embedding-3-small");
        assert_eq!(config.knowledge.collection, "astro_docs");
        assert_eq!(config.knowledge.top_k, 5);
        assert_eq!(config.chart.ayanamsa, "Lahiri");
        assert_eq!(config.chart.house_system, "Equal");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.chat_model, config.llm.chat_model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[knowledge]\nbackend = \"local\"\ntop_k = 3\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.knowledge.backend, "local");
        assert_eq!(config.knowledge.top_k, 3);
        assert_eq!(config.knowledge.collection, "astro_docs");
        assert_eq!(config.llm.chat_model, "gpt-4o-mini");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nchat_model = ").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.session.backend, "memory");
    }

    #[test]
    fn env_overrides_models_and_temperatures() {
        let mut config = AppConfig::default();
        config
            .apply_env_with(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("LLM_CHAT_MODEL", "gpt-4o"),
                ("LLM_CHAT_TEMPERATURE", "0.2"),
                ("LLM_STRUCTURED_TEMPERATURE", "0"),
                ("OPENAI_MODEL", "text-embedding-3-large"),
                ("NAKSHATRA_PORT", "9100"),
            ]))
            .unwrap();
        assert!(config.has_api_key());
        assert_eq!(config.llm.chat_model, "gpt-4o");
        assert!((config.llm.chat_temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.llm.embedding_model, "text-embedding-3-large");
        assert_eq!(config.gateway.port, 9100);
    }

    #[test]
    fn bad_numeric_env_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_with(env(&[("LLM_CHAT_TEMPERATURE", "warm")]))
            .unwrap_err();
        assert!(err.to_string().contains("LLM_CHAT_TEMPERATURE"));
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[("OPENAI_API_KEY", "")])).unwrap();
        assert!(!config.has_api_key());
    }

    #[test]
    fn invalid_settings_rejected() {
        let mut config = AppConfig::default();
        config.llm.chat_temperature = 5.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.knowledge.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.knowledge.backend = "pinecone".into();
        assert!(config.validate().unwrap_err().to_string().contains("pinecone"));

        let mut config = AppConfig::default();
        config.session.backend = "redis".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.chart.utc_offset = Some("5:30".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn utc_offsets() {
        assert!(is_utc_offset("+05:30"));
        assert!(is_utc_offset("-03:00"));
        assert!(!is_utc_offset("05:30"));
        assert!(!is_utc_offset("+5:30"));
        assert!(!is_utc_offset("+15:00"));
        assert!(!is_utc_offset("+05:60"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("astro_docs"));
    }
}

//! LLM Provider implementations for Nakshatra.
//!
//! All providers implement the `nakshatra_core::Provider` trait. Chat,
//! structured planning and embeddings all go through one OpenAI-compatible
//! endpoint; which models are used is decided by the callers.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use std::time::Duration;

use nakshatra_config::AppConfig;
use nakshatra_core::{Provider, ProviderError};

/// Build the provider described by configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.llm.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured("no API key: set OPENAI_API_KEY or llm.api_key".into())
    })?;

    let provider = OpenAiCompatProvider::new("openai", &config.llm.base_url, api_key)?
        .with_timeout(Duration::from_secs(config.llm.timeout_secs))?;

    tracing::debug!(base_url = %config.llm.base_url, "Configured OpenAI-compatible provider");
    Ok(Arc::new(provider))
}

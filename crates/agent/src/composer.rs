//! Response composer: the astrologer's reply for one turn.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use nakshatra_config::AppConfig;
use nakshatra_core::chart::ChartSummary;
use nakshatra_core::error::Error;
use nakshatra_core::knowledge::{ContextCategory, KnowledgePassage, categories_of};
use nakshatra_core::message::Message;
use nakshatra_core::profile::Language;
use nakshatra_core::provider::{Provider, ProviderRequest};
use tracing::{debug, warn};

use crate::prompts;

/// A generated reply and the knowledge categories that grounded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub reply: String,
    pub context_used: Vec<ContextCategory>,
}

pub struct Composer {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Composer {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self {
            provider,
            model: config.llm.chat_model.clone(),
            temperature: config.llm.chat_temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    /// Compose the reply dated today in local time.
    pub async fn compose(
        &self,
        message: &str,
        chart: Option<&ChartSummary>,
        history: &[Message],
        passages: &[KnowledgePassage],
        language: Language,
    ) -> Result<Composition, Error> {
        self.compose_on(message, chart, history, passages, language, Local::now().date_naive())
            .await
    }

    /// Compose the reply as of `today`, which selects the running dasha.
    pub async fn compose_on(
        &self,
        message: &str,
        chart: Option<&ChartSummary>,
        history: &[Message],
        passages: &[KnowledgePassage],
        language: Language,
        today: NaiveDate,
    ) -> Result<Composition, Error> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(prompts::composer_system(chart, passages, language, today)));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(message));

        let mut request = ProviderRequest::new(&self.model, messages).with_temperature(self.temperature);
        request.max_tokens = self.max_tokens;

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Reply generation failed");
            Error::Generation(e.to_string())
        })?;

        let reply = response.message.content.trim().to_string();
        if reply.is_empty() {
            return Err(Error::Generation("model returned an empty reply".into()));
        }

        let context_used = categories_of(passages);
        debug!(
            model = %response.model,
            passages = passages.len(),
            context = ?context_used,
            "Composed reply"
        );
        Ok(Composition { reply, context_used })
    }
}

//! Per-session conversation state and the store that persists it between requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::ChartSummary;
use crate::error::SessionError;
use crate::knowledge::ContextCategory;
use crate::message::{Message, Role};
use crate::profile::{Language, UserProfile};

/// Everything remembered about one consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,

    /// Append-only history of user and assistant turns
    #[serde(default)]
    pub messages: Vec<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSummary>,

    /// Categories consulted by the most recent turn
    #[serde(default)]
    pub last_context: Vec<ContextCategory>,

    #[serde(default)]
    pub language: Language,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            profile: None,
            chart: None,
            last_context: Vec::new(),
            language: Language::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the profile and its resolved chart. Called once, when the session starts.
    pub fn attach_chart(&mut self, profile: UserProfile, chart: ChartSummary) {
        self.language = profile.preferred_language;
        self.profile = Some(profile);
        self.chart = Some(chart);
        self.updated_at = Utc::now();
    }

    /// Record a completed exchange.
    pub fn record_turn(&mut self, user: Message, assistant: Message, context: Vec<ContextCategory>) {
        self.messages.push(user);
        self.messages.push(assistant);
        self.last_context = context;
        self.updated_at = Utc::now();
    }

    /// The last `limit` messages, oldest first.
    pub fn recent(&self, limit: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    pub fn turn_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}

/// Persists [`ConversationState`] keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` for a session that has never been saved.
    async fn load(&self, session_id: &str) -> std::result::Result<Option<ConversationState>, SessionError>;

    /// Insert or replace the state stored under `state.session_id`.
    async fn save(&self, state: &ConversationState) -> std::result::Result<(), SessionError>;

    async fn count(&self) -> std::result::Result<usize, SessionError>;

    async fn health_check(&self) -> std::result::Result<bool, SessionError> {
        self.count().await.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_turn_appends_both_messages() {
        let mut state = ConversationState::new("s-1");
        let created = state.updated_at;
        state.record_turn(
            Message::user("Hi"),
            Message::assistant("Namaste"),
            vec![ContextCategory::ZodiacTraits],
        );
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.turn_count(), 1);
        assert_eq!(state.last_context, vec![ContextCategory::ZodiacTraits]);
        assert!(state.updated_at >= created);
    }

    #[test]
    fn recent_returns_tail() {
        let mut state = ConversationState::new("s-2");
        for i in 0..4 {
            state.record_turn(Message::user(format!("q{i}")), Message::assistant(format!("a{i}")), vec![]);
        }
        let tail = state.recent(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].content, "a2");
        assert_eq!(tail[2].content, "a3");
        assert_eq!(state.recent(100).len(), 8);
    }

    #[test]
    fn state_survives_json() {
        let mut state = ConversationState::new("s-3");
        state.record_turn(Message::user("q"), Message::assistant("a"), vec![]);
        let json = serde_json::to_string(&state).unwrap();
        let back: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}

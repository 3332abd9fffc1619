//! The turn pipeline: one user message in, one astrologer reply out.
//!
//! Steps run strictly in sequence:
//!
//! 1. validate the message
//! 2. load the session, or resolve the chart for a new one
//! 3. plan, then gate
//! 4. retrieve (a failing store degrades to no passages)
//! 5. compose
//! 6. record the exchange and save
//!
//! Any error before step 6 leaves the stored session untouched.

use std::sync::Arc;

use chrono::Local;
use nakshatra_chart::ChartResolver;
use nakshatra_core::error::{Error, ValidationError};
use nakshatra_core::knowledge::{ContextCategory, KnowledgePassage};
use nakshatra_core::message::Message;
use nakshatra_core::profile::UserProfile;
use nakshatra_core::session::SessionStore;
use nakshatra_core::vocabulary::ZodiacSign;
use serde::Serialize;
use tracing::{info, warn};

use crate::composer::Composer;
use crate::gate::{Route, route};
use crate::planner::Planner;
use crate::retriever::Retriever;

/// The result of one completed turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub context_used: Vec<ContextCategory>,
    pub sun_sign: Option<ZodiacSign>,
    pub moon_sign: Option<ZodiacSign>,
    pub ascendant_sign: Option<ZodiacSign>,
    pub current_dasha: Option<String>,
    /// The knowledge store answered a search this turn.
    pub retrieval_ran: bool,
}

pub struct TurnPipeline {
    resolver: Arc<ChartResolver>,
    planner: Planner,
    retriever: Retriever,
    composer: Composer,
    sessions: Arc<dyn SessionStore>,
}

impl TurnPipeline {
    pub fn new(
        resolver: Arc<ChartResolver>,
        planner: Planner,
        retriever: Retriever,
        composer: Composer,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            resolver,
            planner,
            retriever,
            composer,
            sessions,
        }
    }

    pub fn resolver(&self) -> &Arc<ChartResolver> {
        &self.resolver
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Run one turn for `session_id`.
    ///
    /// `profile` is required when the session does not exist yet and
    /// ignored otherwise.
    pub async fn run_turn(
        &self,
        session_id: &str,
        message: &str,
        profile: Option<&UserProfile>,
    ) -> Result<TurnOutcome, Error> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(ValidationError::EmptyField("session_id").into());
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyField("message").into());
        }

        let mut state = self
            .resolver
            .resolve_session(self.sessions.as_ref(), session_id, profile)
            .await?;

        // The planner works from a short window, the composer from everything.
        let recent = state.recent(self.planner.history_turns()).to_vec();
        let history = state.messages.clone();
        let chart = state.chart.as_ref();

        let decision = self
            .planner
            .plan(message, chart, &recent, &state.last_context)
            .await;

        let (passages, retrieval_ran): (Vec<KnowledgePassage>, bool) = match route(&decision) {
            Route::Retrieve(query) => match self.retriever.retrieve(query).await {
                Ok(passages) => (passages, true),
                Err(e) => {
                    warn!(session_id, error = %e, "Retrieval failed, answering from the chart alone");
                    (Vec::new(), false)
                }
            },
            Route::Compose => (Vec::new(), false),
        };

        let composition = self
            .composer
            .compose(message, chart, &history, &passages, state.language)
            .await?;

        let today = Local::now().date_naive();
        let outcome = TurnOutcome {
            reply: composition.reply.clone(),
            context_used: composition.context_used.clone(),
            sun_sign: chart.and_then(|c| c.sun_sign()),
            moon_sign: chart.and_then(|c| c.moon_sign()),
            ascendant_sign: chart.and_then(|c| c.ascendant_sign()),
            current_dasha: chart.and_then(|c| c.current_dasha(today)).map(|d| d.describe()),
            retrieval_ran,
        };

        state.record_turn(
            Message::user(message),
            Message::assistant(composition.reply),
            composition.context_used,
        );
        self.sessions.save(&state).await?;

        info!(
            session_id,
            needs_retrieval = decision.needs_retrieval(),
            retrieval_ran,
            passages = passages.len(),
            turns = state.turn_count(),
            "Turn completed"
        );
        Ok(outcome)
    }
}

//! The consultation turn pipeline for Nakshatra.
//!
//! Each user message runs through a fixed chain of stages:
//!
//! 1. **Resolve** the session and its kundali ([`nakshatra_chart::ChartResolver`])
//! 2. **Plan** whether the knowledge base is needed ([`Planner`])
//! 3. **Gate** on that decision ([`gate::route`])
//! 4. **Retrieve** matching passages ([`Retriever`])
//! 5. **Compose** the astrologer's reply ([`Composer`])
//!
//! Planning and retrieval heal themselves: a broken plan or an unreachable
//! store only means the reply is grounded in the chart alone. Composition
//! failures fail the turn.

pub mod composer;
pub mod gate;
pub mod pipeline;
pub mod planner;
pub mod prompts;
pub mod retriever;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use composer::{Composer, Composition};
pub use gate::Route;
pub use pipeline::{TurnOutcome, TurnPipeline};
pub use planner::{Planner, RetrievalDecision};
pub use retriever::Retriever;

use std::sync::Arc;

use nakshatra_chart::ChartResolver;
use nakshatra_config::AppConfig;
use nakshatra_core::knowledge::KnowledgeStore;
use nakshatra_core::provider::Provider;
use nakshatra_core::session::SessionStore;

/// Wire a pipeline from configuration and already-built collaborators.
pub fn build_pipeline(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    knowledge: Arc<dyn KnowledgeStore>,
    sessions: Arc<dyn SessionStore>,
    resolver: Arc<ChartResolver>,
) -> TurnPipeline {
    TurnPipeline::new(
        resolver,
        Planner::from_config(provider.clone(), config),
        Retriever::new(knowledge, config.knowledge.top_k),
        Composer::from_config(provider, config),
        sessions,
    )
}

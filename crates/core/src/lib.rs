//! # Nakshatra Core
//!
//! Domain types, traits, and error definitions for the Nakshatra astrology
//! assistant. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here (the LLM provider, the
//! knowledge store, the geocoder, the chart calculator, the session store).
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod vocabulary;
pub mod profile;
pub mod chart;
pub mod knowledge;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{ChartError, Error, KnowledgeError, ProviderError, Result, SessionError, ValidationError};
pub use message::{Message, Role};
pub use provider::{EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, ResponseFormat};
pub use vocabulary::{LifeArea, Nakshatra, Planet, ZodiacSign};
pub use profile::{Language, UserProfile};
pub use chart::{ChartCalculator, ChartComputation, ChartRequest, ChartSummary, CurrentDasha, Geocoder, GeoLocation};
pub use knowledge::{
    categories_of, ContextCategory, KnowledgeDocument, KnowledgePassage, KnowledgeStore, MetadataFilters, MetadataTags,
    RetrievalQuery,
};
pub use session::{ConversationState, SessionStore};

//! Error types for the Nakshatra domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Nakshatra operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Knowledge store errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Chart errors ---
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    // --- Session store errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Input validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Final answer generation ---
    #[error("Generation failed: {0}")]
    Generation(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Knowledge store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Ingestion failed for {source_name}: {reason}")]
    Ingestion { source_name: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum ChartError {
    #[error("Birth place not found: {0}")]
    PlaceNotFound(String),

    #[error("Geocoding failed: {0}")]
    Geocoding(String),

    #[error("Chart service failed: {0}")]
    Service(String),

    #[error("Invalid birth data: {0}")]
    InvalidBirthData(String),
}

#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt session state for {session_id}: {reason}")]
    Corrupt { session_id: String, reason: String },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid birth date '{0}', expected YYYY-MM-DD")]
    BirthDate(String),

    #[error("Invalid birth time '{0}', expected HH:MM")]
    BirthTime(String),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("A user profile is required to start session {0}")]
    ProfileRequired(String),

    #[error("Invalid UTC offset '{0}', expected +HH:MM or -HH:MM")]
    UtcOffset(String),
}

impl Error {
    /// True when the error is caused by bad caller input rather than a failing collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::Chart(ChartError::PlaceNotFound(_) | ChartError::InvalidBirthData(_))
                | Error::Session(SessionError::NotFound(_))
        )
    }
}

//! Session store implementations for Nakshatra.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemorySessionStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;

use std::sync::Arc;

use nakshatra_config::AppConfig;
use nakshatra_core::{SessionError, SessionStore};

/// Build the session store selected by `session.backend`.
pub async fn build_from_config(config: &AppConfig) -> Result<Arc<dyn SessionStore>, SessionError> {
    match config.session.backend.as_str() {
        "memory" => Ok(Arc::new(InMemorySessionStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = &config.session.sqlite_path;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SessionError::Storage(format!("Failed to create session directory: {e}")))?;
            }
            let url = format!("sqlite://{}", path.display());
            Ok(Arc::new(SqliteSessionStore::new(&url).await?))
        }
        other => Err(SessionError::Storage(format!("unknown session backend '{other}'"))),
    }
}

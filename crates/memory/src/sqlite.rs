//! SQLite session store.
//!
//! One row per session. The full [`ConversationState`] is stored as a JSON
//! document; `updated_at` is kept in its own column for inspection and
//! housekeeping queries.

use async_trait::async_trait;
use nakshatra_core::error::SessionError;
use nakshatra_core::session::{ConversationState, SessionStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (creating if missing) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, SessionError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| SessionError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to an in-memory database sees its own empty database.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| SessionError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite session store initialized at {path}");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, SessionError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id          TEXT PRIMARY KEY NOT NULL,
                state       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::MigrationFailed(format!("sessions table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_updated_at ON sessions(updated_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| SessionError::MigrationFailed(format!("updated_at index: {e}")))?;

        debug!("SQLite session migrations complete");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, SessionError> {
        let row = sqlx::query("SELECT state FROM sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::Storage(format!("load {session_id}: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let json: String = row
            .try_get("state")
            .map_err(|e| SessionError::Storage(format!("state column: {e}")))?;
        serde_json::from_str(&json).map(Some).map_err(|e| SessionError::Corrupt {
            session_id: session_id.to_string(),
            reason: e.to_string(),
        })
    }

    async fn save(&self, state: &ConversationState) -> Result<(), SessionError> {
        let json = serde_json::to_string(state)
            .map_err(|e| SessionError::Storage(format!("State serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&state.session_id)
        .bind(&json)
        .bind(state.created_at.to_rfc3339())
        .bind(state.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(format!("save {}: {e}", state.session_id)))?;

        debug!(session_id = %state.session_id, messages = state.messages.len(), "Session saved");
        Ok(())
    }

    async fn count(&self) -> Result<usize, SessionError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SessionError::Storage(format!("count: {e}")))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| SessionError::Storage(format!("count column: {e}")))?;
        Ok(n as usize)
    }
}

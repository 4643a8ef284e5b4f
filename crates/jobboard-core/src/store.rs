// SQLite persistence for the signed-in session.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

use crate::models::{AuthPayload, User};

/// Key under which the session is stored.
const SESSION_KEY: &str = "auth";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create session directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// SQLite-backed key-value store holding the token and user of the current
/// session.
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (or create) the store at `path`, creating parent directories as
    /// needed. Pass `":memory:"` for an ephemeral store (useful for tests).
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("session store mutex poisoned")
    }

    /// Persist the token and user, replacing any previous session.
    pub fn save(&self, token: &str, user: &User) -> Result<(), StoreError> {
        let payload = AuthPayload {
            token: token.to_string(),
            user: user.clone(),
        };
        let json = serde_json::to_string(&payload)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
            params![SESSION_KEY, json],
        )?;
        debug!(user_id = %user.id, "session saved");
        Ok(())
    }

    /// Load the saved session, if any.
    pub fn load(&self) -> Result<Option<AuthPayload>, StoreError> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![SESSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Remove the saved session. A no-op when nothing is stored.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.conn().execute(
            "DELETE FROM session_state WHERE key = ?1",
            params![SESSION_KEY],
        )?;
        debug!("session cleared");
        Ok(())
    }
}

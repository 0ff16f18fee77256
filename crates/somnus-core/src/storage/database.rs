//! SQLite-based session history.
//!
//! Provides persistent storage for:
//! - The most recent completed sessions
//! - A running count of every completed session
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{data_dir, SessionStore};
use crate::error::DatabaseError;

/// Number of session records kept; older ones are pruned on insert.
pub const HISTORY_LIMIT: usize = 30;

const TOTAL_KEY: &str = "completed_total";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub duration_min: u32,
    pub status: String,
    pub completed_at: DateTime<Utc>,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/somnus/somnus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> crate::error::Result<Self> {
        let path = data_dir()?.join("somnus.db");
        Ok(Self::open_at(&path)?)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                duration_min INTEGER NOT NULL,
                status       TEXT NOT NULL DEFAULT 'completed',
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);",
        )?;
        Ok(())
    }

    /// Insert a record stamped `completed_at`, prune and bump the total.
    pub fn record_session(
        &mut self,
        duration_min: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sessions (duration_min, status, completed_at) VALUES (?1, 'completed', ?2)",
            params![duration_min, completed_at.to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid();
        let pruned = tx.execute(
            "DELETE FROM sessions WHERE id NOT IN
                (SELECT id FROM sessions ORDER BY id DESC LIMIT ?1)",
            params![HISTORY_LIMIT as i64],
        )?;
        tx.execute(
            "INSERT INTO kv (key, value) VALUES (?1, '1')
             ON CONFLICT(key) DO UPDATE SET value = CAST(value AS INTEGER) + 1",
            params![TOTAL_KEY],
        )?;
        tx.commit()?;
        debug!(id, duration_min, pruned, "session recorded");
        Ok(id)
    }

    /// Drop every record and reset the total.
    pub fn clear_history(&mut self) -> Result<usize, DatabaseError> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM sessions", [])?;
        tx.execute("DELETE FROM kv WHERE key = ?1", params![TOTAL_KEY])?;
        tx.commit()?;
        Ok(removed)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn save_completed_session(&mut self, duration_min: u32) -> Result<i64, DatabaseError> {
        self.record_session(duration_min, Utc::now())
    }

    fn list_recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        let limit = limit.min(HISTORY_LIMIT);
        let mut stmt = self.conn.prepare(
            "SELECT id, duration_min, status, completed_at
             FROM sessions ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, duration_min, status, completed_at) = row?;
            let completed_at = DateTime::parse_from_rfc3339(&completed_at)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp for session {id}: {e}")))?
                .with_timezone(&Utc);
            records.push(SessionRecord {
                id,
                duration_min,
                status,
                completed_at,
            });
        }
        Ok(records)
    }

    fn total_completed_count(&self) -> Result<u64, DatabaseError> {
        match self.kv_get(TOTAL_KEY)? {
            Some(value) => value
                .parse()
                .map_err(|_| DatabaseError::QueryFailed(format!("corrupt counter '{value}'"))),
            None => Ok(0),
        }
    }
}

//! SQLite-based progress storage.
//!
//! Provides persistent storage for:
//! - Key-value records backing the [`PlayStore`](super::PlayStore)
//! - A log of completed sessions and per-user statistics

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::{data_dir, KvBackend};
use crate::error::{DatabaseError, Result};
use crate::session::{SessionKey, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSession {
    pub id: i64,
    pub user_id: String,
    pub level: u32,
    pub session: u32,
    pub duration_secs: u64,
    pub score: f64,
    pub forced: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_secs: u64,
    pub total_score: f64,
    pub forced_endings: u64,
    pub highest_level: u32,
}

/// One connection shared between the progress store and the session log.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// SQLite database for progress storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/flamekeeper/flamekeeper.db`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(data_dir()?.join("flamekeeper.db"))
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS completed_sessions (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       TEXT NOT NULL,
                level         INTEGER NOT NULL,
                session       INTEGER NOT NULL,
                duration_secs INTEGER NOT NULL,
                score         REAL NOT NULL DEFAULT 0,
                forced        INTEGER NOT NULL DEFAULT 0,
                completed_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_completed_sessions_user ON completed_sessions(user_id);",
        )?;
        Ok(())
    }

    /// Record a finished session.
    pub fn record_session(
        &self,
        key: &SessionKey,
        duration_secs: u64,
        score: f64,
        forced: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO completed_sessions (user_id, level, session, duration_secs, score, forced, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                key.user().as_str(),
                key.level(),
                key.session(),
                duration_secs,
                score,
                forced,
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, user: &UserId, limit: usize) -> Result<Vec<CompletedSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, level, session, duration_secs, score, forced, completed_at
             FROM completed_sessions
             WHERE user_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user.as_str(), limit as i64], |row| {
            let completed_at: String = row.get(7)?;
            Ok(CompletedSession {
                id: row.get(0)?,
                user_id: row.get(1)?,
                level: row.get(2)?,
                session: row.get(3)?,
                duration_secs: row.get(4)?,
                score: row.get(5)?,
                forced: row.get(6)?,
                completed_at: DateTime::parse_from_rfc3339(&completed_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e))
                    })?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn stats(&self, user: &UserId) -> Result<Stats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_secs), 0), COALESCE(SUM(score), 0),
                    COALESCE(SUM(forced), 0), COALESCE(MAX(level), 0)
             FROM completed_sessions
             WHERE user_id = ?1",
            params![user.as_str()],
            |row| {
                Ok(Stats {
                    total_sessions: row.get(0)?,
                    total_secs: row.get(1)?,
                    total_score: row.get(2)?,
                    forced_endings: row.get(3)?,
                    highest_level: row.get(4)?,
                })
            },
        )?;
        Ok(stats)
    }
}

impl KvBackend for Database {
    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn kv_set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn kv_delete(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn kv_delete_prefix(&mut self, prefix: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM kv WHERE substr(key, 1, length(?1)) = ?1",
            params![prefix],
        )?;
        Ok(removed)
    }
}

fn lock(db: &SharedDatabase) -> MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl KvBackend for SharedDatabase {
    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        lock(self).kv_get(key)
    }

    fn kv_set(&mut self, key: &str, value: &str) -> Result<()> {
        lock(self).kv_set(key, value)
    }

    fn kv_delete(&mut self, key: &str) -> Result<()> {
        lock(self).kv_delete(key)
    }

    fn kv_delete_prefix(&mut self, prefix: &str) -> Result<usize> {
        lock(self).kv_delete_prefix(prefix)
    }
}

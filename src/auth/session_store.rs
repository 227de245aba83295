//! Session Storage
//! Mission: Persist login sessions (hashed key + expiry) in SQLite

use crate::db;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

/// Persisted session record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub user_id: Option<i64>,
    pub hashed_key: String,
    /// Unix milliseconds; `None` never expires.
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

impl Session {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            hashed_key: row.get(2)?,
            expires_at: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now_ms)
    }
}

/// Session storage with SQLite backend
pub struct SessionStore {
    db_path: String,
}

impl SessionStore {
    /// Create a new session store and initialize its table
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = db::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
                expires_at INTEGER,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS sessions_user_expiry ON sessions (user_id, expires_at)",
            [],
        )?;

        Ok(())
    }

    /// Store a new session and return it with its assigned id
    pub fn create(
        &self,
        user_id: Option<i64>,
        hashed_key: &str,
        expires_at: Option<i64>,
        now_ms: i64,
    ) -> Result<Session> {
        let conn = db::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO sessions (key, user_id, expires_at, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![hashed_key, user_id, expires_at, now_ms],
        )
        .context("Failed to insert session")?;

        let session = Session {
            id: conn.last_insert_rowid(),
            user_id,
            hashed_key: hashed_key.to_string(),
            expires_at,
            created_at: now_ms,
        };
        debug!("Created session {} for user {:?}", session.id, user_id);
        Ok(session)
    }

    /// Look up a session by id and owner that has not expired at `now_ms`
    pub fn find_valid(&self, session_id: i64, user_id: i64, now_ms: i64) -> Result<Option<Session>> {
        let conn = db::open(&self.db_path)?;
        conn.query_row(
            "SELECT id, user_id, key, expires_at, created_at FROM sessions
             WHERE id = ?1 AND user_id = ?2 AND (expires_at IS NULL OR expires_at > ?3)",
            params![session_id, user_id, now_ms],
            Session::from_row,
        )
        .optional()
        .context("Failed to query session")
    }

    pub fn delete(&self, session_id: i64) -> Result<usize> {
        let conn = db::open(&self.db_path)?;
        let rows = conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
            .context("Failed to delete session")?;
        Ok(rows)
    }

    /// Remove every session of a user (mass logout)
    pub fn delete_for_user(&self, user_id: i64) -> Result<usize> {
        let conn = db::open(&self.db_path)?;
        let rows = conn
            .execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])
            .context("Failed to delete user sessions")?;
        debug!("Deleted {} session(s) of user {}", rows, user_id);
        Ok(rows)
    }

    /// Remove all sessions expired at `now_ms`
    pub fn purge_expired(&self, now_ms: i64) -> Result<usize> {
        let conn = db::open(&self.db_path)?;
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now_ms],
            )
            .context("Failed to purge expired sessions")?;
        if rows > 0 {
            debug!("Purged {} expired session(s)", rows);
        }
        Ok(rows)
    }

    pub fn count_for_user(&self, user_id: i64) -> Result<usize> {
        let conn = db::open(&self.db_path)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. The engine hands it
//! serialized commands; it never executes SQL itself.

use crate::{
    error::{ReputationError, ReputationResult},
    types::SessionId,
};
use rusqlite::{params, Connection, OptionalExtension};

mod journal;

pub use journal::JournalEntry;

pub struct JournalStore {
    conn: Connection,
}

impl JournalStore {
    pub fn open(path: &str) -> ReputationResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ReputationResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ReputationResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_journal.sql"))?;
        Ok(())
    }

    // ── Session ────────────────────────────────────────────────

    pub fn insert_session(&self, session_id: &str, seed: u64, version: &str) -> ReputationResult<()> {
        let started_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO session (session_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            // SQLite integers are signed; the seed round-trips bit for bit.
            params![session_id, seed as i64, version, started_at],
        )?;
        Ok(())
    }

    pub fn session_seed(&self, session_id: &str) -> ReputationResult<u64> {
        let seed: Option<i64> = self
            .conn
            .query_row(
                "SELECT seed FROM session WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()?;
        seed.map(|s| s as u64).ok_or_else(|| ReputationError::SessionNotFound {
            session_id: session_id.to_string(),
        })
    }

    /// All session ids, oldest first.
    pub fn sessions(&self) -> ReputationResult<Vec<SessionId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT session_id FROM session ORDER BY started_at ASC, session_id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

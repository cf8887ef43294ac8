//! Store methods for the command journal.

use crate::{error::ReputationResult, types::Tick};
use rusqlite::params;

use super::JournalStore;

/// One journaled command. `payload` is the command's JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub seq:        Option<i64>,
    pub session_id: String,
    pub tick:       Tick,
    pub kind:       String,
    pub payload:    String,
}

impl JournalStore {
    /// Append an entry and return its sequence number.
    pub fn append_entry(&self, entry: &JournalEntry) -> ReputationResult<i64> {
        self.conn.execute(
            "INSERT INTO journal (session_id, tick, kind, payload) VALUES (?1, ?2, ?3, ?4)",
            params![entry.session_id, entry.tick as i64, entry.kind, entry.payload],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Every entry for a session in append order.
    pub fn entries_for_session(&self, session_id: &str) -> ReputationResult<Vec<JournalEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT seq, session_id, tick, kind, payload
             FROM journal WHERE session_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![session_id], |row| {
                Ok(JournalEntry {
                    seq:        Some(row.get(0)?),
                    session_id: row.get(1)?,
                    tick:       row.get::<_, i64>(2)? as u64,
                    kind:       row.get(3)?,
                    payload:    row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ── Test / summary helpers ────────────────────────────────────────

    pub fn entry_count(&self, session_id: &str, kind: &str) -> ReputationResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM journal WHERE session_id = ?1 AND kind = ?2",
            params![session_id, kind],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

use thiserror::Error;

/// Failures that can cross the crate boundary.
///
/// The simulation math itself never fails: malformed numbers are clamped.
/// Only persistence and text parsing produce these.
#[derive(Error, Debug)]
pub enum ReputationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown reputation trait '{name}'")]
    UnknownTrait { name: String },

    #[error("Session '{session_id}' not found in journal")]
    SessionNotFound { session_id: String },

    #[error("Journal corrupt at seq {seq}: {reason}")]
    JournalCorrupt { seq: i64, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ReputationResult<T> = Result<T, ReputationError>;

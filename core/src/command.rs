use serde::{Deserialize, Serialize};
use crate::{
    event::ReputationEventInput,
    types::{SessionId, Tick, Timestamp},
    world::IngestContext,
};

/// Everything that can change a session's derived state.
/// Variants are journaled by name and never renamed or removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ReputationCommand {
    Ingest {
        input:   ReputationEventInput,
        context: IngestContext,
    },
    Tick {
        elapsed_seconds: f64,
        timestamp:       Timestamp,
    },
}

impl ReputationCommand {
    /// Stable name used for the journal's `kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ingest { .. } => "ingest",
            Self::Tick { .. }   => "tick",
        }
    }
}

/// A queued command with its submission tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub session_id: SessionId,
    pub queued_at:  Tick,
    pub command_id: String,
    pub command:    ReputationCommand,
}

//! Shared primitive types used across the entire reputation pipeline.

use serde::{Deserialize, Serialize};

/// In-game time in seconds. All decay and TTL math runs on this clock.
pub type Timestamp = f64;

/// A stable, unique identifier for any observer or actor.
pub type EntityId = String;

/// Zone identifier supplied by the world collaborator.
pub type ZoneId = String;

/// Grid bucket identifier, formatted `"{cell_x}:{cell_y}"`.
pub type CellId = String;

/// Faction identifier (e.g. `"civilians"`, `"corpsec"`).
pub type FactionId = String;

/// The canonical session identifier used by the journal.
pub type SessionId = String;

/// A point on the zone's tile plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Monotonic tick counter for a session. Tick 0 means "no tick yet".
pub type Tick = u64;

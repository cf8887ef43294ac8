//! Session clock: owns the tick counter and in-game time.
//!
//! RULE: Time only moves forward through `advance`. Ingestion reads the
//! clock (as the fallback event timestamp) but never moves it.

use crate::types::{SessionId, Tick, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClock {
    pub session_id:      SessionId,
    pub current_tick:    Tick,
    /// Timestamp passed to the most recent tick; 0 before the first.
    pub now:             Timestamp,
    /// Sum of every tick's elapsed seconds.
    pub elapsed_seconds: f64,
}

impl SessionClock {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            current_tick:    0,
            now:             0.0,
            elapsed_seconds: 0.0,
        }
    }

    /// Advance one tick. Returns the new tick number.
    /// A timestamp earlier than `now` leaves `now` where it is.
    pub fn advance(&mut self, elapsed_seconds: f64, timestamp: Timestamp) -> Tick {
        self.current_tick += 1;
        if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
            self.elapsed_seconds += elapsed_seconds;
        }
        if timestamp.is_finite() && timestamp > self.now {
            self.now = timestamp;
        }
        self.current_tick
    }
}

//! Session orchestration.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!            |
//!            v
//!        Completed -> (start) -> Running
//! ```
//!
//! `stop()` and `set_duration()` return any state to `Idle`.

mod events;
mod orchestrator;
mod timers;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::{TrackId, TrackState};

pub use events::SessionEvent;
pub use orchestrator::{Collaborators, SessionOrchestrator};
pub use timers::{Timer, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// User-facing preferences a session runs with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub duration_min: u32,
    pub master_volume: f32,
    pub meditation_enabled: bool,
    pub alarm_enabled: bool,
    /// Forwarded to the native alarm scheduler.
    pub vibrate: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            duration_min: 60,
            master_volume: 0.5,
            meditation_enabled: true,
            alarm_enabled: false,
            vibrate: true,
        }
    }
}

/// Point-in-time view of the active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub state: SessionState,
    pub total_duration_secs: u64,
    pub remaining_secs: u64,
    pub master_volume: f32,
    pub meditation_enabled: bool,
    pub alarm_enabled: bool,
    pub vibrate: bool,
    /// The alarm is sounding and waits for acknowledgement.
    pub alarm_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub tracks: BTreeMap<TrackId, TrackState>,
}

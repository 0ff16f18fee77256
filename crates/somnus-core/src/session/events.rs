use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PlaybackSession;
use crate::audio::{PlayRoute, TrackId};
use crate::error::PlaybackErrorKind;

/// Every observable change in a session produces an event.
/// The host drains them after each call into the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Playback was requested before the first user gesture.
    PlaybackDeferred {
        at: DateTime<Utc>,
    },
    GestureObserved {
        replayed: usize,
        at: DateTime<Utc>,
    },
    SessionStarted {
        duration_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Tick {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TrackStarted {
        track: TrackId,
        route: PlayRoute,
        at: DateTime<Utc>,
    },
    /// A recoverable failure. The session keeps going.
    PlaybackError {
        kind: PlaybackErrorKind,
        track: Option<TrackId>,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        duration_min: u32,
        /// `None` when the record could not be stored.
        record_id: Option<i64>,
        at: DateTime<Utc>,
    },
    AlarmRaised {
        at: DateTime<Utc>,
    },
    AlarmAcknowledged {
        at: DateTime<Utc>,
    },
    SessionStopped {
        at: DateTime<Utc>,
    },
    /// Duration changed; the countdown starts over.
    SessionReset {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    VolumeChanged {
        master_volume: f32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        session: PlaybackSession,
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// The serde tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::PlaybackDeferred { .. } => "PlaybackDeferred",
            SessionEvent::GestureObserved { .. } => "GestureObserved",
            SessionEvent::SessionStarted { .. } => "SessionStarted",
            SessionEvent::SessionPaused { .. } => "SessionPaused",
            SessionEvent::Tick { .. } => "Tick",
            SessionEvent::TrackStarted { .. } => "TrackStarted",
            SessionEvent::PlaybackError { .. } => "PlaybackError",
            SessionEvent::SessionCompleted { .. } => "SessionCompleted",
            SessionEvent::AlarmRaised { .. } => "AlarmRaised",
            SessionEvent::AlarmAcknowledged { .. } => "AlarmAcknowledged",
            SessionEvent::SessionStopped { .. } => "SessionStopped",
            SessionEvent::SessionReset { .. } => "SessionReset",
            SessionEvent::VolumeChanged { .. } => "VolumeChanged",
            SessionEvent::StateSnapshot { .. } => "StateSnapshot",
        }
    }
}

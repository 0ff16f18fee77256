//! Audio backends and routing.
//!
//! ```text
//! TrackSequencer -> AudioRouter -> NativeBridgeBackend (when probed present)
//!                              \-> LocalMediaBackend   (always; per-call fallback)
//! ```

mod backend;
mod local;
mod native;
mod router;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use backend::{AudioBackend, PlayRoute, PlayStatus};
pub use local::{LocalMediaBackend, MediaElement, MediaHost, ReadyState};
pub use native::{NativeBridge, NativeBridgeBackend};
pub use router::AudioRouter;

/// The three logical tracks of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackId {
    /// Guided meditation, played once.
    Primary,
    /// Ambient bed, looped after the primary ends.
    Loop,
    /// End-of-session alarm, looped until acknowledged.
    Alarm,
}

impl TrackId {
    pub const ALL: [TrackId; 3] = [TrackId::Primary, TrackId::Loop, TrackId::Alarm];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackId::Primary => "primary",
            TrackId::Loop => "loop",
            TrackId::Alarm => "alarm",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            TrackId::Primary => 0,
            TrackId::Loop => 1,
            TrackId::Alarm => 2,
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-track lifecycle.
///
/// ```text
/// Unloaded -> Loading -> Ready -> Playing -> Paused
///                 \________________\-> Failed -> (explicit start) -> Unloaded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Unloaded,
    Loading,
    Ready,
    Playing,
    Paused,
    Failed,
}

/// Opaque media handle: a path, URL or asset name understood by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(pub String);

impl SourceRef {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Bundled asset for a track: `sounds/1.mp3`, `sounds/2.mp3`, `sounds/3.mp3`.
    pub fn default_for(track: TrackId) -> Self {
        Self(format!("sounds/{}.mp3", track.index() + 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Notifications a host feeds back about a media element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaEvent {
    /// Metadata is available; the element can start.
    Ready { track: TrackId },
    /// A `Pending` play call has started sounding.
    PlayResolved { track: TrackId },
    /// A `Pending` play call was refused.
    PlayRejected { track: TrackId, reason: String },
    /// A non-looping element reached its natural end.
    Ended { track: TrackId },
}

impl MediaEvent {
    pub fn track(&self) -> TrackId {
        match self {
            MediaEvent::Ready { track }
            | MediaEvent::PlayResolved { track }
            | MediaEvent::PlayRejected { track, .. }
            | MediaEvent::Ended { track } => *track,
        }
    }
}

/// `clamp(master * weight, 0, 1)`. NaN inputs collapse to silence.
pub fn effective_volume(master: f32, weight: f32) -> f32 {
    let volume = master * weight;
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

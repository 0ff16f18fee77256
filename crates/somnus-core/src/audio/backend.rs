use serde::{Deserialize, Serialize};

use super::TrackId;
use crate::error::BackendError;

/// Immediate answer to a play call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStatus {
    /// Sounding now.
    Started,
    /// Accepted; resolution arrives later as a `MediaEvent`.
    Pending,
}

/// Which path actually carried a play call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayRoute {
    Native,
    Local,
    /// A freshly created alarm element, used when the regular one is not ready.
    ShadowAlarm,
}

/// Capability set shared by every audio backend.
///
/// `stop` must be idempotent. Failures are per call; callers decide whether to
/// fall back or retry.
pub trait AudioBackend {
    fn name(&self) -> &'static str;

    fn play(&mut self, track: TrackId, volume: f32, looping: bool) -> Result<PlayStatus, BackendError>;

    fn stop(&mut self, track: TrackId) -> Result<(), BackendError>;

    fn set_volume(&mut self, track: TrackId, volume: f32) -> Result<(), BackendError>;

    /// Device-level media output volume, independent of per-track volume.
    fn set_media_volume(&mut self, level: f32) -> Result<(), BackendError>;
}

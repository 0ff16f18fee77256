//! Host-platform audio bridge.
//!
//! The bridge answers every call synchronously with a boolean and never
//! retries on its own. It plays one track at a time and its `stop_track`
//! takes no argument, so the backend remembers which track it started and
//! only forwards stops for that one.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::{AudioBackend, PlayStatus, SourceRef, TrackId};
use crate::error::BackendError;

/// Capability exposed by the host platform, when it has one.
pub trait NativeBridge {
    fn play_track(&mut self, name: &str, volume: f32, looping: bool) -> bool;

    fn stop_track(&mut self) -> bool;

    /// Ask the platform to ring after `seconds`, even if this process is suspended.
    fn schedule_alarm(&mut self, seconds: u64, vibrate: bool) -> bool;

    fn cancel_alarm(&mut self) -> bool;

    fn set_media_volume(&mut self, level: f32) -> bool;
}

pub struct NativeBridgeBackend {
    bridge: Box<dyn NativeBridge>,
    sources: HashMap<TrackId, SourceRef>,
    active: Option<TrackId>,
}

impl NativeBridgeBackend {
    /// Capability probe, run once per process.
    ///
    /// `None` means the host exposes no bridge; the caller keeps that answer
    /// for the rest of the process lifetime.
    pub fn probe(
        bridge: Option<Box<dyn NativeBridge>>,
        sources: impl IntoIterator<Item = (TrackId, SourceRef)>,
    ) -> Option<Self> {
        match bridge {
            Some(bridge) => {
                info!("native audio bridge detected");
                Some(Self {
                    bridge,
                    sources: sources.into_iter().collect(),
                    active: None,
                })
            }
            None => {
                info!("no native audio bridge; local media only for this process");
                None
            }
        }
    }

    /// Track the bridge is currently playing, if any.
    pub fn active_track(&self) -> Option<TrackId> {
        self.active
    }

    pub fn schedule_alarm(&mut self, seconds: u64, vibrate: bool) -> Result<(), BackendError> {
        if self.bridge.schedule_alarm(seconds, vibrate) {
            info!(seconds, vibrate, "native alarm scheduled");
            Ok(())
        } else {
            Err(BackendError::BridgeRejected {
                op: "schedule_alarm",
            })
        }
    }

    pub fn cancel_alarm(&mut self) -> Result<(), BackendError> {
        if self.bridge.cancel_alarm() {
            debug!("native alarm cancelled");
            Ok(())
        } else {
            Err(BackendError::BridgeRejected { op: "cancel_alarm" })
        }
    }
}

impl AudioBackend for NativeBridgeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn play(&mut self, track: TrackId, volume: f32, looping: bool) -> Result<PlayStatus, BackendError> {
        let name = self
            .sources
            .get(&track)
            .ok_or_else(|| BackendError::MissingSource(track.to_string()))?;
        if self.bridge.play_track(name.as_str(), volume, looping) {
            self.active = Some(track);
            Ok(PlayStatus::Started)
        } else {
            Err(BackendError::BridgeRejected { op: "play_track" })
        }
    }

    fn stop(&mut self, track: TrackId) -> Result<(), BackendError> {
        if self.active != Some(track) {
            return Ok(());
        }
        if self.bridge.stop_track() {
            self.active = None;
            Ok(())
        } else {
            warn!(%track, "native bridge refused to stop track");
            Err(BackendError::BridgeRejected { op: "stop_track" })
        }
    }

    fn set_volume(&mut self, _track: TrackId, _volume: f32) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            backend: "native",
            op: "set_volume",
        })
    }

    fn set_media_volume(&mut self, level: f32) -> Result<(), BackendError> {
        if self.bridge.set_media_volume(level) {
            Ok(())
        } else {
            Err(BackendError::BridgeRejected {
                op: "set_media_volume",
            })
        }
    }
}

//! Backend selection.
//!
//! The native bridge, when the one-time probe found it, is tried first for
//! every call. A failed native call falls back to local media for that call
//! only; the next call tries native again.

use tracing::{debug, info, warn};

use super::{
    AudioBackend, LocalMediaBackend, NativeBridgeBackend, PlayRoute, PlayStatus, TrackId,
};
use crate::error::BackendError;

pub struct AudioRouter {
    local: LocalMediaBackend,
    native: Option<NativeBridgeBackend>,
}

impl AudioRouter {
    pub fn new(local: LocalMediaBackend, native: Option<NativeBridgeBackend>) -> Self {
        Self { local, native }
    }

    pub fn has_native(&self) -> bool {
        self.native.is_some()
    }

    pub fn local(&self) -> &LocalMediaBackend {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut LocalMediaBackend {
        &mut self.local
    }

    pub fn native_mut(&mut self) -> Option<&mut NativeBridgeBackend> {
        self.native.as_mut()
    }

    /// Run `call` against native, then against local if native is absent or fails.
    fn route<R>(
        &mut self,
        op: &'static str,
        track: Option<TrackId>,
        mut call: impl FnMut(&mut dyn AudioBackend) -> Result<R, BackendError>,
    ) -> Result<(R, PlayRoute), BackendError> {
        if let Some(native) = self.native.as_mut() {
            match call(native as &mut dyn AudioBackend) {
                Ok(value) => return Ok((value, PlayRoute::Native)),
                Err(err @ BackendError::Unsupported { .. }) => {
                    debug!(op, ?track, error = %err, "using local media");
                }
                Err(err) => {
                    warn!(op, ?track, error = %err, "native bridge call failed; using local media");
                }
            }
        }
        call(&mut self.local as &mut dyn AudioBackend).map(|value| (value, PlayRoute::Local))
    }

    pub fn play(
        &mut self,
        track: TrackId,
        volume: f32,
        looping: bool,
    ) -> Result<(PlayStatus, PlayRoute), BackendError> {
        debug!(%track, volume, looping, "play");
        self.route("play", Some(track), |backend| backend.play(track, volume, looping))
    }

    /// Alarm variant of [`play`](Self::play).
    ///
    /// On the local path, an alarm element that has not buffered yet is left
    /// loading and a fresh shadow element plays instead.
    pub fn play_alarm(
        &mut self,
        volume: f32,
        shadow_volume: f32,
    ) -> Result<(PlayStatus, PlayRoute), BackendError> {
        if let Some(native) = self.native.as_mut() {
            match native.play(TrackId::Alarm, volume, true) {
                Ok(status) => return Ok((status, PlayRoute::Native)),
                Err(err) => warn!(error = %err, "native alarm failed; using local media"),
            }
        }

        let ready = self.local.ready_state(TrackId::Alarm);
        if ready.can_play() {
            return self
                .local
                .play(TrackId::Alarm, volume, true)
                .map(|status| (status, PlayRoute::Local));
        }

        info!(?ready, "alarm element not ready; playing shadow element");
        if let Err(err) = self.local.preload(TrackId::Alarm) {
            debug!(error = %err, "alarm preload failed");
        }
        self.local
            .play_shadow_alarm(shadow_volume)
            .map(|status| (status, PlayRoute::ShadowAlarm))
    }

    /// Stop on every backend. Stops are idempotent, so the local element is
    /// always paused even when native carried the track.
    pub fn stop(&mut self, track: TrackId) {
        if let Some(native) = self.native.as_mut() {
            if let Err(err) = native.stop(track) {
                warn!(%track, error = %err, "native stop failed");
            }
        }
        // Local stop cannot fail.
        let _ = self.local.stop(track);
        if track == TrackId::Alarm {
            self.local.stop_shadow_alarm();
        }
    }

    pub fn set_volume(&mut self, track: TrackId, volume: f32) {
        match self.route("set_volume", Some(track), |backend| backend.set_volume(track, volume)) {
            Ok(_) => {}
            Err(err) => warn!(%track, volume, error = %err, "set_volume failed"),
        }
    }

    pub fn set_media_volume(&mut self, level: f32) -> Result<PlayRoute, BackendError> {
        self.route("set_media_volume", None, |backend| backend.set_media_volume(level))
            .map(|(_, route)| route)
    }
}

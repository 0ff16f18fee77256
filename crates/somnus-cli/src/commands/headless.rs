//! Terminal media host.
//!
//! No audio device is opened. Elements are always buffered, start at once
//! and log what they would play. Non-looping plays are reported back so the
//! session loop can synthesize their end.

use std::cell::RefCell;
use std::rc::Rc;

use somnus_core::{BackendError, MediaElement, MediaHost, PlayStatus, ReadyState, SourceRef, TrackId};
use tracing::{debug, info};

#[derive(Clone, Default)]
pub struct HeadlessHost {
    finite_plays: Rc<RefCell<Vec<TrackId>>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-looping tracks started since the last call.
    pub fn take_finite_plays(&self) -> Vec<TrackId> {
        std::mem::take(&mut *self.finite_plays.borrow_mut())
    }
}

impl MediaHost for HeadlessHost {
    fn create(&mut self, track: TrackId, source: &SourceRef) -> Box<dyn MediaElement> {
        debug!(%track, %source, "headless element created");
        Box::new(HeadlessElement {
            track,
            source: source.clone(),
            volume: 1.0,
            finite_plays: Rc::clone(&self.finite_plays),
        })
    }

    fn set_media_volume(&mut self, level: f32) -> Result<(), BackendError> {
        info!(level, "device media volume set");
        Ok(())
    }
}

struct HeadlessElement {
    track: TrackId,
    source: SourceRef,
    volume: f32,
    finite_plays: Rc<RefCell<Vec<TrackId>>>,
}

impl MediaElement for HeadlessElement {
    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveEnoughData
    }

    fn load(&mut self) {}

    fn play(&mut self, looping: bool) -> Result<PlayStatus, BackendError> {
        info!(track = %self.track, source = %self.source, volume = self.volume, looping, "playing");
        if !looping {
            self.finite_plays.borrow_mut().push(self.track);
        }
        Ok(PlayStatus::Started)
    }

    fn pause(&mut self) {
        info!(track = %self.track, "paused");
    }

    fn rewind(&mut self) {}

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}

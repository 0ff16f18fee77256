//! In-process media backend.
//!
//! One host-provided media element per track, created lazily on first use.
//! The alarm may additionally get a throwaway "shadow" element when its
//! regular element has not buffered yet.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, info};

use super::{AudioBackend, PlayStatus, SourceRef, TrackId};
use crate::error::BackendError;

/// Buffering progress of a media element, ordered from empty to fully buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Enough data to start playback at the current position.
    pub fn can_play(self) -> bool {
        self >= ReadyState::HaveCurrentData
    }
}

/// A single playable media handle owned by the host.
pub trait MediaElement {
    fn ready_state(&self) -> ReadyState;

    /// Begin (or restart) buffering.
    fn load(&mut self);

    /// Start playback. May answer `Pending` and resolve later through a
    /// `MediaEvent`; may reject with `NotLoaded` or `AutoplayBlocked`.
    fn play(&mut self, looping: bool) -> Result<PlayStatus, BackendError>;

    fn pause(&mut self);

    /// Seek back to position zero.
    fn rewind(&mut self);

    fn set_volume(&mut self, volume: f32);
}

/// Factory for media elements plus device-level volume control.
pub trait MediaHost {
    fn create(&mut self, track: TrackId, source: &SourceRef) -> Box<dyn MediaElement>;

    fn set_media_volume(&mut self, level: f32) -> Result<(), BackendError>;
}

pub struct LocalMediaBackend {
    host: Box<dyn MediaHost>,
    sources: HashMap<TrackId, SourceRef>,
    elements: HashMap<TrackId, Box<dyn MediaElement>>,
    shadow_alarm: Option<Box<dyn MediaElement>>,
}

impl LocalMediaBackend {
    pub fn new(
        host: Box<dyn MediaHost>,
        sources: impl IntoIterator<Item = (TrackId, SourceRef)>,
    ) -> Self {
        Self {
            host,
            sources: sources.into_iter().collect(),
            elements: HashMap::new(),
            shadow_alarm: None,
        }
    }

    fn element(&mut self, track: TrackId) -> Result<&mut dyn MediaElement, BackendError> {
        let Self {
            host,
            sources,
            elements,
            ..
        } = self;
        match elements.entry(track) {
            Entry::Occupied(entry) => Ok(&mut **entry.into_mut()),
            Entry::Vacant(entry) => {
                let source = sources
                    .get(&track)
                    .ok_or_else(|| BackendError::MissingSource(track.to_string()))?;
                debug!(%track, %source, "creating media element");
                Ok(&mut **entry.insert(host.create(track, source)))
            }
        }
    }

    /// Ready state of the track's element, creating it if needed.
    pub fn ready_state(&mut self, track: TrackId) -> ReadyState {
        self.element(track)
            .map(|element| element.ready_state())
            .unwrap_or(ReadyState::HaveNothing)
    }

    pub fn preload(&mut self, track: TrackId) -> Result<(), BackendError> {
        self.element(track)?.load();
        Ok(())
    }

    /// Seek an existing element back to zero. No-op for tracks never created.
    pub fn rewind(&mut self, track: TrackId) {
        if let Some(element) = self.elements.get_mut(&track) {
            element.rewind();
        }
    }

    /// Replace any previous shadow with a fresh alarm element and play it.
    pub fn play_shadow_alarm(&mut self, volume: f32) -> Result<PlayStatus, BackendError> {
        self.stop_shadow_alarm();
        let source = self
            .sources
            .get(&TrackId::Alarm)
            .ok_or_else(|| BackendError::MissingSource(TrackId::Alarm.to_string()))?;
        let mut shadow = self.host.create(TrackId::Alarm, source);
        shadow.set_volume(volume);
        let status = shadow.play(true)?;
        info!(volume, ?status, "shadow alarm element playing");
        self.shadow_alarm = Some(shadow);
        Ok(status)
    }

    /// Stop and discard the shadow alarm. Returns whether one existed.
    pub fn stop_shadow_alarm(&mut self) -> bool {
        match self.shadow_alarm.take() {
            Some(mut shadow) => {
                shadow.pause();
                shadow.rewind();
                debug!("shadow alarm element stopped");
                true
            }
            None => false,
        }
    }

    pub fn has_shadow_alarm(&self) -> bool {
        self.shadow_alarm.is_some()
    }
}

impl AudioBackend for LocalMediaBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn play(&mut self, track: TrackId, volume: f32, looping: bool) -> Result<PlayStatus, BackendError> {
        let element = self.element(track)?;
        element.set_volume(volume);
        element.play(looping)
    }

    fn stop(&mut self, track: TrackId) -> Result<(), BackendError> {
        if let Some(element) = self.elements.get_mut(&track) {
            element.pause();
        }
        Ok(())
    }

    fn set_volume(&mut self, track: TrackId, volume: f32) -> Result<(), BackendError> {
        // Tracks not yet created pick their volume up at play time.
        if let Some(element) = self.elements.get_mut(&track) {
            element.set_volume(volume);
        }
        Ok(())
    }

    fn set_media_volume(&mut self, level: f32) -> Result<(), BackendError> {
        self.host.set_media_volume(level)
    }
}

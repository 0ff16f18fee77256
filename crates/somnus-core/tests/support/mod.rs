//! Recording fakes for driving a `SessionOrchestrator` on a manual clock.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use somnus_core::error::{DatabaseError, NotifyError};
use somnus_core::{
    BackendError, Clock, Collaborators, GestureKind, ManualClock, MediaElement, MediaHost,
    NativeBridge, Notifier, PlayStatus, ReadyState, SequencerConfig, SessionEvent,
    SessionOrchestrator, SessionRecord, SessionSettings, SessionStore, SourceRef, TrackId,
    TrackSequencer,
};

// ============================================================================
// Call log
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play { track: TrackId, element: usize, volume: f32, looping: bool },
    Pause { track: TrackId, element: usize },
    Rewind { track: TrackId },
    Load { track: TrackId },
    SetVolume { track: TrackId, volume: f32 },
    MediaVolume(f32),
    NativePlay { name: String, looping: bool },
    NativeStop,
    NativeSchedule { seconds: u64, vibrate: bool },
    NativeCancel,
    NativeMediaVolume(f32),
}

impl Call {
    pub fn is_native(&self) -> bool {
        matches!(
            self,
            Call::NativePlay { .. }
                | Call::NativeStop
                | Call::NativeSchedule { .. }
                | Call::NativeCancel
                | Call::NativeMediaVolume(_)
        )
    }
}

#[derive(Default)]
struct Shared {
    calls: Vec<(Duration, Call)>,
    outcomes: HashMap<TrackId, VecDeque<Result<PlayStatus, BackendError>>>,
    unready: Vec<TrackId>,
    created: usize,
}

#[derive(Clone)]
pub struct Log {
    shared: Rc<RefCell<Shared>>,
    clock: ManualClock,
}

impl Log {
    fn record(&self, call: Call) {
        let at = self.clock.now();
        self.shared.borrow_mut().calls.push((at, call));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.borrow().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    /// `(time, looping)` of every local play call for `track`.
    pub fn plays(&self, track: TrackId) -> Vec<(Duration, bool)> {
        self.shared
            .borrow()
            .calls
            .iter()
            .filter_map(|(at, call)| match call {
                Call::Play { track: t, looping, .. } if *t == track => Some((*at, *looping)),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.shared.borrow().calls.iter().position(|(_, c)| predicate(c))
    }

    /// Script play outcomes for `track`; unscripted plays start at once.
    pub fn script(
        &self,
        track: TrackId,
        outcomes: impl IntoIterator<Item = Result<PlayStatus, BackendError>>,
    ) {
        self.shared
            .borrow_mut()
            .outcomes
            .entry(track)
            .or_default()
            .extend(outcomes);
    }

    /// The first element created for `track` reports no buffered data.
    pub fn unready(&self, track: TrackId) {
        self.shared.borrow_mut().unready.push(track);
    }
}

// ============================================================================
// Media host
// ============================================================================

struct RecordingHost(Log);

impl MediaHost for RecordingHost {
    fn create(&mut self, track: TrackId, _source: &SourceRef) -> Box<dyn MediaElement> {
        let (element, unready) = {
            let mut shared = self.0.shared.borrow_mut();
            let element = shared.created;
            shared.created += 1;
            let unready = match shared.unready.iter().position(|t| *t == track) {
                Some(index) => {
                    shared.unready.remove(index);
                    true
                }
                None => false,
            };
            (element, unready)
        };
        Box::new(RecordingElement {
            track,
            element,
            unready,
            volume: 1.0,
            log: self.0.clone(),
        })
    }

    fn set_media_volume(&mut self, level: f32) -> Result<(), BackendError> {
        self.0.record(Call::MediaVolume(level));
        Ok(())
    }
}

struct RecordingElement {
    track: TrackId,
    element: usize,
    unready: bool,
    volume: f32,
    log: Log,
}

impl MediaElement for RecordingElement {
    fn ready_state(&self) -> ReadyState {
        if self.unready {
            ReadyState::HaveMetadata
        } else {
            ReadyState::HaveEnoughData
        }
    }

    fn load(&mut self) {
        self.log.record(Call::Load { track: self.track });
    }

    fn play(&mut self, looping: bool) -> Result<PlayStatus, BackendError> {
        self.log.record(Call::Play {
            track: self.track,
            element: self.element,
            volume: self.volume,
            looping,
        });
        self.log
            .shared
            .borrow_mut()
            .outcomes
            .get_mut(&self.track)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(PlayStatus::Started))
    }

    fn pause(&mut self) {
        self.log.record(Call::Pause {
            track: self.track,
            element: self.element,
        });
    }

    fn rewind(&mut self) {
        self.log.record(Call::Rewind { track: self.track });
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.log.record(Call::SetVolume {
            track: self.track,
            volume,
        });
    }
}

struct RecordingBridge(Log);

impl NativeBridge for RecordingBridge {
    fn play_track(&mut self, name: &str, _volume: f32, looping: bool) -> bool {
        self.0.record(Call::NativePlay {
            name: name.to_string(),
            looping,
        });
        true
    }

    fn stop_track(&mut self) -> bool {
        self.0.record(Call::NativeStop);
        true
    }

    fn schedule_alarm(&mut self, seconds: u64, vibrate: bool) -> bool {
        self.0.record(Call::NativeSchedule { seconds, vibrate });
        true
    }

    fn cancel_alarm(&mut self) -> bool {
        self.0.record(Call::NativeCancel);
        true
    }

    fn set_media_volume(&mut self, level: f32) -> bool {
        self.0.record(Call::NativeMediaVolume(level));
        true
    }
}

// ============================================================================
// Store and notifier
// ============================================================================

#[derive(Clone, Default)]
pub struct Saved(Rc<RefCell<Vec<u32>>>);

impl Saved {
    pub fn minutes(&self) -> Vec<u32> {
        self.0.borrow().clone()
    }
}

struct MemoryStore(Saved);

impl SessionStore for MemoryStore {
    fn save_completed_session(&mut self, duration_min: u32) -> Result<i64, DatabaseError> {
        let mut saved = (self.0).0.borrow_mut();
        saved.push(duration_min);
        Ok(saved.len() as i64)
    }

    fn list_recent_sessions(&self, _limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        Ok(Vec::new())
    }

    fn total_completed_count(&self) -> Result<u64, DatabaseError> {
        Ok((self.0).0.borrow().len() as u64)
    }
}

#[derive(Clone, Default)]
pub struct Notes(Rc<RefCell<Vec<(String, String)>>>);

impl Notes {
    pub fn all(&self) -> Vec<(String, String)> {
        self.0.borrow().clone()
    }
}

struct RecordingNotifier(Notes);

impl Notifier for RecordingNotifier {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), NotifyError> {
        (self.0).0.borrow_mut().push((title.to_string(), body.to_string()));
        Ok(())
    }
}

// ============================================================================
// Rig
// ============================================================================

pub struct Rig {
    pub clock: ManualClock,
    pub log: Log,
    pub saved: Saved,
    pub notes: Notes,
    pub session: SessionOrchestrator,
    pub events: Vec<SessionEvent>,
}

pub struct RigBuilder {
    settings: SessionSettings,
    bridge: bool,
    prepare: Vec<Box<dyn FnOnce(&Log)>>,
}

pub fn rig(settings: SessionSettings) -> RigBuilder {
    RigBuilder {
        settings,
        bridge: false,
        prepare: Vec::new(),
    }
}

pub fn minutes(duration_min: u32) -> SessionSettings {
    SessionSettings {
        duration_min,
        ..SessionSettings::default()
    }
}

impl RigBuilder {
    pub fn with_bridge(mut self) -> Self {
        self.bridge = true;
        self
    }

    /// Adjust the log before the orchestrator creates any element.
    pub fn prepare(mut self, f: impl FnOnce(&Log) + 'static) -> Self {
        self.prepare.push(Box::new(f));
        self
    }

    pub fn build(self) -> Rig {
        let clock = ManualClock::new();
        let log = Log {
            shared: Rc::default(),
            clock: clock.clone(),
        };
        for prepare in self.prepare {
            prepare(&log);
        }
        let saved = Saved::default();
        let notes = Notes::default();
        let bridge: Option<Box<dyn NativeBridge>> = if self.bridge {
            Some(Box::new(RecordingBridge(log.clone())))
        } else {
            None
        };
        let sources = TrackId::ALL
            .into_iter()
            .map(|id| (id, SourceRef::default_for(id)))
            .collect();
        let sequencer = TrackSequencer::with_host(
            Box::new(RecordingHost(log.clone())),
            bridge,
            sources,
            SequencerConfig::default(),
        );
        let session = SessionOrchestrator::new(
            self.settings,
            sequencer,
            Collaborators {
                clock: Box::new(clock.clone()),
                store: Box::new(MemoryStore(saved.clone())),
                notifier: Box::new(RecordingNotifier(notes.clone())),
            },
        )
        .unwrap();
        Rig {
            clock,
            log,
            saved,
            notes,
            session,
            events: Vec::new(),
        }
    }
}

impl Rig {
    /// Gesture, then start playback at the current time.
    pub fn start(&mut self) {
        self.session.observe_gesture(GestureKind::Pointer);
        self.session.set_playing(true);
        self.collect();
    }

    /// Fire every timer deadline by deadline up to and including `until`.
    pub fn run_until(&mut self, until: Duration) {
        while let Some(deadline) = self.session.next_deadline() {
            if deadline > until {
                break;
            }
            self.clock.set(deadline);
            self.session.advance();
            self.collect();
        }
        self.clock.set(until);
        self.session.advance();
        self.collect();
    }

    pub fn collect(&mut self) {
        self.events.extend(self.session.drain_events());
    }

    pub fn count(&self, predicate: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

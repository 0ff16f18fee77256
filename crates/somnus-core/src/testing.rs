//! Scripted fakes shared by unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use crate::audio::{MediaElement, MediaHost, NativeBridge, PlayStatus, ReadyState, SourceRef, TrackId};
use crate::clock::{Clock, ManualClock};
use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create { track: TrackId, element: usize },
    Play { track: TrackId, element: usize, volume: f32, looping: bool },
    Pause { track: TrackId, element: usize },
    Rewind { track: TrackId, element: usize },
    Load { track: TrackId, element: usize },
    SetVolume { track: TrackId, element: usize, volume: f32 },
    MediaVolume(f32),
    NativePlay { name: String, volume: f32, looping: bool },
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
struct Script {
    calls: Vec<(Duration, Call)>,
    outcomes: HashMap<TrackId, VecDeque<Result<PlayStatus, BackendError>>>,
    ready: HashMap<TrackId, ReadyState>,
    created: usize,
    first_element: HashMap<TrackId, usize>,
    native_play: VecDeque<bool>,
}

/// Records every host and bridge call with the time it was made.
#[derive(Clone)]
pub struct Recorder {
    script: Rc<RefCell<Script>>,
    clock: ManualClock,
}

impl Recorder {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            script: Rc::default(),
            clock: clock.clone(),
        }
    }

    pub fn sources() -> Vec<(TrackId, SourceRef)> {
        vec![
            (TrackId::Primary, SourceRef::new("sounds/1.mp3")),
            (TrackId::Loop, SourceRef::new("sounds/2.mp3")),
            (TrackId::Alarm, SourceRef::new("sounds/3.mp3")),
        ]
    }

    pub fn host(&self) -> Box<dyn MediaHost> {
        Box::new(self.clone())
    }

    pub fn bridge(&self) -> Box<dyn NativeBridge> {
        Box::new(FakeBridge(self.clone()))
    }

    /// Queue play outcomes for a track's elements; unscripted plays start.
    pub fn push_outcomes(
        &self,
        track: TrackId,
        outcomes: impl IntoIterator<Item = Result<PlayStatus, BackendError>>,
    ) {
        self.script
            .borrow_mut()
            .outcomes
            .entry(track)
            .or_default()
            .extend(outcomes);
    }

    /// Queue answers for the bridge's `play_track`; unscripted plays succeed.
    pub fn push_native_play(&self, answers: impl IntoIterator<Item = bool>) {
        self.script.borrow_mut().native_play.extend(answers);
    }

    /// Ready state of the first element created for `track`. Later elements
    /// for the same track (shadow alarms) are always fully buffered.
    pub fn set_ready(&self, track: TrackId, state: ReadyState) {
        self.script.borrow_mut().ready.insert(track, state);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.borrow().calls.iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn stamped(&self) -> Vec<(Duration, Call)> {
        self.script.borrow().calls.clone()
    }

    /// Times of every local or native play call for `track`.
    pub fn play_times(&self, track: TrackId) -> Vec<Duration> {
        self.script
            .borrow()
            .calls
            .iter()
            .filter(|(_, call)| match call {
                Call::Play { track: t, .. } => *t == track,
                Call::NativePlay { name, .. } => name.contains(source_digit(track)),
                _ => false,
            })
            .map(|(at, _)| *at)
            .collect()
    }

    fn record(&self, call: Call) {
        let at = self.clock.now();
        self.script.borrow_mut().calls.push((at, call));
    }
}

fn source_digit(track: TrackId) -> &'static str {
    match track {
        TrackId::Primary => "1",
        TrackId::Loop => "2",
        TrackId::Alarm => "3",
    }
}

impl MediaHost for Recorder {
    fn create(&mut self, track: TrackId, _source: &SourceRef) -> Box<dyn MediaElement> {
        let element = {
            let mut script = self.script.borrow_mut();
            let element = script.created;
            script.created += 1;
            script.first_element.entry(track).or_insert(element);
            element
        };
        self.record(Call::Create { track, element });
        Box::new(FakeElement {
            track,
            element,
            volume: 1.0,
            recorder: self.clone(),
        })
    }

    fn set_media_volume(&mut self, level: f32) -> Result<(), BackendError> {
        self.record(Call::MediaVolume(level));
        Ok(())
    }
}

struct FakeElement {
    track: TrackId,
    element: usize,
    volume: f32,
    recorder: Recorder,
}

impl MediaElement for FakeElement {
    fn ready_state(&self) -> ReadyState {
        let script = self.recorder.script.borrow();
        if script.first_element.get(&self.track) == Some(&self.element) {
            script
                .ready
                .get(&self.track)
                .copied()
                .unwrap_or(ReadyState::HaveEnoughData)
        } else {
            ReadyState::HaveEnoughData
        }
    }

    fn load(&mut self) {
        self.recorder.record(Call::Load {
            track: self.track,
            element: self.element,
        });
    }

    fn play(&mut self, looping: bool) -> Result<PlayStatus, BackendError> {
        self.recorder.record(Call::Play {
            track: self.track,
            element: self.element,
            volume: self.volume,
            looping,
        });
        self.recorder
            .script
            .borrow_mut()
            .outcomes
            .get_mut(&self.track)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(PlayStatus::Started))
    }

    fn pause(&mut self) {
        self.recorder.record(Call::Pause {
            track: self.track,
            element: self.element,
        });
    }

    fn rewind(&mut self) {
        self.recorder.record(Call::Rewind {
            track: self.track,
            element: self.element,
        });
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.recorder.record(Call::SetVolume {
            track: self.track,
            element: self.element,
            volume,
        });
    }
}

struct FakeBridge(Recorder);

impl NativeBridge for FakeBridge {
    fn play_track(&mut self, name: &str, volume: f32, looping: bool) -> bool {
        self.0.record(Call::NativePlay {
            name: name.to_string(),
            volume,
            looping,
        });
        self.0.script.borrow_mut().native_play.pop_front().unwrap_or(true)
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

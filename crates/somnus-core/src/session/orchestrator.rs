//! The session orchestrator.
//!
//! Composes the interaction gate, the countdown and the track sequencer, and
//! drives persistence and notification at completion. Like the rest of the
//! core it never blocks: the host calls [`SessionOrchestrator::advance`]
//! whenever [`SessionOrchestrator::next_deadline`] is reached and drains
//! [`SessionEvent`]s after every call.

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use super::events::SessionEvent;
use super::timers::{Timer, TimerQueue};
use super::{PlaybackSession, SessionSettings, SessionState};
use crate::audio::{MediaEvent, TrackId};
use crate::clock::Clock;
use crate::countdown::{Countdown, CountdownEvent, CountdownState};
use crate::error::{PlaybackErrorKind, ValidationError};
use crate::gate::{Admission, GestureKind, InteractionGate};
use crate::notify::{completion_body, Notifier, COMPLETION_TITLE};
use crate::sequencer::{SequencerEffect, TrackSequencer};
use crate::storage::SessionStore;

/// Host-provided collaborators.
pub struct Collaborators {
    pub clock: Box<dyn Clock>,
    pub store: Box<dyn SessionStore>,
    pub notifier: Box<dyn Notifier>,
}

/// Requests held back until the first user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    Play,
    Pause,
}

pub struct SessionOrchestrator {
    settings: SessionSettings,
    state: SessionState,
    countdown: Countdown,
    sequencer: TrackSequencer,
    gate: InteractionGate<Deferred>,
    timers: TimerQueue,
    clock: Box<dyn Clock>,
    store: Box<dyn SessionStore>,
    notifier: Box<dyn Notifier>,
    alarm_active: bool,
    native_alarm_scheduled: bool,
    started_at: Option<DateTime<Utc>>,
    events: Vec<SessionEvent>,
}

impl SessionOrchestrator {
    /// # Errors
    /// Returns an error if `settings.duration_min` is zero.
    pub fn new(
        settings: SessionSettings,
        mut sequencer: TrackSequencer,
        collaborators: Collaborators,
    ) -> Result<Self, ValidationError> {
        let countdown = Countdown::new(u64::from(settings.duration_min) * 60)?;
        sequencer.set_master_volume(settings.master_volume);
        sequencer.set_meditation_enabled(settings.meditation_enabled);
        for id in TrackId::ALL {
            sequencer.preload(id);
        }
        let Collaborators {
            clock,
            store,
            notifier,
        } = collaborators;
        let settings = SessionSettings {
            master_volume: sequencer.master_volume(),
            ..settings
        };
        let mut orchestrator = Self {
            settings,
            state: SessionState::Idle,
            countdown,
            sequencer,
            gate: InteractionGate::new(),
            timers: TimerQueue::new(),
            clock,
            store,
            notifier,
            alarm_active: false,
            native_alarm_scheduled: false,
            started_at: None,
            events: Vec::new(),
        };
        orchestrator.settle();
        Ok(orchestrator)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn sequencer(&self) -> &TrackSequencer {
        &self.sequencer
    }

    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    pub fn has_gesture(&self) -> bool {
        self.gate.has_gesture()
    }

    /// When `advance` next has work to do.
    pub fn next_deadline(&self) -> Option<std::time::Duration> {
        self.timers.next_deadline()
    }

    pub fn session(&self) -> PlaybackSession {
        PlaybackSession {
            state: self.state,
            total_duration_secs: self.countdown.total_secs(),
            remaining_secs: self.countdown.remaining_secs(),
            master_volume: self.settings.master_volume,
            meditation_enabled: self.settings.meditation_enabled,
            alarm_enabled: self.settings.alarm_enabled,
            vibrate: self.settings.vibrate,
            alarm_active: self.alarm_active,
            started_at: self.started_at,
            tracks: TrackId::ALL
                .into_iter()
                .map(|id| (id, self.sequencer.state(id)))
                .collect(),
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> SessionEvent {
        SessionEvent::StateSnapshot {
            session: self.session(),
            at: Utc::now(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_playing(&mut self, playing: bool) {
        if playing {
            match self.gate.arm_on_first_gesture(Deferred::Play) {
                Admission::Proceed(_) => self.begin_playback(),
                Admission::Deferred => {
                    info!("playback requested before first gesture; deferred");
                    self.emit(|at| SessionEvent::PlaybackDeferred { at });
                }
            }
        } else if self.gate.has_gesture() || self.gate.pending() == 0 {
            self.pause_playback();
        } else {
            // Keeps the queued play from outliving a later pause.
            let _ = self.gate.arm_on_first_gesture(Deferred::Pause);
        }
        self.settle();
    }

    /// Report user input. The first qualifying gesture replays deferred requests.
    pub fn observe_gesture(&mut self, kind: GestureKind) {
        let was_armed = self.gate.has_gesture();
        let replay = self.gate.observe(kind);
        if was_armed || !self.gate.has_gesture() {
            return;
        }
        let replayed = replay.len();
        self.emit(|at| SessionEvent::GestureObserved { replayed, at });
        for request in replay {
            match request {
                Deferred::Play => self.begin_playback(),
                Deferred::Pause => self.pause_playback(),
            }
        }
        self.settle();
    }

    pub fn acknowledge_alarm(&mut self) {
        if !self.alarm_active && !self.sequencer.alarm_engaged() {
            return;
        }
        self.silence_alarm();
        self.settle();
    }

    /// Stop every track, restore volumes and reset the countdown.
    pub fn stop(&mut self) {
        let now = self.clock.now();
        self.countdown.pause(now);
        self.timers.cancel(&Timer::CountdownTick);
        self.sequencer.stop_all();
        self.cancel_native_alarm();
        self.alarm_active = false;
        self.reset_countdown();
        self.state = SessionState::Idle;
        info!("session stopped");
        self.emit(|at| SessionEvent::SessionStopped { at });
        self.settle();
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.sequencer.set_master_volume(volume);
        let master_volume = self.sequencer.master_volume();
        self.settings.master_volume = master_volume;
        self.emit(|at| SessionEvent::VolumeChanged { master_volume, at });
        self.settle();
    }

    /// Applies from the next start.
    pub fn set_meditation_enabled(&mut self, enabled: bool) {
        self.settings.meditation_enabled = enabled;
        self.sequencer.set_meditation_enabled(enabled);
    }

    pub fn set_alarm_enabled(&mut self, enabled: bool) {
        self.settings.alarm_enabled = enabled;
        if enabled {
            if self.state == SessionState::Running && !self.native_alarm_scheduled {
                self.schedule_native_alarm();
            }
        } else {
            self.cancel_native_alarm();
        }
    }

    pub fn set_vibration_enabled(&mut self, vibrate: bool) {
        self.settings.vibrate = vibrate;
        if self.native_alarm_scheduled {
            self.cancel_native_alarm();
            self.schedule_native_alarm();
        }
    }

    /// Pause a running session and start the countdown over at `minutes`.
    pub fn set_duration(&mut self, minutes: u32) -> Result<(), ValidationError> {
        if minutes == 0 {
            return Err(ValidationError::InvalidDuration { seconds: 0 });
        }
        self.pause_playback();
        if self.alarm_active {
            self.silence_alarm();
        }
        self.settings.duration_min = minutes;
        self.reset_countdown();
        self.state = SessionState::Idle;
        let duration_secs = self.countdown.total_secs();
        info!(minutes, "session duration changed");
        self.emit(|at| SessionEvent::SessionReset { duration_secs, at });
        self.settle();
        Ok(())
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        debug!(?event, "media event");
        self.sequencer.handle_media_event(event);
        self.settle();
    }

    /// Fire every timer due at the current clock reading. Returns how many fired.
    pub fn advance(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some((_, timer)) = self.timers.pop_due(now) {
            fired += 1;
            match timer {
                Timer::CountdownTick => self.on_tick(),
                Timer::Sequencer(timer) => self.sequencer.fire(timer),
            }
            self.settle();
        }
        fired
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_playback(&mut self) {
        if self.state == SessionState::Running {
            debug!("session already running");
            return;
        }
        if self.alarm_active {
            self.silence_alarm();
        }
        if self.countdown.state() == CountdownState::Completed {
            self.reset_countdown();
        }
        let now = self.clock.now();
        self.countdown.start(now);
        self.state = SessionState::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.schedule_tick();

        self.sequencer.rewind_flow();
        self.sequencer.start_meditation_flow();
        if self.settings.alarm_enabled {
            self.schedule_native_alarm();
        }

        let duration_secs = self.countdown.total_secs();
        let remaining_secs = self.countdown.remaining_secs();
        info!(duration_secs, remaining_secs, "session started");
        self.emit(|at| SessionEvent::SessionStarted {
            duration_secs,
            remaining_secs,
            at,
        });
    }

    fn pause_playback(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        let now = self.clock.now();
        self.countdown.pause(now);
        self.timers.cancel(&Timer::CountdownTick);
        self.state = SessionState::Paused;
        self.sequencer.stop_flow();
        self.cancel_native_alarm();

        let remaining_secs = self.countdown.remaining_secs();
        info!(remaining_secs, "session paused");
        self.emit(|at| SessionEvent::SessionPaused { remaining_secs, at });
    }

    fn on_tick(&mut self) {
        match self.countdown.tick(self.clock.now()) {
            Some(CountdownEvent::Tick { remaining_secs }) => {
                self.emit(|at| SessionEvent::Tick { remaining_secs, at });
                self.schedule_tick();
            }
            Some(CountdownEvent::Completed) => self.on_countdown_complete(),
            None => {}
        }
    }

    fn on_countdown_complete(&mut self) {
        self.state = SessionState::Completed;
        self.sequencer.stop_flow();

        let duration_min = u32::try_from(self.countdown.total_secs() / 60).unwrap_or(u32::MAX);
        let record_id = match self.store.save_completed_session(duration_min) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "could not save completed session");
                self.emit(|at| SessionEvent::PlaybackError {
                    kind: PlaybackErrorKind::PersistenceFailure,
                    track: None,
                    at,
                });
                None
            }
        };

        self.sequencer.restore_media_volume();
        // The in-process alarm takes over from here.
        self.cancel_native_alarm();

        if self.settings.alarm_enabled {
            self.sequencer.start_alarm();
            self.alarm_active = true;
            info!("alarm raised");
            self.emit(|at| SessionEvent::AlarmRaised { at });
        }

        let body = completion_body(duration_min, Local::now());
        if let Err(err) = self.notifier.notify(COMPLETION_TITLE, &body) {
            debug!(error = %err, "completion notification not delivered");
        }

        self.started_at = None;
        info!(duration_min, ?record_id, "session completed");
        self.emit(|at| SessionEvent::SessionCompleted {
            duration_min,
            record_id,
            at,
        });
    }

    fn silence_alarm(&mut self) {
        self.sequencer.stop_alarm();
        self.alarm_active = false;
        info!("alarm acknowledged");
        self.emit(|at| SessionEvent::AlarmAcknowledged { at });
    }

    fn reset_countdown(&mut self) {
        let total_secs = u64::from(self.settings.duration_min) * 60;
        if let Err(err) = self.countdown.reset(total_secs) {
            warn!(error = %err, "countdown reset refused");
        }
        self.started_at = None;
    }

    fn schedule_tick(&mut self) {
        self.timers.cancel(&Timer::CountdownTick);
        if let Some(at) = self.countdown.next_tick_at() {
            self.timers.schedule(at, Timer::CountdownTick);
        }
    }

    fn schedule_native_alarm(&mut self) {
        let seconds = self.countdown.remaining_secs();
        if self.sequencer.schedule_native_alarm(seconds, self.settings.vibrate) {
            self.native_alarm_scheduled = true;
            debug!(seconds, "native alarm scheduled");
        }
    }

    fn cancel_native_alarm(&mut self) {
        if std::mem::take(&mut self.native_alarm_scheduled) {
            self.sequencer.cancel_native_alarm();
            debug!("native alarm cancelled");
        }
    }

    /// Turn sequencer effects into timers and events, then purge stale timers.
    fn settle(&mut self) {
        let now = self.clock.now();
        for effect in self.sequencer.drain_effects() {
            match effect {
                SequencerEffect::Schedule { after, timer } => {
                    self.timers.schedule(now + after, Timer::Sequencer(timer));
                }
                SequencerEffect::TrackStarted { track, route } => {
                    self.emit(|at| SessionEvent::TrackStarted { track, route, at });
                }
                SequencerEffect::TrackFailed { track, kind } => {
                    self.emit(|at| SessionEvent::PlaybackError {
                        kind,
                        track: Some(track),
                        at,
                    });
                }
            }
        }
        let sequencer = &self.sequencer;
        self.timers.retain(|timer| match timer {
            Timer::CountdownTick => true,
            Timer::Sequencer(timer) => sequencer.is_current(timer),
        });
    }

    fn emit(&mut self, event: impl FnOnce(DateTime<Utc>) -> SessionEvent) {
        let event = event(Utc::now());
        debug!(kind = event.kind(), "session event");
        self.events.push(event);
    }
}

//! Track sequencing and start retry.
//!
//! ```text
//! meditation on:  primary --(ended)--> grace delay --> loop (looping)
//! meditation off: loop (looping)
//! alarm:          stop primary + loop, then alarm (looping) until stopped
//! ```
//!
//! Every start runs under an attempt counter: the first attempt is immediate,
//! failures retry after 300 ms and then 500 ms, and the third failure marks
//! the track `Failed`. The sequencer owns no timers. It emits
//! [`SequencerEffect::Schedule`] requests and expects [`TrackSequencer::fire`]
//! to be called when they come due. Each request carries the generation it
//! was issued under; stopping a track (or the flow) bumps the generation, so
//! anything issued before the stop is inert.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::audio::{
    effective_volume, AudioRouter, LocalMediaBackend, MediaEvent, MediaHost, NativeBridge,
    NativeBridgeBackend, PlayRoute, PlayStatus, SourceRef, TrackId, TrackState,
};
use crate::error::PlaybackErrorKind;

/// Tunables for track volumes and start retry.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    pub primary_weight: f32,
    pub loop_weight: f32,
    /// Fixed alarm volume; master volume does not apply.
    pub alarm_volume: f32,
    pub shadow_alarm_volume: f32,
    /// Device media volume applied at the end of every session.
    pub restore_media_volume: f32,
    /// Buffering pause between the primary's end and the loop's start.
    pub grace_delay: Duration,
    /// Delay after the n-th failed attempt (1-based). The last entry repeats.
    pub retry_delays: Vec<Duration>,
    pub max_attempts: u8,
    /// How long a pending play may stay unresolved.
    pub load_timeout: Duration,
}

impl SequencerConfig {
    pub fn retry_delay(&self, failed_attempts: u8) -> Duration {
        let index = usize::from(failed_attempts.saturating_sub(1));
        self.retry_delays
            .get(index)
            .or_else(|| self.retry_delays.last())
            .copied()
            .unwrap_or_default()
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            primary_weight: 0.6,
            loop_weight: 0.3,
            alarm_volume: 0.5,
            shadow_alarm_volume: 0.8,
            restore_media_volume: 0.8,
            grace_delay: Duration::from_millis(500),
            retry_delays: vec![
                Duration::from_millis(300),
                Duration::from_millis(500),
                Duration::from_millis(1000),
            ],
            max_attempts: 3,
            load_timeout: Duration::from_secs(10),
        }
    }
}

/// Scoped to one start operation; dropped on success or exhaustion.
#[derive(Debug, Clone, Copy, Default)]
struct AttemptCounter {
    made: u8,
    /// Set while a `Pending` play waits for its resolution.
    awaiting: Option<PlayRoute>,
}

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub source: SourceRef,
    pub weight: f32,
    pub looping: bool,
    state: TrackState,
    volume: f32,
    generation: u64,
    attempt: Option<AttemptCounter>,
}

impl Track {
    fn new(id: TrackId, source: SourceRef, weight: f32) -> Self {
        Self {
            id,
            source,
            weight,
            looping: id != TrackId::Primary,
            state: TrackState::Unloaded,
            volume: 0.0,
            generation: 0,
            attempt: None,
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Volume most recently computed for this track.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A start operation is in flight (attempting, backing off or pending).
    pub fn is_starting(&self) -> bool {
        self.attempt.is_some()
    }
}

/// Deferred continuations the host must schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerTimer {
    Retry { track: TrackId, generation: u64 },
    LoadTimeout { track: TrackId, generation: u64, attempt: u8 },
    GraceDelay { generation: u64 },
}

/// Output of sequencer operations, drained by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEffect {
    Schedule { after: Duration, timer: SequencerTimer },
    TrackStarted { track: TrackId, route: PlayRoute },
    TrackFailed { track: TrackId, kind: PlaybackErrorKind },
}

pub struct TrackSequencer {
    router: AudioRouter,
    tracks: [Track; 3],
    config: SequencerConfig,
    master_volume: f32,
    meditation_enabled: bool,
    flow_generation: u64,
    media_volume: Option<f32>,
    effects: Vec<SequencerEffect>,
}

impl TrackSequencer {
    pub fn new(
        router: AudioRouter,
        sources: impl IntoIterator<Item = (TrackId, SourceRef)>,
        config: SequencerConfig,
    ) -> Self {
        let mut primary = SourceRef::default_for(TrackId::Primary);
        let mut looped = SourceRef::default_for(TrackId::Loop);
        let mut alarm = SourceRef::default_for(TrackId::Alarm);
        for (id, source) in sources {
            match id {
                TrackId::Primary => primary = source,
                TrackId::Loop => looped = source,
                TrackId::Alarm => alarm = source,
            }
        }
        let tracks = [
            Track::new(TrackId::Primary, primary, config.primary_weight),
            Track::new(TrackId::Loop, looped, config.loop_weight),
            Track::new(TrackId::Alarm, alarm, 1.0),
        ];
        let mut sequencer = Self {
            router,
            tracks,
            config,
            master_volume: 0.5,
            meditation_enabled: true,
            flow_generation: 0,
            media_volume: None,
            effects: Vec::new(),
        };
        for id in TrackId::ALL {
            sequencer.tracks[id.index()].volume = sequencer.effective_volume(id);
        }
        sequencer
    }

    /// Probe the native bridge once and wire both backends over `sources`.
    pub fn with_host(
        host: Box<dyn MediaHost>,
        bridge: Option<Box<dyn NativeBridge>>,
        sources: Vec<(TrackId, SourceRef)>,
        config: SequencerConfig,
    ) -> Self {
        let local = LocalMediaBackend::new(host, sources.iter().cloned());
        let native = NativeBridgeBackend::probe(bridge, sources.iter().cloned());
        Self::new(AudioRouter::new(local, native), sources, config)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn router(&self) -> &AudioRouter {
        &self.router
    }

    pub fn track(&self, id: TrackId) -> &Track {
        &self.tracks[id.index()]
    }

    pub fn state(&self, id: TrackId) -> TrackState {
        self.track(id).state
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn meditation_enabled(&self) -> bool {
        self.meditation_enabled
    }

    /// Last device media volume the sequencer applied.
    pub fn media_volume(&self) -> Option<f32> {
        self.media_volume
    }

    pub fn effective_volume(&self, id: TrackId) -> f32 {
        match id {
            TrackId::Alarm => self.config.alarm_volume.clamp(0.0, 1.0),
            _ => effective_volume(self.master_volume, self.track(id).weight),
        }
    }

    /// Alarm is sounding or being started.
    pub fn alarm_engaged(&self) -> bool {
        let alarm = self.track(TrackId::Alarm);
        alarm.state == TrackState::Playing || alarm.is_starting()
    }

    pub fn drain_effects(&mut self) -> Vec<SequencerEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Whether a timer issued earlier still applies.
    pub fn is_current(&self, timer: &SequencerTimer) -> bool {
        match *timer {
            SequencerTimer::Retry { track, generation } => {
                let track = self.track(track);
                track.generation == generation
                    && track.attempt.is_some_and(|c| c.awaiting.is_none())
            }
            SequencerTimer::LoadTimeout {
                track,
                generation,
                attempt,
            } => {
                let track = self.track(track);
                track.generation == generation
                    && track
                        .attempt
                        .is_some_and(|c| c.made == attempt && c.awaiting.is_some())
            }
            SequencerTimer::GraceDelay { generation } => generation == self.flow_generation,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_meditation_enabled(&mut self, enabled: bool) {
        self.meditation_enabled = enabled;
    }

    /// Recompute primary and loop volumes without restarting them.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        for id in [TrackId::Primary, TrackId::Loop] {
            let volume = self.effective_volume(id);
            self.tracks[id.index()].volume = volume;
            self.router.set_volume(id, volume);
        }
        debug!(master = self.master_volume, "master volume applied");
    }

    /// Seek primary and loop back to position zero.
    pub fn rewind_flow(&mut self) {
        let local = self.router.local_mut();
        local.rewind(TrackId::Primary);
        local.rewind(TrackId::Loop);
    }

    /// Start buffering a track without playing it.
    pub fn preload(&mut self, id: TrackId) {
        if let Err(err) = self.router.local_mut().preload(id) {
            warn!(track = %id, error = %err, "preload failed");
            return;
        }
        let track = &mut self.tracks[id.index()];
        if track.state == TrackState::Unloaded {
            track.state = TrackState::Loading;
        }
    }

    pub fn start_meditation_flow(&mut self) {
        if self.alarm_engaged() {
            self.stop_alarm();
        }
        self.flow_generation += 1;
        let first = if self.meditation_enabled {
            TrackId::Primary
        } else {
            TrackId::Loop
        };
        info!(first = %first, meditation = self.meditation_enabled, "starting meditation flow");
        self.start(first);
    }

    /// Explicit start. A `Failed` track gets a fresh attempt budget; a track
    /// already playing or starting is left alone.
    pub fn start(&mut self, id: TrackId) {
        let track = &mut self.tracks[id.index()];
        if track.attempt.is_some() {
            debug!(track = %id, "start already in flight");
            return;
        }
        if track.state == TrackState::Playing {
            debug!(track = %id, "already playing");
            return;
        }
        if track.state == TrackState::Failed {
            track.state = TrackState::Unloaded;
        }
        track.attempt = Some(AttemptCounter::default());
        self.attempt(id);
    }

    /// Pre-empt primary and loop, then start the alarm.
    pub fn start_alarm(&mut self) {
        self.stop_flow();
        self.router.local_mut().rewind(TrackId::Alarm);
        self.start(TrackId::Alarm);
    }

    /// Stop primary and loop and invalidate the grace delay.
    pub fn stop_flow(&mut self) {
        self.flow_generation += 1;
        self.stop_track(TrackId::Primary);
        self.stop_track(TrackId::Loop);
    }

    /// Stop the alarm and any shadow alarm element.
    pub fn stop_alarm(&mut self) {
        self.stop_track(TrackId::Alarm);
    }

    /// Stop everything and restore every volume to its configured level.
    pub fn stop_all(&mut self) {
        self.stop_flow();
        self.stop_alarm();
        for id in TrackId::ALL {
            let volume = self.effective_volume(id);
            self.tracks[id.index()].volume = volume;
            self.router.set_volume(id, volume);
        }
        self.restore_media_volume();
    }

    pub fn restore_media_volume(&mut self) {
        let level = self.config.restore_media_volume;
        match self.router.set_media_volume(level) {
            Ok(route) => {
                self.media_volume = Some(level);
                info!(level, ?route, "media volume restored");
            }
            Err(err) => warn!(level, error = %err, "could not restore media volume"),
        }
    }

    /// Ask the native platform to ring on its own. `false` without a bridge.
    pub fn schedule_native_alarm(&mut self, seconds: u64, vibrate: bool) -> bool {
        let Some(native) = self.router.native_mut() else {
            return false;
        };
        match native.schedule_alarm(seconds, vibrate) {
            Ok(()) => true,
            Err(err) => {
                warn!(seconds, error = %err, "native alarm scheduling failed");
                false
            }
        }
    }

    pub fn cancel_native_alarm(&mut self) {
        if let Some(native) = self.router.native_mut() {
            if let Err(err) = native.cancel_alarm() {
                warn!(error = %err, "native alarm cancellation failed");
            }
        }
    }

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let id = event.track();
        let awaiting = self.track(id).attempt.and_then(|c| c.awaiting);
        match event {
            MediaEvent::Ready { .. } => {
                let track = &mut self.tracks[id.index()];
                if matches!(track.state, TrackState::Unloaded | TrackState::Loading) {
                    track.state = TrackState::Ready;
                    debug!(track = %id, "media ready");
                }
            }
            MediaEvent::PlayResolved { .. } => match awaiting {
                Some(route) => self.mark_playing(id, route),
                None if self.state(id) != TrackState::Playing => {
                    debug!(track = %id, "late play resolution for a stopped track; silencing");
                    self.router.stop(id);
                }
                None => {}
            },
            MediaEvent::PlayRejected { reason, .. } => {
                if awaiting.is_some() {
                    self.attempt_failed(id, PlaybackErrorKind::PlaybackStartFailure, &reason);
                } else {
                    debug!(track = %id, %reason, "rejection for a superseded attempt ignored");
                }
            }
            MediaEvent::Ended { .. } => {
                let grace_delay = self.config.grace_delay;
                let track = &mut self.tracks[id.index()];
                if track.state != TrackState::Playing {
                    debug!(track = %id, "end event for a track not playing ignored");
                    return;
                }
                track.state = TrackState::Ready;
                if id == TrackId::Primary {
                    info!(grace_ms = grace_delay.as_millis() as u64, "primary finished; loop follows");
                    self.effects.push(SequencerEffect::Schedule {
                        after: grace_delay,
                        timer: SequencerTimer::GraceDelay {
                            generation: self.flow_generation,
                        },
                    });
                }
            }
        }
    }

    /// Run a due timer. Stale timers are ignored.
    pub fn fire(&mut self, timer: SequencerTimer) {
        if !self.is_current(&timer) {
            debug!(?timer, "stale timer ignored");
            return;
        }
        match timer {
            SequencerTimer::Retry { track, .. } => self.attempt(track),
            SequencerTimer::LoadTimeout { track, .. } => {
                self.attempt_failed(track, PlaybackErrorKind::LoadTimeout, "play did not resolve in time");
            }
            SequencerTimer::GraceDelay { .. } => self.start(TrackId::Loop),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn attempt(&mut self, id: TrackId) {
        let volume = self.effective_volume(id);
        let track = &mut self.tracks[id.index()];
        let Some(counter) = track.attempt.as_mut() else {
            return;
        };
        counter.made += 1;
        counter.awaiting = None;
        let made = counter.made;
        let generation = track.generation;
        let looping = track.looping;
        if track.state == TrackState::Unloaded {
            track.state = TrackState::Loading;
        }
        track.volume = volume;
        info!(track = %id, attempt = made, volume, looping, "starting track");

        let result = match id {
            TrackId::Alarm => self
                .router
                .play_alarm(volume, self.config.shadow_alarm_volume),
            _ => self.router.play(id, volume, looping),
        };
        match result {
            Ok((PlayStatus::Started, route)) => self.mark_playing(id, route),
            Ok((PlayStatus::Pending, route)) => {
                debug!(track = %id, ?route, "play pending");
                if let Some(counter) = self.tracks[id.index()].attempt.as_mut() {
                    counter.awaiting = Some(route);
                }
                self.effects.push(SequencerEffect::Schedule {
                    after: self.config.load_timeout,
                    timer: SequencerTimer::LoadTimeout {
                        track: id,
                        generation,
                        attempt: made,
                    },
                });
            }
            Err(err) => {
                self.attempt_failed(id, PlaybackErrorKind::PlaybackStartFailure, &err.to_string());
            }
        }
    }

    fn attempt_failed(&mut self, id: TrackId, kind: PlaybackErrorKind, reason: &str) {
        let track = &mut self.tracks[id.index()];
        let Some(counter) = track.attempt.as_mut() else {
            return;
        };
        counter.awaiting = None;
        let made = counter.made;
        if made < self.config.max_attempts {
            let delay = self.config.retry_delay(made);
            warn!(
                track = %id,
                attempt = made,
                delay_ms = delay.as_millis() as u64,
                reason,
                "track start failed; retrying"
            );
            self.effects.push(SequencerEffect::Schedule {
                after: delay,
                timer: SequencerTimer::Retry {
                    track: id,
                    generation: track.generation,
                },
            });
        } else {
            track.attempt = None;
            track.state = TrackState::Failed;
            error!(track = %id, attempts = made, ?kind, reason, "track start failed; giving up");
            self.effects.push(SequencerEffect::TrackFailed { track: id, kind });
        }
    }

    fn mark_playing(&mut self, id: TrackId, route: PlayRoute) {
        let track = &mut self.tracks[id.index()];
        track.state = TrackState::Playing;
        let attempts = track.attempt.take().map(|c| c.made).unwrap_or_default();
        info!(track = %id, ?route, attempts, "track playing");
        self.effects.push(SequencerEffect::TrackStarted { track: id, route });
    }

    fn stop_track(&mut self, id: TrackId) {
        let track = &mut self.tracks[id.index()];
        track.generation += 1;
        let was_starting = track.attempt.take().is_some();
        // A buffered track that was mid-start counts as stopped; an idle buffered one stays Ready.
        if was_starting
            || matches!(
                track.state,
                TrackState::Loading | TrackState::Playing | TrackState::Paused
            )
        {
            track.state = TrackState::Paused;
        }
        debug!(track = %id, state = ?track.state, was_starting, "track stopped");
        self.router.stop(id);
    }
}

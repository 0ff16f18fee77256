//! # Somnus Core Library
//!
//! This library provides the playback and countdown engine behind the Somnus
//! sleep/meditation timer. Like the CLI that drives it, the engine is
//! host-agnostic: every platform concern (media elements, the optional native
//! audio bridge, storage, notifications, the clock) sits behind a trait.
//!
//! ## Architecture
//!
//! - **Countdown**: a monotonic-clock state machine; the host calls
//!   `advance()` and the engine fires whichever timers are due
//! - **Audio**: an [`AudioBackend`] trait with a local media implementation and
//!   a native bridge implementation, composed by an [`AudioRouter`] that falls
//!   back to local media call by call
//! - **Sequencer**: primary -> loop -> alarm track protocol with bounded retry
//! - **Session**: the [`SessionOrchestrator`] composing all of the above and
//!   emitting [`SessionEvent`]s
//! - **Storage**: SQLite session history and TOML-based configuration
//!
//! The engine never sleeps or spawns. It keeps a deadline-ordered timer queue
//! and expects a single-threaded host loop to wake it at `next_deadline()`.

pub mod audio;
pub mod clock;
pub mod countdown;
pub mod error;
pub mod gate;
pub mod notify;
pub mod sequencer;
pub mod session;
pub mod storage;

#[cfg(test)]
mod testing;

pub use audio::{
    AudioBackend, AudioRouter, LocalMediaBackend, MediaElement, MediaEvent, MediaHost,
    NativeBridge, NativeBridgeBackend, PlayRoute, PlayStatus, ReadyState, SourceRef, TrackId,
    TrackState,
};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use countdown::{Countdown, CountdownEvent, CountdownState};
pub use error::{
    BackendError, ConfigError, CoreError, DatabaseError, NotifyError, PlaybackErrorKind,
    ValidationError,
};
pub use gate::{Admission, GestureKind, InteractionGate};
pub use notify::{LogNotifier, Notifier, TerminalNotifier};
pub use sequencer::{SequencerConfig, SequencerEffect, SequencerTimer, Track, TrackSequencer};
pub use session::{
    Collaborators, PlaybackSession, SessionEvent, SessionOrchestrator, SessionSettings,
    SessionState,
};
pub use storage::{Config, Database, SessionRecord, SessionStore};

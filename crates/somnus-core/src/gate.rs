//! First-gesture latch.
//!
//! Hosts with autoplay restrictions refuse to start audio until the user has
//! interacted with the page. The gate holds playback requests until the first
//! qualifying gesture, then hands them back in arrival order. It arms exactly
//! once and never resets.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Input kinds a host may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    Pointer,
    Touch,
    Key,
    Scroll,
    Focus,
}

impl GestureKind {
    /// Only pointer, touch and key input unlock autoplay.
    pub fn qualifies(self) -> bool {
        matches!(self, GestureKind::Pointer | GestureKind::Touch | GestureKind::Key)
    }
}

/// Outcome of offering a request to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<T> {
    /// The gate is armed; run the request now.
    Proceed(T),
    /// Queued until the first gesture.
    Deferred,
}

#[derive(Debug)]
pub struct InteractionGate<T> {
    armed: bool,
    queue: VecDeque<T>,
}

impl<T> InteractionGate<T> {
    pub fn new() -> Self {
        Self {
            armed: false,
            queue: VecDeque::new(),
        }
    }

    pub fn has_gesture(&self) -> bool {
        self.armed
    }

    /// Number of requests waiting for the first gesture.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pass `request` through if armed, otherwise queue it.
    pub fn arm_on_first_gesture(&mut self, request: T) -> Admission<T> {
        if self.armed {
            Admission::Proceed(request)
        } else {
            self.queue.push_back(request);
            debug!(pending = self.queue.len(), "request deferred until first gesture");
            Admission::Deferred
        }
    }

    /// Report an input event.
    ///
    /// The first qualifying gesture arms the gate and returns every queued
    /// request in FIFO order. Every later call returns an empty list.
    pub fn observe(&mut self, kind: GestureKind) -> Vec<T> {
        if self.armed || !kind.qualifies() {
            return Vec::new();
        }
        self.armed = true;
        info!(?kind, replayed = self.queue.len(), "first user gesture observed");
        self.queue.drain(..).collect()
    }
}

impl<T> Default for InteractionGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

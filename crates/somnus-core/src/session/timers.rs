//! Deadline-ordered timer queue.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::sequencer::SequencerTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    CountdownTick,
    Sequencer(SequencerTimer),
}

/// Timers keyed by `(deadline, insertion order)`, so equal deadlines fire
/// in the order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: BTreeMap<(Duration, u64), Timer>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Duration, timer: Timer) {
        self.entries.insert((at, self.next_seq), timer);
        self.next_seq += 1;
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, Timer)> {
        let (&key, _) = self.entries.first_key_value()?;
        if key.0 > now {
            return None;
        }
        self.entries.remove(&key).map(|timer| (key.0, timer))
    }

    /// Drop every entry equal to `timer`. Returns how many were removed.
    pub fn cancel(&mut self, timer: &Timer) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, t| t != timer);
        before - self.entries.len()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Timer) -> bool) {
        self.entries.retain(|_, t| keep(t));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

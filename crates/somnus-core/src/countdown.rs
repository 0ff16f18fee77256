//! Session countdown.
//!
//! A monotonic-clock state machine with no internal timer. The owner calls
//! `tick(now)` at or after [`Countdown::next_tick_at`].
//!
//! ```text
//! Idle -> Running -> Completed
//!   ^        |
//!   +-pause--+
//! ```
//!
//! Remaining time is always recomputed from the anchor taken at the last
//! `start` and carried across pauses at full precision, so late ticks and
//! pause/resume cycles never accumulate drift. Reported seconds round up.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    Idle,
    Running,
    Completed,
}

impl CountdownState {
    pub fn as_str(self) -> &'static str {
        match self {
            CountdownState::Idle => "idle",
            CountdownState::Running => "running",
            CountdownState::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { remaining_secs: u64 },
    Completed,
}

/// Serializes the reported fields only; the precise remainder stays private.
#[derive(Debug, Clone, Serialize)]
pub struct Countdown {
    state: CountdownState,
    total_secs: u64,
    remaining_secs: u64,
    /// Exact time left when the anchor was taken, or now if not running.
    #[serde(skip)]
    base: Duration,
    /// Monotonic time of the last `start`; only set while running.
    #[serde(skip)]
    anchor: Option<Duration>,
}

impl Countdown {
    pub fn new(total_secs: u64) -> Result<Self, ValidationError> {
        if total_secs == 0 {
            return Err(ValidationError::InvalidDuration { seconds: 0 });
        }
        Ok(Self {
            state: CountdownState::Idle,
            total_secs,
            remaining_secs: total_secs,
            base: Duration::from_secs(total_secs),
            anchor: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }

    /// Some time has elapsed since the last reset.
    pub fn has_progress(&self) -> bool {
        self.remaining_secs < self.total_secs
    }

    /// When the reported remaining seconds next drop by one. `None` unless running.
    pub fn next_tick_at(&self) -> Option<Duration> {
        let anchor = self.anchor?;
        let target = Duration::from_secs(self.remaining_secs.saturating_sub(1));
        Some(anchor + self.base.saturating_sub(target))
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Idle -> Running. Continues from the exact time left.
    pub fn start(&mut self, now: Duration) -> bool {
        if self.state != CountdownState::Idle {
            return false;
        }
        self.state = CountdownState::Running;
        self.anchor = Some(now);
        true
    }

    /// Running -> Idle, keeping the time left.
    pub fn pause(&mut self, now: Duration) -> bool {
        if self.state != CountdownState::Running {
            return false;
        }
        self.base = self.remaining_at(now);
        self.remaining_secs = ceil_secs(self.base);
        self.state = CountdownState::Idle;
        self.anchor = None;
        true
    }

    pub fn reset(&mut self, total_secs: u64) -> Result<(), ValidationError> {
        if self.state == CountdownState::Running {
            return Err(ValidationError::InvalidTransition {
                state: self.state.as_str(),
                action: "reset",
            });
        }
        if total_secs == 0 {
            return Err(ValidationError::InvalidDuration { seconds: 0 });
        }
        self.state = CountdownState::Idle;
        self.total_secs = total_secs;
        self.remaining_secs = total_secs;
        self.base = Duration::from_secs(total_secs);
        self.anchor = None;
        Ok(())
    }

    /// Recompute the remaining time. Completes when it reaches zero.
    pub fn tick(&mut self, now: Duration) -> Option<CountdownEvent> {
        if !self.is_running() || self.anchor.is_none() {
            return None;
        }
        self.remaining_secs = ceil_secs(self.remaining_at(now));
        if self.remaining_secs == 0 {
            self.state = CountdownState::Completed;
            self.anchor = None;
            return Some(CountdownEvent::Completed);
        }
        Some(CountdownEvent::Tick {
            remaining_secs: self.remaining_secs,
        })
    }

    fn remaining_at(&self, now: Duration) -> Duration {
        match self.anchor {
            Some(anchor) => self.base.saturating_sub(now.saturating_sub(anchor)),
            None => self.base,
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert_eq!(
            Countdown::new(0).unwrap_err(),
            ValidationError::InvalidDuration { seconds: 0 }
        );
    }

    #[test]
    fn ticks_count_down_from_anchor() {
        let mut cd = Countdown::new(10).unwrap();
        assert!(cd.start(secs(100)));
        assert_eq!(cd.next_tick_at(), Some(secs(101)));

        assert_eq!(cd.tick(secs(101)), Some(CountdownEvent::Tick { remaining_secs: 9 }));
        assert_eq!(cd.next_tick_at(), Some(secs(102)));
    }

    #[test]
    fn late_ticks_do_not_drift() {
        let mut cd = Countdown::new(60).unwrap();
        cd.start(secs(0));

        // Host was suspended for 42.7 s.
        cd.tick(Duration::from_millis(42_700));
        assert_eq!(cd.remaining_secs(), 18);
        assert_eq!(cd.next_tick_at(), Some(secs(43)));
    }

    #[test]
    fn completes_exactly_once() {
        let mut cd = Countdown::new(3).unwrap();
        cd.start(secs(0));
        assert_eq!(cd.tick(secs(3)), Some(CountdownEvent::Completed));
        assert_eq!(cd.state(), CountdownState::Completed);
        assert_eq!(cd.tick(secs(4)), None);
        assert_eq!(cd.next_tick_at(), None);
    }

    #[test]
    fn pause_keeps_remaining_and_resume_continues() {
        let mut cd = Countdown::new(30).unwrap();
        cd.start(secs(0));
        assert!(cd.pause(Duration::from_millis(10_400)));
        assert_eq!(cd.state(), CountdownState::Idle);
        assert_eq!(cd.remaining_secs(), 20);
        assert_eq!(cd.next_tick_at(), None);

        cd.start(secs(500));
        assert_eq!(cd.tick(secs(505)), Some(CountdownEvent::Tick { remaining_secs: 15 }));
    }

    #[test]
    fn sub_second_pause_cycles_still_count_down() {
        let mut cd = Countdown::new(60).unwrap();
        let mut now = Duration::ZERO;
        for _ in 0..50 {
            assert!(cd.start(now));
            now += Duration::from_millis(900);
            assert!(cd.pause(now));
        }
        // 45 s have run in total.
        assert_eq!(cd.remaining_secs(), 15);

        cd.start(secs(1000));
        assert_eq!(cd.next_tick_at(), Some(secs(1001)));
        assert_eq!(cd.tick(secs(1015)), Some(CountdownEvent::Completed));
    }

    #[test]
    fn fractional_remainder_ticks_on_second_boundaries() {
        let mut cd = Countdown::new(10).unwrap();
        cd.start(secs(0));
        cd.pause(Duration::from_millis(2_300));
        assert_eq!(cd.remaining_secs(), 8);

        // 7.7 s left: the display drops to 7 after 0.7 s, then every second.
        cd.start(secs(100));
        assert_eq!(cd.next_tick_at(), Some(Duration::from_millis(100_700)));
        assert_eq!(
            cd.tick(Duration::from_millis(100_700)),
            Some(CountdownEvent::Tick { remaining_secs: 7 })
        );
        assert_eq!(cd.next_tick_at(), Some(Duration::from_millis(101_700)));
        assert_eq!(cd.tick(Duration::from_millis(107_700)), Some(CountdownEvent::Completed));
    }

    #[test]
    fn reset_rejected_while_running() {
        let mut cd = Countdown::new(30).unwrap();
        cd.start(secs(0));
        let err = cd.reset(60).unwrap_err();
        assert_eq!(err.to_string(), "Cannot reset while running");
    }

    #[test]
    fn reset_from_completed_returns_to_idle() {
        let mut cd = Countdown::new(1).unwrap();
        cd.start(secs(0));
        cd.tick(secs(1));
        cd.reset(120).unwrap();
        assert_eq!(cd.state(), CountdownState::Idle);
        assert_eq!(cd.remaining_secs(), 120);
        assert!(!cd.has_progress());
    }

    #[test]
    fn start_is_ignored_unless_idle() {
        let mut cd = Countdown::new(5).unwrap();
        assert!(cd.start(secs(0)));
        assert!(!cd.start(secs(1)));
        cd.tick(secs(5));
        assert!(!cd.start(secs(6)));
    }

    proptest! {
        #[test]
        fn remaining_stays_within_bounds(
            total in 1u64..7200,
            steps in prop::collection::vec(0u64..5_000, 1..64),
        ) {
            let mut cd = Countdown::new(total).unwrap();
            cd.start(Duration::ZERO);
            let mut now = Duration::ZERO;
            let mut last = total;
            for step in steps {
                now += Duration::from_millis(step);
                cd.tick(now);
                prop_assert!(cd.remaining_secs() <= total);
                prop_assert!(cd.remaining_secs() <= last);
                prop_assert_eq!(cd.remaining_secs() == 0, cd.state() == CountdownState::Completed);
                last = cd.remaining_secs();
            }
        }
    }
}

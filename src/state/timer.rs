//! Shared 12-hour challenge countdown.
//!
//! Only the start timestamp is stored. Elapsed and remaining time are derived
//! from the caller's clock on every read, so there is nothing to tick.

use std::time::{Duration, SystemTime};

/// Length of the marathon.
pub const CHALLENGE_DURATION: Duration = Duration::from_secs(12 * 60 * 60);

/// Lifecycle of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// `start` has not been called since the last reset.
    NotStarted,
    /// Started and time remains.
    Running,
    /// Started and the full duration has elapsed. Terminal until reset.
    Expired,
}

/// Point-in-time view of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// When the countdown started, if it has.
    pub started_at: Option<SystemTime>,
    /// Time left, never more than the duration and never negative.
    pub remaining: Duration,
    /// Derived phase.
    pub phase: TimerPhase,
}

impl TimerSnapshot {
    /// Remaining time in whole milliseconds.
    pub fn remaining_ms(&self) -> u64 {
        u64::try_from(self.remaining.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether the countdown is currently running.
    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }
}

/// Countdown with idempotent start semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeTimer {
    started_at: Option<SystemTime>,
    duration: Duration,
}

impl Default for ChallengeTimer {
    fn default() -> Self {
        Self {
            started_at: None,
            duration: CHALLENGE_DURATION,
        }
    }
}

impl ChallengeTimer {
    /// A stopped timer with the standard duration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a timer from a persisted start timestamp.
    pub fn restore(started_at: Option<SystemTime>) -> Self {
        Self {
            started_at,
            ..Self::default()
        }
    }

    /// Start timestamp, if started.
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// Total length of the countdown.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start the countdown at `now` unless it is already started.
    ///
    /// Returns `true` when this call set the start timestamp. Repeated calls
    /// never move or extend the clock.
    pub fn start(&mut self, now: SystemTime) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Return to the not-started state.
    pub fn reset(&mut self) {
        self.started_at = None;
    }

    /// Compute remaining time and phase as seen at `now`.
    ///
    /// A `now` earlier than the start (clock skew between writers) counts as
    /// zero elapsed time.
    pub fn snapshot(&self, now: SystemTime) -> TimerSnapshot {
        let Some(started_at) = self.started_at else {
            return TimerSnapshot {
                started_at: None,
                remaining: self.duration,
                phase: TimerPhase::NotStarted,
            };
        };

        let elapsed = now.duration_since(started_at).unwrap_or(Duration::ZERO);
        let remaining = self.duration.saturating_sub(elapsed);
        let phase = if remaining.is_zero() {
            TimerPhase::Expired
        } else {
            TimerPhase::Running
        };

        TimerSnapshot {
            started_at: Some(started_at),
            remaining,
            phase,
        }
    }
}

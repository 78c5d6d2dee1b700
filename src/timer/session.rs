// ABOUTME: Stopwatch/countdown session state machine
// ABOUTME: Pure elapsed/remaining/progress arithmetic over corrected timestamps

use crate::error::Error;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Counts up from zero
    Stopwatch,
    /// Counts down from a fixed duration
    Countdown,
}

/// Timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// No active session
    Stopped,
    /// Session advancing
    Running,
    /// Session frozen; elapsed time is preserved
    Paused,
}

impl TimerState {
    /// Protocol/log string for the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Stopped => "stopped",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stopwatch or countdown session.
///
/// All arithmetic is expressed over caller-supplied "now" timestamps from the
/// corrected clock, which keeps the session logic pure and makes elapsed time
/// immune to a constant clock offset (it cancels out of the difference).
#[derive(Debug, Clone)]
pub struct TimerSession {
    mode: TimerMode,
    duration_secs: f64,
    state: TimerState,
    /// Corrected-clock timestamp at which the current running interval began
    reference_start: f64,
    /// Elapsed time banked by previous running intervals
    paused_accumulated: f64,
}

impl TimerSession {
    /// Start a new running session at corrected time `now`.
    ///
    /// Countdown sessions require a positive duration; a stopwatch duration of
    /// zero means "unbounded".
    pub fn start(mode: TimerMode, duration_secs: f64, now: f64) -> Result<Self> {
        if mode == TimerMode::Countdown && duration_secs <= 0.0 {
            return Err(Error::InvalidDuration);
        }
        Ok(Self {
            mode,
            duration_secs,
            state: TimerState::Running,
            reference_start: now,
            paused_accumulated: 0.0,
        })
    }

    /// Current state
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Session mode
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Configured duration in seconds (0 for an unbounded stopwatch)
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Total elapsed running time at corrected time `now`.
    ///
    /// Paused gaps contribute nothing: while paused only the banked
    /// accumulator counts, and resume re-anchors `reference_start`.
    pub fn elapsed_at(&self, now: f64) -> f64 {
        match self.state {
            TimerState::Running => (now - self.reference_start).max(0.0) + self.paused_accumulated,
            TimerState::Paused | TimerState::Stopped => self.paused_accumulated,
        }
    }

    /// Remaining countdown time at corrected time `now`, clamped at zero
    pub fn remaining_at(&self, now: f64) -> f64 {
        (self.duration_secs - self.elapsed_at(now)).max(0.0)
    }

    /// Whether a countdown has run out at corrected time `now`
    pub fn is_expired_at(&self, now: f64) -> bool {
        self.mode == TimerMode::Countdown && self.remaining_at(now) <= 0.0
    }

    /// Freeze the session, banking the elapsed time at the pause instant
    pub fn pause_at(&mut self, now: f64) -> Result<()> {
        if self.state != TimerState::Running {
            return Err(Error::InvalidStateTransition {
                state: self.state,
                event: "pause",
            });
        }
        self.paused_accumulated = self.elapsed_at(now);
        self.state = TimerState::Paused;
        Ok(())
    }

    /// Resume a paused session; the banked elapsed time is kept
    pub fn resume_at(&mut self, now: f64) -> Result<()> {
        if self.state != TimerState::Paused {
            return Err(Error::InvalidStateTransition {
                state: self.state,
                event: "resume",
            });
        }
        self.reference_start = now;
        self.state = TimerState::Running;
        Ok(())
    }

    /// Progress percent (0-100) at corrected time `now`.
    ///
    /// An unbounded stopwatch cycles 0-99 over each 60 elapsed seconds;
    /// otherwise progress is elapsed over duration, clamped at 100.
    pub fn progress_at(&self, now: f64) -> u8 {
        let elapsed = self.elapsed_at(now);
        if self.duration_secs <= 0.0 {
            ((elapsed % 60.0) * 100.0 / 60.0) as u8
        } else {
            (elapsed * 100.0 / self.duration_secs).min(100.0) as u8
        }
    }

    /// Displayed value at corrected time `now`: the formatted elapsed
    /// (stopwatch) or remaining (countdown) time plus progress percent
    pub fn display_at(&self, now: f64) -> (String, u8) {
        let value = match self.mode {
            TimerMode::Stopwatch => self.elapsed_at(now),
            TimerMode::Countdown => self.remaining_at(now),
        };
        (format_hms(value), self.progress_at(now))
    }
}

/// Format seconds as `HH:MM:SS`, truncating toward zero (never rounding up)
pub fn format_hms(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, total % 3600 / 60, total % 60)
}

//! Mutable timer state and the derived remaining-time projection.
//!
//! `TimerState` is persisted wholesale as `timer_state.json` after every
//! applied mutation. Only the accumulator's consumer task mutates it;
//! readers see it through [`TimerSnapshot`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::TimerConfig;
use super::event::ProcessedEvent;

/// Prune fires once the log grows past this many entries...
pub const EVENT_LOG_CAP: usize = 5000;
/// ...dropping this many of the oldest entries in one batch.
pub const EVENT_LOG_PRUNE: usize = 1000;

/// Per-tenant accumulator state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    /// Net seconds added by rewards; deletions subtract their exact share.
    #[serde(default)]
    pub total_added_seconds: i64,
    #[serde(default)]
    pub is_paused: bool,
    /// Stopped dominates paused: a stopped timer reads as zero remaining.
    #[serde(default)]
    pub is_stopped: bool,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    /// Accumulated paused duration, folded in on resume.
    #[serde(default)]
    pub total_paused_seconds: i64,
    /// Remaining time frozen at the moment of pause, so a paused display
    /// stays stable across reads and process restarts.
    #[serde(default)]
    pub paused_remaining_seconds: i64,
    #[serde(default)]
    pub event_log: Vec<ProcessedEvent>,
}

impl TimerState {
    /// Append an applied event and trim the oldest batch if the log has
    /// outgrown its cap. Amortized: size can sit above the prune floor but
    /// never exceeds the cap after a push.
    pub fn push_event(&mut self, event: ProcessedEvent) {
        self.event_log.push(event);
        if self.event_log.len() > EVENT_LOG_CAP {
            self.event_log.drain(0..EVENT_LOG_PRUNE);
        }
    }
}

/// Immutable read model published by the accumulator after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub config: TimerConfig,
    pub state: TimerState,
}

impl TimerSnapshot {
    /// Remaining time at `now`.
    ///
    /// Stopped reads as zero, paused reads as the frozen value, and a timer
    /// whose start lies in the future counts down to its start instead.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        if self.state.is_stopped {
            return Duration::zero();
        }
        if self.state.is_paused {
            return Duration::seconds(self.state.paused_remaining_seconds.max(0));
        }
        if now < self.config.start_time {
            return self.config.start_time - now;
        }

        let effective_elapsed = (now - self.config.start_time)
            - Duration::seconds(self.state.total_paused_seconds);

        let mut total_seconds =
            self.config.min_duration_seconds + self.state.total_added_seconds;
        if self.config.max_duration_seconds > 0
            && total_seconds > self.config.max_duration_seconds
        {
            total_seconds = self.config.max_duration_seconds;
        }

        let left = Duration::seconds(total_seconds) - effective_elapsed;
        left.max(Duration::zero())
    }

    /// Whether the countdown is live at `now`. A not-yet-started timer
    /// counts as running even though no time is being consumed.
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_stopped
            && !self.state.is_paused
            && (self.remaining_at(now) > Duration::zero() || now < self.config.start_time)
    }
}

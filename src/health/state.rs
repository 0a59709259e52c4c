//! Failure escalation state machine.
//!
//! # States
//! - Idle: last check succeeded (or none has run yet)
//! - Checking: a check is in flight
//! - Failing: failures observed, below the escalation threshold
//! - Escalating: recovery callback running, followed by the back-off pause
//!
//! # State Transitions
//! ```text
//! Idle/Failing → Checking: tick
//! Checking → Idle: success (fail count := 0)
//! Checking → Failing: failure, fail count <= max_retries
//! Checking → Escalating: failure, fail count > max_retries
//! Escalating → Idle: recovery done and retry delay elapsed (fail count := 0)
//! ```
//!
//! # Design Decisions
//! - Failures further apart than the reset window start a new incident
//! - Counters reset on escalation so one incident triggers one recovery

use std::time::Duration;
use tokio::time::Instant;

/// Monitor phase, stored as `u8` for lock-free observation.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Idle = 0,
    Checking = 1,
    Failing = 2,
    Escalating = 3,
}

impl From<u8> for MonitorPhase {
    fn from(val: u8) -> Self {
        match val {
            1 => MonitorPhase::Checking,
            2 => MonitorPhase::Failing,
            3 => MonitorPhase::Escalating,
            _ => MonitorPhase::Idle,
        }
    }
}

/// What the tracker concluded from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    /// Keep polling; `fail_count` failures in the current incident.
    Tolerate { fail_count: u32, window_reset: bool },
    /// Threshold exceeded; recovery is due.
    Escalate { fail_count: u32 },
}

/// Counts failures within a time window.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    fail_count: u32,
    last_failure: Option<Instant>,
    max_retries: u32,
    reset_window: Duration,
}

impl FailureTracker {
    pub fn new(max_retries: u32, reset_window: Duration) -> Self {
        Self {
            fail_count: 0,
            last_failure: None,
            max_retries,
            reset_window,
        }
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn record_success(&mut self) {
        self.fail_count = 0;
    }

    /// Record a failure observed at `now`.
    pub fn record_failure(&mut self, now: Instant) -> FailureVerdict {
        self.fail_count += 1;

        let window_reset = self
            .last_failure
            .map_or(true, |last| now.saturating_duration_since(last) > self.reset_window);
        if window_reset {
            self.fail_count = 1;
        }
        self.last_failure = Some(now);

        if self.fail_count > self.max_retries {
            FailureVerdict::Escalate {
                fail_count: self.fail_count,
            }
        } else {
            FailureVerdict::Tolerate {
                fail_count: self.fail_count,
                window_reset,
            }
        }
    }

    /// Called once the recovery callback has run.
    pub fn reset_after_escalation(&mut self) {
        self.fail_count = 0;
    }
}

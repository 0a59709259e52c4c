//! Periodic polling with failure escalation.
//!
//! # Responsibilities
//! - Tick on a fixed interval and run the backend's health checker
//! - Feed results into the failure tracker (state.rs)
//! - Invoke the recovery callback when failures exceed the threshold
//! - Exit cleanly on shutdown

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::MonitorConfig;
use crate::health::checker::HealthChecker;
use crate::health::state::{FailureTracker, FailureVerdict, MonitorPhase};
use crate::health::types::CheckError;
use crate::lifecycle::ShutdownSignal;
use crate::net::listener::ListenerError;
use crate::observability::metrics;

/// Which recovery the monitor is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryKind {
    /// Hard-close and rebind the backend.
    Restart,
    /// Drain the backend and stop the whole tier.
    Terminate,
}

impl RecoveryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryKind::Restart => "restart",
            RecoveryKind::Terminate => "terminate",
        }
    }
}

/// Errors reported by a recovery callback.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("failed to rebind backend: {0}")]
    Bind(#[from] ListenerError),

    #[error("backend has been terminated")]
    Terminated,
}

/// Callback invoked when a backend is considered unhealthy.
#[async_trait]
pub trait Recovery: Send + Sync {
    async fn recover(&self, kind: RecoveryKind) -> Result<(), RecoveryError>;
}

/// Timing and threshold policy of a [`Monitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorPolicy {
    pub check_interval: Duration,
    pub max_retries: u32,
    pub failure_reset_window: Duration,
    pub retry_delay: Duration,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            max_retries: 3,
            failure_reset_window: Duration::from_secs(60),
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl MonitorPolicy {
    pub fn from_config(config: &MonitorConfig, check_interval: Duration) -> Self {
        Self {
            check_interval,
            max_retries: config.max_retries,
            failure_reset_window: Duration::from_secs(config.failure_reset_window_secs),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Polls one backend and drives its recovery.
pub struct Monitor {
    name: String,
    policy: MonitorPolicy,
    checker: Arc<dyn HealthChecker>,
    recovery: Arc<dyn Recovery>,
    phase: AtomicU8,
    fail_count: AtomicU32,
}

impl Monitor {
    pub fn new(
        name: impl Into<String>,
        policy: MonitorPolicy,
        checker: Arc<dyn HealthChecker>,
        recovery: Arc<dyn Recovery>,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            checker,
            recovery,
            phase: AtomicU8::new(MonitorPhase::Idle as u8),
            fail_count: AtomicU32::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> MonitorPhase {
        MonitorPhase::from(self.phase.load(Ordering::Relaxed))
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count.load(Ordering::Relaxed)
    }

    fn set_phase(&self, phase: MonitorPhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    /// Run the polling loop until `shutdown` fires.
    pub async fn run(&self, shutdown: ShutdownSignal) {
        tracing::info!(
            monitor = %self.name,
            interval = ?self.policy.check_interval,
            max_retries = self.policy.max_retries,
            "Health monitor starting"
        );

        let period = self.policy.check_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tracker = FailureTracker::new(self.policy.max_retries, self.policy.failure_reset_window);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.cancelled() => break,
            }

            self.set_phase(MonitorPhase::Checking);
            let result = self.checker.check(&shutdown).await;
            let Some(healthy) = check_outcome(&result) else {
                break;
            };
            metrics::record_health_check(&self.name, healthy);

            match result {
                Ok(()) => {
                    tracker.record_success();
                    self.fail_count.store(0, Ordering::Relaxed);
                    self.set_phase(MonitorPhase::Idle);
                    tracing::debug!(monitor = %self.name, "Health check passed");
                }
                Err(e) => {
                    let verdict = tracker.record_failure(Instant::now());
                    self.fail_count.store(tracker.fail_count(), Ordering::Relaxed);

                    match verdict {
                        FailureVerdict::Tolerate { fail_count, window_reset } => {
                            if window_reset {
                                tracing::debug!(monitor = %self.name, "Failure outside reset window, counting a new incident");
                            }
                            self.set_phase(MonitorPhase::Failing);
                            tracing::warn!(
                                monitor = %self.name,
                                fail_count,
                                max_retries = self.policy.max_retries,
                                error = %e,
                                "Health check failed"
                            );
                        }
                        FailureVerdict::Escalate { fail_count } => {
                            self.set_phase(MonitorPhase::Escalating);
                            if !self.escalate(fail_count, &mut tracker, &shutdown).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.set_phase(MonitorPhase::Idle);
        tracing::info!(monitor = %self.name, "Health monitor received shutdown signal, exiting loop");
    }

    /// Returns `false` if shutdown fired during the back-off pause.
    async fn escalate(&self, fail_count: u32, tracker: &mut FailureTracker, shutdown: &ShutdownSignal) -> bool {
        let kind = if self.checker.take_shutdown_request() {
            RecoveryKind::Terminate
        } else {
            RecoveryKind::Restart
        };

        tracing::warn!(
            monitor = %self.name,
            fail_count,
            recovery = kind.as_str(),
            "Repeated failures detected, triggering recovery"
        );

        match self.recovery.recover(kind).await {
            Ok(()) => {
                metrics::record_recovery(&self.name, kind.as_str());
                if kind == RecoveryKind::Restart {
                    self.checker.notify_restarted();
                }
            }
            Err(e) => {
                tracing::error!(monitor = %self.name, recovery = kind.as_str(), error = %e, "Recovery failed");
            }
        }

        tracker.reset_after_escalation();
        self.fail_count.store(0, Ordering::Relaxed);

        tokio::select! {
            _ = time::sleep(self.policy.retry_delay) => {
                self.set_phase(MonitorPhase::Idle);
                true
            }
            _ = shutdown.cancelled() => false,
        }
    }
}

/// Health outcome of a finished check, `None` when it was cancelled.
fn check_outcome(result: &Result<(), CheckError>) -> Option<bool> {
    match result {
        Ok(()) => Some(true),
        Err(CheckError::Cancelled) => None,
        Err(_) => Some(false),
    }
}

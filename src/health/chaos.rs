//! Fault injection on top of a real health checker.
//!
//! # Decision Order (per check)
//! ```text
//! real check fails            → reset streak, propagate real error
//! inside uptime grace window  → healthy
//! roll < rate / (streak + 1)  → streak += 1
//!                                 streak > max → reset, healthy
//!                                 otherwise    → simulated failure
//! roll < shutdown rate        → flag terminal request, simulated failure
//! otherwise                   → reset streak, healthy
//! ```
//!
//! # Design Decisions
//! - Real failures always win; chaos never masks them
//! - Injection probability decays while a simulated outage continues
//! - The terminal decision is made once, here, and read back by the monitor
//! - Randomness is injected so tests can script outcomes

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ChaosConfig;
use crate::health::checker::HealthChecker;
use crate::health::types::{CheckError, HealthStatus};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Source of uniform integers in `[0, 100)`.
pub trait PercentRoll: Send {
    fn roll(&mut self) -> u32;
}

impl PercentRoll for StdRng {
    fn roll(&mut self) -> u32 {
        self.gen_range(0..100)
    }
}

/// Mutable chaos bookkeeping. Only touched from inside `check`.
#[derive(Debug, Clone)]
pub struct ChaosState {
    pub consecutive_failures: u32,
    pub max_consecutive_failures: u32,
    pub min_uptime_window: Duration,
    pub last_reset: Instant,
    pub failure_injection_rate: u32,
    pub shutdown_injection_rate: u32,
}

impl ChaosState {
    pub fn new(failure_injection_rate: u32, shutdown_injection_rate: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_consecutive_failures: 3,
            min_uptime_window: Duration::from_secs(60),
            last_reset: Instant::now(),
            failure_injection_rate,
            shutdown_injection_rate,
        }
    }

    pub fn from_config(config: &ChaosConfig) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
            min_uptime_window: Duration::from_secs(config.min_uptime_window_secs),
            ..Self::new(config.failure_rate, config.shutdown_rate)
        }
    }
}

/// Decorator that injects synthetic failures and shutdowns.
pub struct ChaosChecker {
    inner: Box<dyn HealthChecker>,
    state: Mutex<(ChaosState, Box<dyn PercentRoll>)>,
    shutdown_requested: AtomicBool,
}

impl ChaosChecker {
    /// Wrap `inner` with an entropy-seeded random source.
    pub fn new(inner: Box<dyn HealthChecker>, state: ChaosState) -> Self {
        Self::with_roll(inner, state, Box::new(StdRng::from_entropy()))
    }

    pub fn with_roll(inner: Box<dyn HealthChecker>, state: ChaosState, roll: Box<dyn PercentRoll>) -> Self {
        Self {
            inner,
            state: Mutex::new((state, roll)),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().0.consecutive_failures
    }

    fn lock(&self) -> MutexGuard<'_, (ChaosState, Box<dyn PercentRoll>)> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn inject(&self) -> Result<(), CheckError> {
        let mut guard = self.lock();
        let (state, roll) = &mut *guard;

        if state.last_reset.elapsed() < state.min_uptime_window {
            return Ok(());
        }

        let adjusted_rate = state.failure_injection_rate / (state.consecutive_failures + 1);
        if roll.roll() < adjusted_rate {
            state.consecutive_failures += 1;
            if state.consecutive_failures > state.max_consecutive_failures {
                tracing::debug!(
                    origin = "chaos",
                    max = state.max_consecutive_failures,
                    "Simulated outage reached its bound, reporting healthy"
                );
                state.consecutive_failures = 0;
                return Ok(());
            }
            tracing::warn!(
                origin = "chaos",
                consecutive = state.consecutive_failures,
                adjusted_rate,
                "Injecting simulated failure"
            );
            metrics::record_chaos_injection("failure");
            return Err(CheckError::Unavailable(format!(
                "simulated failure (attempt {})",
                state.consecutive_failures
            )));
        }

        if roll.roll() < state.shutdown_injection_rate {
            self.shutdown_requested.store(true, Ordering::SeqCst);
            tracing::warn!(origin = "chaos", "Injecting simulated shutdown");
            metrics::record_chaos_injection("shutdown");
            return Err(CheckError::Unavailable("simulated shutdown".to_string()));
        }

        state.consecutive_failures = 0;
        Ok(())
    }
}

#[async_trait]
impl HealthChecker for ChaosChecker {
    async fn check(&self, cancel: &ShutdownSignal) -> Result<(), CheckError> {
        // A terminal request only stands for the check that drew it.
        self.shutdown_requested.store(false, Ordering::SeqCst);

        if let Err(e) = self.inner.check(cancel).await {
            self.lock().0.consecutive_failures = 0;
            return Err(e);
        }
        self.inject()
    }

    fn status(&self) -> HealthStatus {
        self.inner.status()
    }

    fn take_shutdown_request(&self) -> bool {
        self.shutdown_requested.swap(false, Ordering::SeqCst)
    }

    fn notify_restarted(&self) {
        self.lock().0.last_reset = Instant::now();
        self.inner.notify_restarted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Inner checker returning a fixed outcome.
    struct Fixed(Result<(), CheckError>);

    #[async_trait]
    impl HealthChecker for Fixed {
        async fn check(&self, _cancel: &ShutdownSignal) -> Result<(), CheckError> {
            self.0.clone()
        }

        fn status(&self) -> HealthStatus {
            HealthStatus::unknown()
        }
    }

    /// Replays scripted rolls, then repeats the last one.
    struct Scripted {
        rolls: VecDeque<u32>,
        last: u32,
        drawn: Arc<Mutex<u32>>,
    }

    impl Scripted {
        fn new(rolls: &[u32]) -> (Self, Arc<Mutex<u32>>) {
            let drawn = Arc::new(Mutex::new(0));
            let last = rolls.last().copied().unwrap_or(99);
            (
                Self {
                    rolls: rolls.iter().copied().collect(),
                    last,
                    drawn: drawn.clone(),
                },
                drawn,
            )
        }
    }

    impl PercentRoll for Scripted {
        fn roll(&mut self) -> u32 {
            *self.drawn.lock().unwrap() += 1;
            self.rolls.pop_front().unwrap_or(self.last)
        }
    }

    fn state(failure: u32, shutdown: u32) -> ChaosState {
        ChaosState {
            min_uptime_window: Duration::ZERO,
            ..ChaosState::new(failure, shutdown)
        }
    }

    fn chaos(inner: Result<(), CheckError>, state: ChaosState, rolls: &[u32]) -> (ChaosChecker, Arc<Mutex<u32>>) {
        let (roll, drawn) = Scripted::new(rolls);
        (ChaosChecker::with_roll(Box::new(Fixed(inner)), state, Box::new(roll)), drawn)
    }

    #[tokio::test]
    async fn simulated_outage_is_bounded() {
        let (checker, _) = chaos(Ok(()), state(100, 0), &[0]);
        let signal = Shutdown::new().subscribe();

        for expected in 1..=3 {
            assert!(checker.check(&signal).await.is_err());
            assert_eq!(checker.consecutive_failures(), expected);
        }

        assert!(checker.check(&signal).await.is_ok());
        assert_eq!(checker.consecutive_failures(), 0);
        assert!(!checker.take_shutdown_request());
    }

    #[tokio::test]
    async fn injection_probability_decays() {
        // rate 60: thresholds are 60, 30, 20 for streaks 0, 1, 2.
        let (checker, _) = chaos(Ok(()), state(60, 0), &[50, 40, 99]);
        let signal = Shutdown::new().subscribe();

        assert!(checker.check(&signal).await.is_err());
        assert_eq!(checker.consecutive_failures(), 1);

        // 40 is no longer below 60 / 2; shutdown roll 99 misses too.
        assert!(checker.check(&signal).await.is_ok());
        assert_eq!(checker.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn real_failure_always_wins() {
        let real = CheckError::Status(503);
        let (checker, drawn) = chaos(Err(real.clone()), state(100, 100), &[0]);
        checker.lock().0.consecutive_failures = 2;
        let signal = Shutdown::new().subscribe();

        assert_eq!(checker.check(&signal).await, Err(real));
        assert_eq!(checker.consecutive_failures(), 0);
        assert_eq!(*drawn.lock().unwrap(), 0);
        assert!(!checker.take_shutdown_request());
    }

    #[tokio::test]
    async fn grace_window_suppresses_injection() {
        let mut grace = state(100, 100);
        grace.min_uptime_window = Duration::from_secs(3600);
        let (checker, drawn) = chaos(Ok(()), grace, &[0]);
        let signal = Shutdown::new().subscribe();

        for _ in 0..5 {
            assert!(checker.check(&signal).await.is_ok());
        }
        assert_eq!(*drawn.lock().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_reopens_grace_window() {
        let mut grace = state(100, 0);
        grace.min_uptime_window = Duration::from_secs(60);
        let (checker, _) = chaos(Ok(()), grace, &[0]);
        let signal = Shutdown::new().subscribe();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(checker.check(&signal).await.is_err());

        checker.notify_restarted();
        assert!(checker.check(&signal).await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_draw_sets_terminal_request_once() {
        // Failure roll misses (99 >= 10), shutdown roll hits (5 < 50).
        let (checker, _) = chaos(Ok(()), state(10, 50), &[99, 5, 99, 99]);
        let signal = Shutdown::new().subscribe();

        let err = checker.check(&signal).await.unwrap_err();
        assert!(matches!(err, CheckError::Unavailable(_)));
        assert!(checker.take_shutdown_request());
        assert!(!checker.take_shutdown_request());

        assert!(checker.check(&signal).await.is_ok());
        assert!(!checker.take_shutdown_request());
    }

    /// Inner checker whose outcome can be flipped between checks.
    struct Toggle(Arc<AtomicBool>);

    #[async_trait]
    impl HealthChecker for Toggle {
        async fn check(&self, _cancel: &ShutdownSignal) -> Result<(), CheckError> {
            if self.0.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(CheckError::Status(500))
            }
        }

        fn status(&self) -> HealthStatus {
            HealthStatus::unknown()
        }
    }

    #[tokio::test]
    async fn later_checks_clear_terminal_request() {
        let healthy = Arc::new(AtomicBool::new(true));
        let (roll, _) = Scripted::new(&[99, 5, 99, 99]);
        let checker = ChaosChecker::with_roll(Box::new(Toggle(healthy.clone())), state(10, 50), Box::new(roll));
        let signal = Shutdown::new().subscribe();

        // Simulated shutdown, never escalated.
        assert!(checker.check(&signal).await.is_err());

        // A healthy check drops it.
        assert!(checker.check(&signal).await.is_ok());
        assert!(!checker.take_shutdown_request());

        // So does a real failure right after a shutdown draw.
        let (roll, _) = Scripted::new(&[99, 5]);
        let checker = ChaosChecker::with_roll(Box::new(Toggle(healthy.clone())), state(10, 50), Box::new(roll));
        assert!(checker.check(&signal).await.is_err());
        healthy.store(false, Ordering::SeqCst);
        assert_eq!(checker.check(&signal).await, Err(CheckError::Status(500)));
        assert!(!checker.take_shutdown_request());
    }

    #[tokio::test]
    async fn zero_rates_never_inject() {
        let checker = ChaosChecker::with_roll(
            Box::new(Fixed(Ok(()))),
            state(0, 0),
            Box::new(StdRng::seed_from_u64(7)),
        );
        let signal = Shutdown::new().subscribe();

        for _ in 0..200 {
            assert!(checker.check(&signal).await.is_ok());
        }
        assert!(!checker.take_shutdown_request());
    }

    #[test]
    fn seeded_rolls_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        assert!((0..1000).map(|_| rng.roll()).all(|r| r < 100));
    }
}

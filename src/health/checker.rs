//! The health checker capability.

use async_trait::async_trait;

use crate::health::types::{CheckError, HealthStatus};
use crate::lifecycle::ShutdownSignal;

/// Liveness probing for a single backend.
///
/// Implemented by [`HttpChecker`](crate::health::active::HttpChecker) and
/// decorated by [`ChaosChecker`](crate::health::chaos::ChaosChecker).
/// `check` must return [`CheckError::Cancelled`] promptly once `cancel`
/// fires.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Run one check, retrying within the checker's attempt budget.
    async fn check(&self, cancel: &ShutdownSignal) -> Result<(), CheckError>;

    /// Last recorded status. Safe to call while a check is in flight.
    fn status(&self) -> HealthStatus;

    /// Read and clear a pending terminal request raised by the last checks.
    fn take_shutdown_request(&self) -> bool {
        false
    }

    /// Called after the backend has been restarted.
    fn notify_restarted(&self) {}
}

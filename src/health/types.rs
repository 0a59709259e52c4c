//! Health check value types and errors.

use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Probe parameters for one backend. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Full URL of the health endpoint.
    pub target_url: String,
    /// Deadline for a single probe.
    pub timeout: Duration,
    /// Polling interval used by the monitor.
    pub check_interval: Duration,
    /// Probe attempts per check.
    pub retry_attempts: u32,
    /// Wait between failed attempts.
    pub retry_delay: Duration,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            timeout: Duration::from_secs(5),
            check_interval: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Why a health check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// Connection could not be established or the exchange broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the probe deadline.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// Response outside the 2xx range.
    #[error("unhealthy status code: {0}")]
    Status(u16),

    /// Backend reported as unavailable without a protocol-level cause.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The caller's cancellation signal fired.
    #[error("health check cancelled")]
    Cancelled,
}

/// Last known result of a health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    /// `None` until the first check completes.
    pub last_check: Option<SystemTime>,
    pub error: Option<CheckError>,
}

impl HealthStatus {
    /// Status before any check has run.
    pub fn unknown() -> Self {
        Self {
            healthy: false,
            last_check: None,
            error: None,
        }
    }

    pub(crate) fn observed(result: Result<(), CheckError>) -> Self {
        Self {
            healthy: result.is_ok(),
            last_check: Some(SystemTime::now()),
            error: result.err(),
        }
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor (monitor.rs), one task per backend:
//!     Periodic timer
//!     → HealthChecker::check
//!         HttpChecker (active.rs): bounded retries against /health_check
//!         ChaosChecker (chaos.rs): optional decorator injecting faults
//!     → FailureTracker (state.rs)
//!     → Recovery callback on escalation (restart or terminate)
//! ```
//!
//! # Design Decisions
//! - Checkers compose by decoration behind one trait
//! - Health state never feeds back into load balancing
//! - Monitors share nothing but the shutdown signal

pub mod active;
pub mod chaos;
pub mod checker;
pub mod monitor;
pub mod state;
pub mod types;

pub use active::HttpChecker;
pub use chaos::{ChaosChecker, ChaosState, PercentRoll};
pub use checker::HealthChecker;
pub use monitor::{Monitor, MonitorPolicy, Recovery, RecoveryError, RecoveryKind};
pub use state::{FailureTracker, FailureVerdict, MonitorPhase};
pub use types::{CheckConfig, CheckError, HealthStatus};

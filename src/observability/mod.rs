//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Backend name is a field on every health and recovery event
//! - Chaos-injected failures are tagged `origin = "chaos"`
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;

//! Self-healing HTTP edge tier.
//!
//! Backends serve behind a round-robin load balancer while one monitor per
//! backend polls its health endpoint and restarts it after repeated
//! failures. An optional chaos decorator injects synthetic faults.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;

pub use config::EdgeConfig;
pub use health::{ChaosChecker, HealthChecker, HttpChecker, Monitor};
pub use http::HttpServer;
pub use lifecycle::{Orchestrator, OrchestratorError, Shutdown, ShutdownSignal};
pub use load_balancer::LoadBalancer;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or built-in defaults
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!     → handed to the orchestrator as a plain value
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend set never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    BackendConfig, ChaosConfig, EdgeConfig, HealthCheckConfig, LifecycleConfig, LoadBalancerConfig,
    MonitorConfig, ObservabilityConfig, TimeoutConfig,
};

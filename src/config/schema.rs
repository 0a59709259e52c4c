//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge tier.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::health::CheckConfig;

/// Root configuration for the edge tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Load balancer listener.
    pub load_balancer: LoadBalancerConfig,

    /// Backend serving instances, in rotation order.
    pub backends: Vec<BackendConfig>,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Failure escalation settings.
    pub monitor: MonitorConfig,

    /// Fault injection settings.
    pub chaos: ChaosConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Restart and shutdown timings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            load_balancer: LoadBalancerConfig::default(),
            backends: vec![
                BackendConfig {
                    name: "server-01".to_string(),
                    address: "127.0.0.1:8001".to_string(),
                },
                BackendConfig {
                    name: "server-02".to_string(),
                    address: "127.0.0.1:8002".to_string(),
                },
            ],
            health_check: HealthCheckConfig::default(),
            monitor: MonitorConfig::default(),
            chaos: ChaosConfig::default(),
            timeouts: TimeoutConfig::default(),
            lifecycle: LifecycleConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Load balancer listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend identifier used in logs and metrics.
    pub name: String,

    /// Backend address (e.g., "127.0.0.1:8001").
    pub address: String,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Path to probe on every backend.
    pub path: String,

    /// Polling interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Probe attempts per check.
    pub retry_attempts: u32,

    /// Delay between failed attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            path: "/health_check".to_string(),
            interval_secs: 30,
            timeout_secs: 5,
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl HealthCheckConfig {
    /// Derive the probe configuration for one backend.
    pub fn check_config(&self, addr: SocketAddr) -> CheckConfig {
        CheckConfig {
            target_url: format!("http://{}{}", addr, self.path),
            timeout: Duration::from_secs(self.timeout_secs),
            check_interval: Duration::from_secs(self.interval_secs),
            retry_attempts: self.retry_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Failure escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Failures tolerated before recovery is triggered.
    pub max_retries: u32,

    /// Failures further apart than this are treated as separate incidents.
    pub failure_reset_window_secs: u64,

    /// Pause after a recovery before polling resumes, in seconds.
    pub retry_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            failure_reset_window_secs: 60,
            retry_delay_secs: 5,
        }
    }
}

/// Fault injection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChaosConfig {
    /// Wrap every health checker with the chaos decorator.
    pub enabled: bool,

    /// Probability (percent) of a simulated failure.
    pub failure_rate: u32,

    /// Probability (percent) of a simulated shutdown.
    pub shutdown_rate: u32,

    /// Upper bound on a simulated outage, in consecutive failures.
    pub max_consecutive_failures: u32,

    /// No injection until this much time has passed since start or restart.
    pub min_uptime_window_secs: u64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_rate: 35,
            shutdown_rate: 35,
            max_consecutive_failures: 3,
            min_uptime_window_secs: 60,
        }
    }
}

/// Timeout configuration for serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 15 }
    }
}

/// Restart and shutdown timings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Pause between closing a listener and binding its replacement.
    pub restart_settle_ms: u64,

    /// Bound on draining a backend before chaos termination.
    pub drain_timeout_secs: u64,

    /// Bound on cooperative shutdown before tasks are aborted.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            restart_settle_ms: 1000,
            drain_timeout_secs: 5,
            shutdown_grace_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

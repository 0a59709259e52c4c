//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, rates are percentages)
//! - Detect address collisions between backends and the balancer
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::EdgeConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: String, value: String },

    #[error("backend address {0} is configured more than once")]
    DuplicateAddress(SocketAddr),

    #[error("backend address {0} collides with the load balancer")]
    BalancerCollision(SocketAddr),

    #[error("{field} must be a percentage (0..=100), got {value}")]
    RateOutOfRange { field: &'static str, value: u32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("health_check.path must start with '/', got {0:?}")]
    InvalidPath(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let balancer = match config.load_balancer.bind_address.parse::<SocketAddr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field: "load_balancer.bind_address".to_string(),
                value: config.load_balancer.bind_address.clone(),
            });
            None
        }
    };

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends {
        let Ok(addr) = backend.address.parse::<SocketAddr>() else {
            errors.push(ValidationError::InvalidAddress {
                field: format!("backends.{}.address", backend.name),
                value: backend.address.clone(),
            });
            continue;
        };
        if !seen.insert(addr) {
            errors.push(ValidationError::DuplicateAddress(addr));
        }
        if balancer.is_some_and(|lb| lb.port() == addr.port() && (lb.ip() == addr.ip() || lb.ip().is_unspecified())) {
            errors.push(ValidationError::BalancerCollision(addr));
        }
    }

    for (field, value) in [
        ("chaos.failure_rate", config.chaos.failure_rate),
        ("chaos.shutdown_rate", config.chaos.shutdown_rate),
    ] {
        if value > 100 {
            errors.push(ValidationError::RateOutOfRange { field, value });
        }
    }

    let positive = [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("health_check.retry_attempts", u64::from(config.health_check.retry_attempts)),
        ("chaos.max_consecutive_failures", u64::from(config.chaos.max_consecutive_failures)),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("lifecycle.shutdown_grace_secs", config.lifecycle.shutdown_grace_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.health_check.path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

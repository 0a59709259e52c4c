//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides and validate the result.
pub fn load_config(path: &Path) -> Result<EdgeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: EdgeConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Defaults plus environment overrides, validated.
pub fn load_default() -> Result<EdgeConfig, ConfigError> {
    let mut config = EdgeConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply the supported environment variables.
///
/// Rates are only read when chaos mode is enabled; unparsable values keep
/// the configured rate.
pub fn apply_env_overrides<F>(config: &mut EdgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(enabled) = lookup("CHAOS_MODE_ENABLED") {
        config.chaos.enabled = enabled == "true";
    }

    if config.chaos.enabled {
        if let Some(rate) = lookup("CHAOS_FAILURE_RATE").and_then(|v| v.parse().ok()) {
            config.chaos.failure_rate = rate;
        }
        if let Some(rate) = lookup("CHAOS_SHUTDOWN_RATE").and_then(|v| v.parse().ok()) {
            config.chaos.shutdown_rate = rate;
        }
    }

    if let Some(addr) = lookup("EDGE_LB_ADDRESS") {
        config.load_balancer.bind_address = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn chaos_rates_need_chaos_enabled() {
        let mut config = EdgeConfig::default();
        apply_env_overrides(&mut config, env(&[("CHAOS_FAILURE_RATE", "80")]));
        assert!(!config.chaos.enabled);
        assert_eq!(config.chaos.failure_rate, 35);

        apply_env_overrides(
            &mut config,
            env(&[
                ("CHAOS_MODE_ENABLED", "true"),
                ("CHAOS_FAILURE_RATE", "80"),
                ("CHAOS_SHUTDOWN_RATE", "oops"),
            ]),
        );
        assert!(config.chaos.enabled);
        assert_eq!(config.chaos.failure_rate, 80);
        assert_eq!(config.chaos.shutdown_rate, 35);
    }

    #[test]
    fn balancer_address_override() {
        let mut config = EdgeConfig::default();
        apply_env_overrides(&mut config, env(&[("EDGE_LB_ADDRESS", "127.0.0.1:9000")]));
        assert_eq!(config.load_balancer.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

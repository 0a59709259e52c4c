//! Fixed backend set with round-robin selection.
//!
//! # Responsibilities
//! - Hold the ordered backend set, fixed at construction
//! - Select the next backend without locks on the hot path

use std::sync::Arc;
use thiserror::Error;

use crate::config::BackendConfig;
use crate::load_balancer::{backend::Backend, round_robin::RoundRobin};
use crate::net::listener::{parse_addr, ListenerError};

#[derive(Debug, Error)]
pub enum LoadBalancerError {
    #[error("load balancer needs at least one backend")]
    EmptyBackendSet,

    #[error(transparent)]
    Address(#[from] ListenerError),

    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

/// Round-robin balancer over an immutable backend set.
///
/// Health state is deliberately not consulted: every configured backend
/// stays in rotation.
#[derive(Debug)]
pub struct LoadBalancer {
    backends: Arc<[Backend]>,
    rotation: RoundRobin,
}

impl LoadBalancer {
    pub fn new(backends: Vec<Backend>) -> Result<Self, LoadBalancerError> {
        if backends.is_empty() {
            return Err(LoadBalancerError::EmptyBackendSet);
        }
        Ok(Self {
            backends: backends.into(),
            rotation: RoundRobin::new(),
        })
    }

    /// Create a balancer from configuration, preserving configured order.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, LoadBalancerError> {
        let backends = configs
            .iter()
            .map(|config| -> Result<Backend, LoadBalancerError> {
                Ok(Backend::new(config.name.clone(), parse_addr(&config.address)?)?)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(backends)
    }

    /// Next backend in rotation.
    pub fn get_next(&self) -> &Backend {
        let index = self.rotation.next_index(self.backends.len()).unwrap_or(0);
        &self.backends[index]
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;

    fn balancer(n: u16) -> LoadBalancer {
        let backends = (0..n)
            .map(|i| Backend::new(format!("b{i}"), format!("127.0.0.1:{}", 9000 + i).parse().unwrap()).unwrap())
            .collect();
        LoadBalancer::new(backends).unwrap()
    }

    #[test]
    fn fresh_balancer_visits_each_backend_in_order() {
        for n in 1..=5 {
            let lb = balancer(n);
            let picked: Vec<_> = (0..n).map(|_| lb.get_next().name.clone()).collect();
            let expected: Vec<_> = (0..n).map(|i| format!("b{i}")).collect();
            assert_eq!(picked, expected);
        }
    }

    #[test]
    fn empty_set_rejected() {
        assert!(matches!(LoadBalancer::new(Vec::new()), Err(LoadBalancerError::EmptyBackendSet)));
    }

    #[test]
    fn from_config_rejects_bad_address() {
        let configs = vec![BackendConfig {
            name: "b".into(),
            address: "nope".into(),
        }];
        assert!(matches!(LoadBalancer::from_config(&configs), Err(LoadBalancerError::Address(_))));
    }

    #[test]
    fn from_config_builds_base_urls() {
        let configs = vec![
            BackendConfig {
                name: "v4".into(),
                address: "127.0.0.1:8001".into(),
            },
            BackendConfig {
                name: "v6".into(),
                address: "[::1]:8002".into(),
            },
        ];
        let lb = LoadBalancer::from_config(&configs).unwrap();
        let urls: Vec<_> = lb.backends().iter().map(|b| b.base_url.as_str()).collect();
        assert_eq!(urls, ["http://127.0.0.1:8001/", "http://[::1]:8002/"]);
    }

    #[test]
    fn concurrent_callers_share_rotation_evenly() {
        let lb = Arc::new(balancer(3));
        let (callers, per_caller) = (8, 3000);

        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let lb = lb.clone();
                thread::spawn(move || {
                    (0..per_caller)
                        .map(|_| lb.get_next().name.clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total = 0;
        for handle in handles {
            for name in handle.join().unwrap() {
                *counts.entry(name).or_default() += 1;
                total += 1;
            }
        }

        // No lost or duplicated tickets: exactly k*m selections, split evenly.
        assert_eq!(total, callers * per_caller);
        assert_eq!(lb.rotation.issued(), callers * per_caller);
        for name in ["b0", "b1", "b2"] {
            assert_eq!(counts[name], callers * per_caller / 3);
        }
    }

    #[test]
    fn independent_instances_do_not_share_counters() {
        let a = balancer(2);
        let b = balancer(2);
        assert_eq!(a.get_next().name, "b0");
        assert_eq!(a.get_next().name, "b1");
        assert_eq!(b.get_next().name, "b0");
    }
}

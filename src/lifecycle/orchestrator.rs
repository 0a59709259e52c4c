//! Top-level composition of the edge tier.
//!
//! # Data Flow
//! ```text
//! run()
//!     → validate config, build balancer and checkers (nothing bound yet)
//!     → bind every backend slot (fail fast, unwinding started slots)
//!     → bind the balancer listener
//!     → spawn per backend: Monitor task + slot supervisor
//!     → spawn the balancer server
//!     → wait for: shutdown signal | fatal event | task failure
//!     → trigger shutdown, join everything within the grace period
//! ```

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::validation::validate_config;
use crate::config::{BackendConfig, EdgeConfig};
use crate::health::{ChaosChecker, ChaosState, HealthChecker, HttpChecker, Monitor, MonitorPolicy};
use crate::http::app::backend_router;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::slot::{BackendSlot, FatalEvent, SlotTimings};
use crate::load_balancer::LoadBalancer;
use crate::net::listener::{self, ListenerError};

/// Builds the application served by one backend.
pub type AppFactory = Arc<dyn Fn(&BackendConfig) -> Router + Send + Sync>;

/// Errors that stop the edge tier.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to bind {name}: {source}")]
    Bind {
        name: String,
        #[source]
        source: ListenerError,
    },

    #[error("backend {name} requested termination")]
    ChaosTermination { name: String },

    #[error("backend {name} failed to restart: {reason}")]
    RestartFailed { name: String, reason: String },

    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimedOut(Duration),

    #[error("task failed: {0}")]
    Task(String),
}

impl From<FatalEvent> for OrchestratorError {
    fn from(event: FatalEvent) -> Self {
        match event {
            FatalEvent::ChaosTermination { backend } => OrchestratorError::ChaosTermination { name: backend },
            FatalEvent::RestartFailed { backend, reason } => OrchestratorError::RestartFailed { name: backend, reason },
        }
    }
}

/// Runs the backends, their monitors and the load balancer.
pub struct Orchestrator {
    config: EdgeConfig,
    shutdown: Shutdown,
    app_factory: AppFactory,
}

impl Orchestrator {
    pub fn new(config: EdgeConfig, shutdown: Shutdown) -> Self {
        let timeouts = config.timeouts.clone();
        Self {
            config,
            shutdown,
            app_factory: Arc::new(move |backend: &BackendConfig| backend_router(&backend.name, &timeouts)),
        }
    }

    /// Replace the default backend application.
    pub fn with_app_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&BackendConfig) -> Router + Send + Sync + 'static,
    {
        self.app_factory = Arc::new(factory);
        self
    }

    pub fn shutdown_handle(&self) -> &Shutdown {
        &self.shutdown
    }

    fn build_checker(&self, backend: &BackendConfig) -> Result<Arc<dyn HealthChecker>, OrchestratorError> {
        let addr = listener::parse_addr(&backend.address).map_err(|e| OrchestratorError::Config(e.to_string()))?;
        let check = self.config.health_check.check_config(addr);
        let http = HttpChecker::new(check).map_err(|e| OrchestratorError::Config(e.to_string()))?;

        if self.config.chaos.enabled {
            tracing::warn!(
                backend = %backend.name,
                failure_rate = self.config.chaos.failure_rate,
                shutdown_rate = self.config.chaos.shutdown_rate,
                "Chaos injection enabled"
            );
            let state = ChaosState::from_config(&self.config.chaos);
            Ok(Arc::new(ChaosChecker::new(Box::new(http), state)))
        } else {
            Ok(Arc::new(http))
        }
    }

    /// Run until the shared shutdown signal fires or a fatal event occurs.
    pub async fn run(self) -> Result<(), OrchestratorError> {
        validate_config(&self.config).map_err(|errors| {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            OrchestratorError::Config(joined.join("; "))
        })?;

        let balancer = Arc::new(
            LoadBalancer::from_config(&self.config.backends).map_err(|e| OrchestratorError::Config(e.to_string()))?,
        );
        let checkers = self
            .config
            .backends
            .iter()
            .map(|backend| self.build_checker(backend))
            .collect::<Result<Vec<_>, _>>()?;

        let lifecycle = &self.config.lifecycle;
        let timings = SlotTimings {
            settle_delay: Duration::from_millis(lifecycle.restart_settle_ms),
            drain_timeout: Duration::from_secs(lifecycle.drain_timeout_secs),
        };
        let grace = Duration::from_secs(lifecycle.shutdown_grace_secs);
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();

        let mut slots: Vec<Arc<BackendSlot>> = Vec::with_capacity(self.config.backends.len());
        for (backend, served) in self.config.backends.iter().zip(balancer.backends()) {
            let app = (self.app_factory)(backend);
            let slot = Arc::new(BackendSlot::new(&backend.name, served.addr, app, timings, fatal_tx.clone()));
            if let Err(source) = slot.start().await {
                stop_slots(&slots).await;
                return Err(OrchestratorError::Bind {
                    name: backend.name.clone(),
                    source,
                });
            }
            slots.push(slot);
        }

        let lb_listener = match self.bind_balancer().await {
            Ok(listener) => listener,
            Err(e) => {
                stop_slots(&slots).await;
                return Err(e);
            }
        };

        let mut tasks: JoinSet<Result<(), OrchestratorError>> = JoinSet::new();
        let policy = MonitorPolicy::from_config(
            &self.config.monitor,
            Duration::from_secs(self.config.health_check.interval_secs),
        );

        for (slot, checker) in slots.iter().zip(checkers) {
            let monitor = Monitor::new(slot.name(), policy.clone(), checker, slot.clone());
            let signal = self.shutdown.subscribe();
            tasks.spawn(async move {
                monitor.run(signal).await;
                Ok(())
            });

            let supervised = slot.clone();
            let signal = self.shutdown.subscribe();
            tasks.spawn(async move {
                signal.cancelled().await;
                supervised.shutdown().await;
                Ok(())
            });
        }

        let server = HttpServer::new(balancer, &self.config.timeouts);
        let signal = self.shutdown.subscribe();
        tasks.spawn(async move {
            server
                .run(lb_listener, signal)
                .await
                .map_err(|e| OrchestratorError::Task(format!("load balancer: {e}")))
        });

        tracing::info!(
            backends = slots.len(),
            chaos = self.config.chaos.enabled,
            "Edge tier running"
        );

        let signal = self.shutdown.subscribe();
        let mut outcome = Ok(());
        loop {
            tokio::select! {
                _ = signal.cancelled() => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                Some(event) = fatal_rx.recv() => {
                    tracing::error!(?event, "Fatal event, shutting down");
                    outcome = Err(event.into());
                    break;
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(Ok(()))) => continue,
                    Some(Ok(Err(e))) => {
                        tracing::error!(error = %e, "Task failed, shutting down");
                        outcome = Err(e);
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Task panicked, shutting down");
                        outcome = Err(OrchestratorError::Task(e.to_string()));
                        break;
                    }
                    None => break,
                },
            }
        }

        self.shutdown.trigger();

        let joined = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(Err(e)) => tracing::warn!(error = %e, "Task failed during shutdown"),
                    Err(e) if !e.is_cancelled() => tracing::warn!(error = %e, "Task panicked during shutdown"),
                    _ => {}
                }
            }
        })
        .await;

        if joined.is_err() {
            tracing::warn!(?grace, remaining = tasks.len(), "Grace period elapsed, aborting tasks");
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
            if outcome.is_ok() {
                outcome = Err(OrchestratorError::ShutdownTimedOut(grace));
            }
        }

        tracing::info!("Edge tier stopped");
        outcome
    }

    async fn bind_balancer(&self) -> Result<tokio::net::TcpListener, OrchestratorError> {
        let bind_err = |source| OrchestratorError::Bind {
            name: "load-balancer".to_string(),
            source,
        };
        let addr = listener::parse_addr(&self.config.load_balancer.bind_address).map_err(bind_err)?;
        listener::bind(addr).await.map_err(bind_err)
    }
}

async fn stop_slots(slots: &[Arc<BackendSlot>]) {
    for slot in slots {
        slot.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(lb: u16, ports: &[u16]) -> EdgeConfig {
        let mut config = EdgeConfig::default();
        config.load_balancer.bind_address = format!("127.0.0.1:{lb}");
        config.backends = ports
            .iter()
            .enumerate()
            .map(|(i, port)| BackendConfig {
                name: format!("b{i}"),
                address: format!("127.0.0.1:{port}"),
            })
            .collect();
        config.lifecycle.shutdown_grace_secs = 3;
        config.lifecycle.drain_timeout_secs = 1;
        config
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_binding() {
        let mut config = config(28620, &[28621]);
        config.backends.clear();

        let result = Orchestrator::new(config, Shutdown::new()).run().await;
        assert!(matches!(result, Err(OrchestratorError::Config(_))));
    }

    #[tokio::test]
    async fn bind_failure_unwinds_started_backends() {
        let _taken = tokio::net::TcpListener::bind("127.0.0.1:28624").await.unwrap();
        let config = config(28622, &[28623, 28624]);

        let result = Orchestrator::new(config, Shutdown::new()).run().await;
        match result {
            Err(OrchestratorError::Bind { name, .. }) => assert_eq!(name, "b1"),
            other => panic!("expected bind error, got {other:?}"),
        }
        // The first backend was released again.
        assert!(tokio::net::TcpListener::bind("127.0.0.1:28623").await.is_ok());
    }

    #[tokio::test]
    async fn cancellation_stops_cleanly() {
        let shutdown = Shutdown::new();
        let orchestrator = Orchestrator::new(config(28625, &[28626]), shutdown.clone());
        let handle = tokio::spawn(orchestrator.run());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(tokio::net::TcpStream::connect("127.0.0.1:28625").await.is_ok());

        shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn fatal_events_map_to_errors() {
        let err: OrchestratorError = FatalEvent::ChaosTermination { backend: "b0".into() }.into();
        assert!(matches!(err, OrchestratorError::ChaosTermination { ref name } if name == "b0"));
        assert_eq!(err.to_string(), "backend b0 requested termination");
    }
}

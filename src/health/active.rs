//! Active health checking over HTTP.
//!
//! # Responsibilities
//! - Probe one backend's health endpoint with a bounded number of attempts
//! - Honor cancellation during each probe and each inter-attempt wait
//! - Record the outcome for concurrent readers

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use tokio::time;

use crate::health::checker::HealthChecker;
use crate::health::types::{CheckConfig, CheckError, HealthStatus};
use crate::lifecycle::ShutdownSignal;

/// Probes a backend's health endpoint over HTTP/1.1.
pub struct HttpChecker {
    config: CheckConfig,
    uri: Uri,
    client: Client<HttpConnector, Body>,
    status: ArcSwap<HealthStatus>,
}

impl HttpChecker {
    /// Build a checker; fails if `target_url` is not a valid URI.
    pub fn new(config: CheckConfig) -> Result<Self, axum::http::uri::InvalidUri> {
        let uri: Uri = config.target_url.parse()?;
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        Ok(Self {
            config,
            uri,
            client,
            status: ArcSwap::from_pointee(HealthStatus::unknown()),
        })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// A single probe attempt.
    async fn probe(&self) -> Result<(), CheckError> {
        let request = Request::builder()
            .method("GET")
            .uri(self.uri.clone())
            .header("user-agent", "self-healing-edge-health-check")
            .body(Body::empty())
            .map_err(|e| CheckError::Transport(e.to_string()))?;

        match time::timeout(self.config.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => Ok(()),
            Ok(Ok(response)) => Err(CheckError::Status(response.status().as_u16())),
            Ok(Err(e)) => Err(CheckError::Transport(e.to_string())),
            Err(_) => Err(CheckError::Timeout(self.config.timeout)),
        }
    }

    fn record(&self, result: &Result<(), CheckError>) {
        self.status.store(Arc::new(HealthStatus::observed(result.clone())));
    }
}

#[async_trait]
impl HealthChecker for HttpChecker {
    async fn check(&self, cancel: &ShutdownSignal) -> Result<(), CheckError> {
        let attempts = self.config.retry_attempts.max(1);
        let mut last_error = CheckError::Unavailable("no probe attempted".to_string());

        for attempt in 1..=attempts {
            let outcome = tokio::select! {
                outcome = self.probe() => outcome,
                _ = cancel.cancelled() => return Err(CheckError::Cancelled),
            };

            match outcome {
                Ok(()) => {
                    let result = Ok(());
                    self.record(&result);
                    return result;
                }
                Err(e) => {
                    tracing::debug!(
                        target_url = %self.config.target_url,
                        attempt,
                        attempts,
                        error = %e,
                        "Health probe failed"
                    );
                    last_error = e;
                }
            }

            if attempt < attempts {
                tokio::select! {
                    _ = time::sleep(self.config.retry_delay) => {}
                    _ = cancel.cancelled() => return Err(CheckError::Cancelled),
                }
            }
        }

        let result = Err(last_error);
        self.record(&result);
        result
    }

    fn status(&self) -> HealthStatus {
        self.status.load_full().as_ref().clone()
    }
}

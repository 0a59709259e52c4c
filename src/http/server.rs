//! HTTP server setup for the load balancer.
//!
//! # Responsibilities
//! - Create the Axum Router that forwards every method and path
//! - Wire up middleware (tracing, request ID, timeout)
//! - Serve on a bound listener until the shutdown signal fires

use axum::{body::Body, routing::any, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TimeoutConfig;
use crate::http::proxy::{proxy_handler, ProxyState};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::LoadBalancer;

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    balancer: Arc<LoadBalancer>,
}

impl HttpServer {
    /// Create a new HTTP server over the given balancer.
    pub fn new(balancer: Arc<LoadBalancer>, timeouts: &TimeoutConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = ProxyState {
            balancer: balancer.clone(),
            client,
        };

        let router = Self::build_router(timeouts, state);
        Self { router, balancer }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: ProxyState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs))),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.balancer.len(),
            "Load balancer listening"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        // Serve with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!(address = %addr, "Load balancer stopped");
        Ok(())
    }

    pub fn balancer(&self) -> &Arc<LoadBalancer> {
        &self.balancer
    }
}

//! Default backend application.
//!
//! Stands in for the real application behind each backend; the edge tier
//! only relies on `GET /health_check`.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TimeoutConfig;

/// Path probed by the health checkers.
pub const HEALTH_PATH: &str = "/health_check";

/// Build the router served by one backend.
#[allow(deprecated)]
pub fn backend_router(name: &str, timeouts: &TimeoutConfig) -> Router {
    let greeting = format!("Hello from {name}");

    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route("/", get(move || std::future::ready(greeting.clone())))
        .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
        .layer(TraceLayer::new_for_http())
}

/// Liveness of the serving process itself.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

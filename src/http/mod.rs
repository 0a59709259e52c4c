//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Client connection (load balancer port)
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → proxy.rs (pick backend, rewrite, forward)
//!     → response.rs (strip hop-by-hop headers, stream body)
//!     → Send to client
//!
//! Backend port
//!     → app.rs (default application, GET /health_check)
//! ```

pub mod app;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;

//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (LoadBalancer: fixed backend set)
//!     → round_robin.rs (atomic rotation counter)
//!     → backend.rs (target address and base URL)
//!     → http::proxy rewrites and forwards the request
//! ```
//!
//! # Design Decisions
//! - Backend set is fixed at construction; no dynamic membership
//! - Selection ignores health; every backend stays in rotation
//! - The counter is owned per balancer, so independent instances coexist

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::{LoadBalancer, LoadBalancerError};
pub use round_robin::RoundRobin;

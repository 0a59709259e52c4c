//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Configured address
//!     → listener.rs (parse, bind)
//!     → handed to a ServerInstance or the balancer's HTTP server
//! ```

pub mod listener;

pub use listener::ListenerError;

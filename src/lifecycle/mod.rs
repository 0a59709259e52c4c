//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator (orchestrator.rs):
//!     Validate config → bind backend slots → bind balancer → spawn tasks
//!
//! Recovery (slot.rs, instance.rs):
//!     Restart   → hard close → settle → rebind → swap active instance
//!     Terminate → bounded drain → FatalEvent → coordinated shutdown
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or fatal event → trigger → every task unwinds
//! ```
//!
//! # Design Decisions
//! - One shared shutdown signal for every task
//! - Shutdown has a grace period: remaining tasks are aborted after it
//! - Fatal conditions surface as errors from `Orchestrator::run`

pub mod instance;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod slot;

pub use instance::{InstanceState, ServerInstance};
pub use orchestrator::{AppFactory, Orchestrator, OrchestratorError};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use slot::{BackendSlot, FatalEvent, SlotTimings};

//! Self-healing edge tier
//!
//! ```text
//!                        ┌───────────────────────────────────────────┐
//!   Client Request       │  load balancer (round robin, streaming)   │
//!   ─────────────────────┼─▶ http::server → http::proxy ─┬───────────┼──▶ server-01
//!                        │                               └───────────┼──▶ server-02
//!                        │                                           │
//!                        │  per backend:                             │
//!                        │    Monitor → HealthChecker (→ Chaos)      │
//!                        │       └─ on escalation: BackendSlot       │
//!                        │            restart | terminate            │
//!                        │                                           │
//!                        │  Orchestrator: one shutdown signal,       │
//!                        │  fatal events, bounded grace period       │
//!                        └───────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use self_healing_edge::config::loader::{load_config, load_default};
use self_healing_edge::lifecycle::signals::trigger_on_signal;
use self_healing_edge::lifecycle::{Orchestrator, Shutdown};
use self_healing_edge::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "self-healing-edge")]
#[command(about = "Round-robin edge tier with self-healing backends", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default()?,
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("self-healing-edge v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.load_balancer.bind_address,
        backends = config.backends.len(),
        chaos = config.chaos.enabled,
        interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(trigger_on_signal(shutdown.clone()));

    Orchestrator::new(config, shutdown).run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

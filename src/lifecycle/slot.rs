//! Restart and shutdown orchestration for one backend address.
//!
//! # Responsibilities
//! - Own the active [`ServerInstance`] for an address slot
//! - Restart: hard close, settle, rebind, swap in the new instance
//! - Terminate: bounded drain, then report a fatal event upward
//!
//! # Design Decisions
//! - At most one instance per slot; restarts on a slot serialize
//! - Slots share nothing, so one backend's restart never blocks another's
//! - Fatal conditions go to the orchestrator, never `process::exit`

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use crate::health::monitor::{Recovery, RecoveryError, RecoveryKind};
use crate::lifecycle::instance::{InstanceState, ServerInstance};
use crate::net::listener::ListenerError;

/// Conditions that stop the whole edge tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalEvent {
    /// A chaos-simulated shutdown reached the recovery path.
    ChaosTermination { backend: String },
    /// A restart could not bind its replacement listener.
    RestartFailed { backend: String, reason: String },
}

/// Timings applied by a [`BackendSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTimings {
    /// Pause between closing a listener and binding its replacement.
    pub settle_delay: Duration,
    /// Bound on draining before termination or shutdown.
    pub drain_timeout: Duration,
}

impl Default for SlotTimings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// One backend address and the instance currently serving it.
pub struct BackendSlot {
    name: String,
    addr: SocketAddr,
    app: Router,
    timings: SlotTimings,
    active: ArcSwapOption<ServerInstance>,
    transition: Mutex<()>,
    terminated: AtomicBool,
    restarts: AtomicU64,
    fatal_tx: mpsc::UnboundedSender<FatalEvent>,
}

impl BackendSlot {
    pub fn new(
        name: impl Into<String>,
        addr: SocketAddr,
        app: Router,
        timings: SlotTimings,
        fatal_tx: mpsc::UnboundedSender<FatalEvent>,
    ) -> Self {
        Self {
            name: name.into(),
            addr,
            app,
            timings,
            active: ArcSwapOption::empty(),
            transition: Mutex::new(()),
            terminated: AtomicBool::new(false),
            restarts: AtomicU64::new(0),
            fatal_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn restart_count(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// State of the active instance, `Stopped` if there is none.
    pub fn instance_state(&self) -> InstanceState {
        match &*self.active.load() {
            Some(instance) => instance.state(),
            None => InstanceState::Stopped,
        }
    }

    /// Bind and serve the first instance.
    pub async fn start(&self) -> Result<(), ListenerError> {
        let _guard = self.transition.lock().await;
        self.spawn_instance().await
    }

    async fn spawn_instance(&self) -> Result<(), ListenerError> {
        let instance = ServerInstance::start(&self.name, self.addr, self.app.clone()).await?;
        self.active.store(Some(Arc::new(instance)));
        Ok(())
    }

    /// Hard-close the active instance and bind a replacement.
    pub async fn restart(&self) -> Result<(), RecoveryError> {
        let _guard = self.transition.lock().await;
        if self.terminated.load(Ordering::SeqCst) {
            return Err(RecoveryError::Terminated);
        }

        tracing::warn!(backend = %self.name, address = %self.addr, "Restarting backend");
        if let Some(old) = self.active.swap(None) {
            old.close().await;
        }

        tokio::time::sleep(self.timings.settle_delay).await;

        if let Err(e) = self.spawn_instance().await {
            tracing::error!(backend = %self.name, error = %e, "Restart failed to bind");
            let _ = self.fatal_tx.send(FatalEvent::RestartFailed {
                backend: self.name.clone(),
                reason: e.to_string(),
            });
            return Err(e.into());
        }

        self.restarts.fetch_add(1, Ordering::Relaxed);
        tracing::info!(backend = %self.name, restarts = self.restart_count(), "Backend restarted");
        Ok(())
    }

    /// Drain the slot and ask the orchestrator to stop everything.
    pub async fn terminate(&self) -> Result<(), RecoveryError> {
        if !self.stop(true).await {
            return Err(RecoveryError::Terminated);
        }
        tracing::warn!(backend = %self.name, "Backend terminated by simulated shutdown");
        let _ = self.fatal_tx.send(FatalEvent::ChaosTermination {
            backend: self.name.clone(),
        });
        Ok(())
    }

    /// Orchestrated stop: bounded drain, no fatal event.
    pub async fn shutdown(&self) {
        self.stop(false).await;
    }

    /// Returns `false` if the slot was already terminated.
    async fn stop(&self, chaos: bool) -> bool {
        let _guard = self.transition.lock().await;
        if self.terminated.swap(true, Ordering::SeqCst) {
            return false;
        }

        if let Some(instance) = self.active.swap(None) {
            tracing::info!(backend = %self.name, chaos, "Draining backend");
            if !instance.shutdown(self.timings.drain_timeout).await {
                tracing::warn!(backend = %self.name, "Backend drain exceeded timeout");
            }
        }
        true
    }
}

#[async_trait]
impl Recovery for BackendSlot {
    async fn recover(&self, kind: RecoveryKind) -> Result<(), RecoveryError> {
        match kind {
            RecoveryKind::Restart => self.restart().await,
            RecoveryKind::Terminate => self.terminate().await,
        }
    }
}

//! A single serving instance bound to one backend address.
//!
//! # States
//! ```text
//! Starting → Running → ShuttingDown → Stopped   (graceful drain)
//! Starting → Running → Stopped                  (hard close)
//! ```

use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::net::listener::{self, ListenerError};

/// Lifecycle state of a [`ServerInstance`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Starting = 0,
    Running = 1,
    ShuttingDown = 2,
    Stopped = 3,
}

impl From<u8> for InstanceState {
    fn from(val: u8) -> Self {
        match val {
            0 => InstanceState::Starting,
            1 => InstanceState::Running,
            2 => InstanceState::ShuttingDown,
            _ => InstanceState::Stopped,
        }
    }
}

/// A bound listener serving one application.
pub struct ServerInstance {
    addr: SocketAddr,
    state: AtomicU8,
    drain_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ServerInstance {
    /// Bind `addr` and start serving `app` on it.
    pub async fn start(name: &str, addr: SocketAddr, app: Router) -> Result<Self, ListenerError> {
        let instance_state = AtomicU8::new(InstanceState::Starting as u8);
        let tcp = listener::bind(addr).await?;
        let (drain_tx, mut drain_rx) = watch::channel(false);

        let backend = name.to_string();
        let task = tokio::spawn(async move {
            let result = axum::serve(tcp, app)
                .with_graceful_shutdown(async move {
                    let _ = drain_rx.wait_for(|draining| *draining).await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(backend = %backend, address = %addr, error = %e, "Backend server error");
            }
        });

        instance_state.store(InstanceState::Running as u8, Ordering::SeqCst);
        tracing::info!(backend = %name, address = %addr, "Backend instance running");

        Ok(Self {
            addr,
            state: instance_state,
            drain_tx,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> InstanceState {
        InstanceState::from(self.state.load(Ordering::SeqCst))
    }

    fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take()
    }

    /// Drop the listener immediately without draining connections.
    pub async fn close(&self) {
        if let Some(task) = self.take_task() {
            task.abort();
            let _ = task.await;
        }
        self.state.store(InstanceState::Stopped as u8, Ordering::SeqCst);
    }

    /// Stop accepting, drain in-flight requests for at most `timeout`, then
    /// force the remainder closed. Returns `false` if the drain timed out.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let Some(mut task) = self.take_task() else {
            return true;
        };

        self.state.store(InstanceState::ShuttingDown as u8, Ordering::SeqCst);
        self.drain_tx.send_replace(true);

        let drained = match tokio::time::timeout(timeout, &mut task).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(address = %self.addr, ?timeout, "Drain timed out, forcing close");
                task.abort();
                let _ = task.await;
                false
            }
        };

        self.state.store(InstanceState::Stopped as u8, Ordering::SeqCst);
        drained
    }
}

impl Drop for ServerInstance {
    fn drop(&mut self) {
        if let Some(task) = self.take_task() {
            task.abort();
        }
    }
}

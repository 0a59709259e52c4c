//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse configured addresses
//! - Bind listeners with a typed error for the orchestrator

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a configured address.
pub fn parse_addr(address: &str) -> Result<SocketAddr, ListenerError> {
    address
        .parse()
        .map_err(|_| ListenerError::InvalidAddress(address.to_string()))
}

/// Bind a listener on `addr`.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { addr, source })?;

    tracing::debug!(address = %addr, "Listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_address_rejected() {
        assert!(matches!(parse_addr("localhost"), Err(ListenerError::InvalidAddress(_))));
        assert_eq!(parse_addr("127.0.0.1:80").unwrap().port(), 80);
    }

    #[tokio::test]
    async fn double_bind_is_bind_error() {
        let first = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let taken = first.local_addr().unwrap();

        let err = bind(taken).await.unwrap_err();
        assert!(matches!(err, ListenerError::Bind { addr, .. } if addr == taken));
    }
}

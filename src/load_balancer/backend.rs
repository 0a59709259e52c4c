//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend target of the balancer
//! - Carry the base URL used for request rewriting

use std::net::SocketAddr;
use url::Url;

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Backend identifier.
    pub name: String,
    /// The address of the backend.
    pub addr: SocketAddr,
    /// Pre-calculated base URL for performance.
    pub base_url: Url,
}

impl Backend {
    /// Create a new backend served over plain HTTP.
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&format!("http://{}", addr))?;
        Ok(Self {
            name: name.into(),
            addr,
            base_url,
        })
    }

    /// Authority (`host:port`) to place in rewritten requests.
    pub fn authority(&self) -> String {
        self.addr.to_string()
    }

    pub fn scheme(&self) -> &str {
        self.base_url.scheme()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_from_addr() {
        let backend = Backend::new("b1", "127.0.0.1:8001".parse().unwrap()).unwrap();
        assert_eq!(backend.base_url.as_str(), "http://127.0.0.1:8001/");
        assert_eq!(backend.authority(), "127.0.0.1:8001");
        assert_eq!(backend.scheme(), "http");
    }

    #[test]
    fn ipv6_authority_is_bracketed() {
        let backend = Backend::new("b6", "[::1]:8001".parse().unwrap()).unwrap();
        assert_eq!(backend.authority(), "[::1]:8001");
        assert_eq!(backend.base_url.host_str(), Some("[::1]"));
    }
}

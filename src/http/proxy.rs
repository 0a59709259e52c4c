//! Request forwarding to the rotated backend.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        header::{self, HeaderValue},
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri, Version,
    },
    response::{IntoResponse, Response},
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::http::request::request_id;
use crate::http::response::{into_streaming, strip_hop_by_hop};
use crate::load_balancer::{Backend, LoadBalancer};
use crate::observability::metrics;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct ProxyState {
    pub balancer: Arc<LoadBalancer>,
    pub client: Client<HttpConnector, Body>,
}

/// Forward any request to the next backend in rotation and stream the
/// response back.
pub async fn proxy_handler(State(state): State<ProxyState>, mut request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let backend = state.balancer.get_next();
    let method = request.method().to_string();
    let request_id = request_id(&request).to_string();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.uri().path(),
        backend = %backend.name,
        "Proxying request"
    );

    if let Err(e) = rewrite_request(&mut request, backend, client_addr) {
        tracing::error!(request_id = %request_id, backend = %backend.name, error = %e, "Failed to rewrite request");
        metrics::record_proxy_request(&method, 502, &backend.name, start_time);
        return (StatusCode::BAD_GATEWAY, "Invalid upstream request").into_response();
    }

    match state.client.request(request).await {
        Ok(response) => {
            metrics::record_proxy_request(&method, response.status().as_u16(), &backend.name, start_time);
            into_streaming(response)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %backend.name, error = %e, "Upstream error");
            metrics::record_proxy_request(&method, 502, &backend.name, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Point `request` at `backend`: scheme, authority and `Host` are replaced,
/// hop-by-hop headers dropped and the client appended to `X-Forwarded-For`.
pub fn rewrite_request<B>(
    request: &mut Request<B>,
    backend: &Backend,
    client: Option<SocketAddr>,
) -> Result<(), axum::http::Error> {
    let authority = backend.authority();

    let mut uri_parts = request.uri().clone().into_parts();
    uri_parts.scheme = Some(Scheme::from_str(backend.scheme())?);
    uri_parts.authority = Some(Authority::from_str(&authority)?);
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    *request.uri_mut() = Uri::from_parts(uri_parts)?;
    *request.version_mut() = Version::HTTP_11;

    let headers = request.headers_mut();
    strip_hop_by_hop(headers);
    headers.insert(header::HOST, HeaderValue::from_str(&authority)?);

    if let Some(addr) = client {
        let forwarded = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{}, {}", prior, addr.ip()),
            None => addr.ip().to_string(),
        };
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(&forwarded)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> Backend {
        Backend::new("b1", "127.0.0.1:8001".parse().unwrap()).unwrap()
    }

    #[test]
    fn rewrites_target_and_host() {
        let mut request = Request::builder()
            .uri("/items?page=2")
            .header(header::HOST, "edge.example")
            .header(header::CONNECTION, "keep-alive")
            .body(())
            .unwrap();

        rewrite_request(&mut request, &backend(), None).unwrap();

        assert_eq!(request.uri().to_string(), "http://127.0.0.1:8001/items?page=2");
        assert_eq!(request.headers()[header::HOST], "127.0.0.1:8001");
        assert!(request.headers().get(header::CONNECTION).is_none());
        assert!(request.headers().get(X_FORWARDED_FOR).is_none());
    }

    #[test]
    fn appends_forwarded_for() {
        let mut request = Request::builder()
            .uri("http://edge.example/")
            .header(X_FORWARDED_FOR, "10.0.0.1")
            .body(())
            .unwrap();

        rewrite_request(&mut request, &backend(), Some("192.168.1.7:5555".parse().unwrap())).unwrap();

        assert_eq!(request.uri().to_string(), "http://127.0.0.1:8001/");
        assert_eq!(request.headers()[X_FORWARDED_FOR], "10.0.0.1, 192.168.1.7");
    }
}

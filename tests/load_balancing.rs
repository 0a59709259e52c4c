//! Balancer forwarding against live mock backends.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use self_healing_edge::config::TimeoutConfig;
use self_healing_edge::http::{HttpServer, X_REQUEST_ID};
use self_healing_edge::lifecycle::Shutdown;
use self_healing_edge::load_balancer::{Backend, LoadBalancer};

mod common;

async fn start_balancer(addr: SocketAddr, backends: Vec<Backend>, shutdown: &Shutdown) {
    let balancer = Arc::new(LoadBalancer::new(backends).unwrap());
    let server = HttpServer::new(balancer, &TimeoutConfig::default());
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_round_robin_across_backends() {
    let b1: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let b2: SocketAddr = "127.0.0.1:28412".parse().unwrap();
    let lb: SocketAddr = "127.0.0.1:28413".parse().unwrap();
    common::start_mock_backend(b1, "one").await;
    common::start_mock_backend(b2, "two").await;

    let shutdown = Shutdown::new();
    start_balancer(lb, vec![Backend::new("b1", b1).unwrap(), Backend::new("b2", b2).unwrap()], &shutdown).await;

    let client = reqwest::Client::new();
    let mut bodies = Vec::new();
    for _ in 0..4 {
        let res = client.get(format!("http://{lb}/any/path?x=1")).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert!(res.headers().contains_key(X_REQUEST_ID));
        bodies.push(res.text().await.unwrap());
    }
    assert_eq!(bodies, ["one", "two", "one", "two"]);

    shutdown.trigger();
    assert!(common::wait_closed(lb, Duration::from_secs(2)).await);
}

#[tokio::test]
async fn test_upstream_status_passes_through() {
    let b1: SocketAddr = "127.0.0.1:28414".parse().unwrap();
    let lb: SocketAddr = "127.0.0.1:28415".parse().unwrap();
    common::start_programmable_backend(b1, |_| async { (503, "busy".to_string()) }).await;

    let shutdown = Shutdown::new();
    start_balancer(lb, vec![Backend::new("b1", b1).unwrap()], &shutdown).await;

    let res = reqwest::get(format!("http://{lb}/")).await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "busy");

    shutdown.trigger();
}

#[tokio::test]
async fn test_dead_backend_yields_bad_gateway() {
    // Nothing listens on the backend port.
    let dead: SocketAddr = "127.0.0.1:28416".parse().unwrap();
    let lb: SocketAddr = "127.0.0.1:28417".parse().unwrap();

    let shutdown = Shutdown::new();
    start_balancer(lb, vec![Backend::new("dead", dead).unwrap()], &shutdown).await;

    let res = reqwest::get(format!("http://{lb}/")).await.unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}

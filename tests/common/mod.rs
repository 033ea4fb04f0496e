//! Shared utilities for integration and load testing.

use std::net::SocketAddr;

use guestbook_api::config::ServiceConfig;
use guestbook_api::{HttpServer, Shutdown};
use tokio::net::TcpListener;

/// Config suitable for tests: loopback bind, no background sweeper.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rate_limit.sweep_interval_secs = 0;
    config
}

/// Start the service on an ephemeral loopback port.
///
/// Returns the bound address and the shutdown handle; dropping the handle
/// also stops the server.
pub async fn spawn_server(config: ServiceConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// HTTP client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

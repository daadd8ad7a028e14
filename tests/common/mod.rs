//! Shared utilities for integration tests.

use std::net::SocketAddr;

use flaky_server::config::ServerConfig;
use flaky_server::http::HttpServer;
use flaky_server::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Bind 127.0.0.1:0 and serve `config` in the background.
pub async fn start_server(mut config: ServerConfig) -> TestServer {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// A client that opens a fresh connection per request.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Config with the failure cycle enabled.
pub fn cycle_config(failure_count: i64, failure_code: u16, success_count: i64, success_code: u16) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.failure.enabled = true;
    config.failure.failure_count = failure_count;
    config.failure.failure_code = failure_code;
    config.failure.success_count = success_count;
    config.failure.success_code = success_code;
    config
}

//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use exporter_test::config::ServiceConfig;
use exporter_test::lifecycle::{self, Shutdown};
use exporter_test::Telemetry;

/// A service running on an ephemeral port.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub telemetry: Arc<Telemetry>,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<Result<(), exporter_test::StartupError>>,
}

#[allow(dead_code)]
impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the service on `127.0.0.1:0` with the given app name.
#[allow(dead_code)]
pub async fn start_service(app_name: &str) -> TestService {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.observability.app_name = app_name.to_string();

    let shutdown = Shutdown::new();
    let service = lifecycle::start(&config, &shutdown).await.unwrap();
    let addr = service.local_addr();
    let telemetry = service.telemetry();

    let task = tokio::spawn(service.run(shutdown.subscribe()));

    TestService {
        addr,
        telemetry,
        shutdown,
        task,
    }
}

/// Client without pooling or system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Find a sample value in Prometheus text output.
#[allow(dead_code)]
pub fn sample(rendered: &str, series: &str) -> Option<f64> {
    exporter_test::observability::metrics::sample_value(rendered, series)
}

/// Reserve a free local port. The port is released before returning.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

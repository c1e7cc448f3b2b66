//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up the tracing middleware carrying the static log fields
//! - Serve on a bound listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Request,
    handler::Handler,
    middleware::from_fn_with_state,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::middleware::{record_request, RequestMetrics};
use crate::observability::{LogContext, Telemetry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub telemetry: Arc<Telemetry>,
    pub log_context: LogContext,
}

impl AppState {
    pub fn new(telemetry: Arc<Telemetry>, log_context: LogContext) -> Self {
        Self {
            telemetry,
            log_context,
        }
    }
}

/// Build the router: `/`, `/metrics`, `/healthcheck`, with `/` also catching unmatched paths.
///
/// `/` and `/metrics` record per-request server metrics; `/healthcheck` stays bare.
pub fn build_router(state: AppState) -> Router {
    let log_context = state.log_context.clone();
    let telemetry = state.telemetry.clone();
    let instrumented = |operation: &'static str| {
        from_fn_with_state(
            RequestMetrics::new(telemetry.clone(), operation),
            record_request,
        )
    };

    Router::new()
        .route("/", any(handlers::root).layer(instrumented("root")))
        .route("/metrics", any(handlers::metrics).layer(instrumented("metrics")))
        .route("/healthcheck", any(handlers::healthcheck))
        .fallback(handlers::root.layer(instrumented("root")))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request| log_context.request_span(request)),
        )
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around the given state.
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Run the server on the given listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObservabilityConfig;
    use crate::observability::logging::text_layer;
    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Method, StatusCode};
    use std::io::Write;
    use std::sync::Mutex;
    use tower::ServiceExt;
    use tracing_subscriber::layer::SubscriberExt;

    const PEER: ([u8; 4], u16) = ([10, 0, 0, 1], 4242);

    fn test_state() -> AppState {
        let config = ObservabilityConfig::default();
        AppState::new(
            Arc::new(Telemetry::new(&config.app_name).unwrap()),
            LogContext::new(&config),
        )
    }

    /// Router as the server sees it, with a fixed peer address.
    fn test_router(state: &AppState) -> Router {
        build_router(state.clone()).layer(MockConnectInfo(SocketAddr::from(PEER)))
    }

    async fn call(router: &Router, method: Method, uri: &str) -> (StatusCode, String) {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_root_greets_and_counts() {
        let state = test_state();
        let router = test_router(&state);

        for method in [Method::GET, Method::POST, Method::DELETE] {
            let (status, body) = call(&router, method, "/").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "Hello world\n");
        }
        assert_eq!(state.telemetry.requests_total(), Some(3));
    }

    #[tokio::test]
    async fn test_unmatched_paths_fall_through_to_root() {
        let state = test_state();
        let router = test_router(&state);

        let (status, body) = call(&router, Method::GET, "/some/other/path").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello world\n");
        assert_eq!(state.telemetry.requests_total(), Some(1));
    }

    #[tokio::test]
    async fn test_healthcheck_does_not_count() {
        let state = test_state();
        let router = test_router(&state);

        for _ in 0..5 {
            let (status, body) = call(&router, Method::GET, "/healthcheck").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "ok\n");
        }
        assert_eq!(state.telemetry.requests_total(), Some(0));
        assert!(!state.telemetry.render().contains("http_server_duration_seconds_count"));
    }

    #[tokio::test]
    async fn test_metrics_passes_through_exporter_output() {
        let state = test_state();
        let router = test_router(&state);

        let request = axum::http::Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains(r#"http_requests_total{app="exporter-test"} 1"#));
        assert!(body.contains("# TYPE http_server_duration_seconds histogram"));
    }

    #[tokio::test]
    async fn test_metrics_logs_remote_addr() {
        let state = test_state();
        let router = test_router(&state);

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry()
            .with(text_layer(move || writer.clone()).with_ansi(false));
        let _guard = tracing::subscriber::set_default(subscriber);

        call(&router, Method::GET, "/metrics").await;
        call(&router, Method::GET, "/").await;

        let logs = captured.text();
        let scrape = logs
            .lines()
            .find(|l| l.contains("Serving metrics scrape"))
            .expect("metrics handler logged nothing");
        assert!(scrape.contains("remoteAddr=10.0.0.1:4242"));
        assert!(scrape.contains("app=exporter-test"));
        assert!(!scrape.contains("exporter_test::"));
        assert!(logs.contains("Hello from the root endpoint"));
    }

    #[tokio::test]
    async fn test_request_metrics_recorded_per_operation() {
        let state = test_state();
        let router = test_router(&state);

        call(&router, Method::GET, "/").await;
        call(&router, Method::POST, "/elsewhere").await;
        call(&router, Method::GET, "/metrics").await;
        call(&router, Method::GET, "/healthcheck").await;

        let (_, body) = call(&router, Method::GET, "/metrics").await;
        let series = |name: &str, operation: &str, method: &str| {
            body.lines()
                .filter(|l| l.starts_with(&format!("{}{{", name)))
                .find(|l| {
                    l.contains(&format!(r#"operation="{}""#, operation))
                        && l.contains(&format!(r#"method="{}""#, method))
                })
                .and_then(|l| l.rsplit(' ').next())
                .and_then(|v| v.parse::<f64>().ok())
        };

        assert_eq!(series("http_server_duration_seconds_count", "root", "GET"), Some(1.0));
        assert_eq!(series("http_server_duration_seconds_count", "root", "POST"), Some(1.0));
        // the scrape being rendered is recorded after it completes
        assert_eq!(series("http_server_duration_seconds_count", "metrics", "GET"), Some(1.0));
        // "Hello world\n" is 12 bytes
        assert_eq!(series("http_server_response_size_bytes_sum", "root", "GET"), Some(12.0));
        assert_eq!(series("http_server_request_size_bytes_sum", "root", "GET"), Some(0.0));
    }

    #[tokio::test]
    async fn test_mixed_traffic_counts_root_and_metrics_only() {
        let state = test_state();
        let router = test_router(&state);

        call(&router, Method::GET, "/").await;
        call(&router, Method::GET, "/metrics").await;
        call(&router, Method::GET, "/healthcheck").await;
        call(&router, Method::PUT, "/").await;
        call(&router, Method::GET, "/metrics").await;

        assert_eq!(state.telemetry.requests_total(), Some(4));
    }
}

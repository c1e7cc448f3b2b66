//! Per-request server metrics.
//!
//! Wraps the instrumented routes and records duration, request size and
//! response size on the shared `Telemetry`, labelled by operation name,
//! method and status.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::observability::Telemetry;

/// Middleware state: where to record and under which operation name.
#[derive(Clone)]
pub struct RequestMetrics {
    telemetry: Arc<Telemetry>,
    operation: &'static str,
}

impl RequestMetrics {
    pub fn new(telemetry: Arc<Telemetry>, operation: &'static str) -> Self {
        Self {
            telemetry,
            operation,
        }
    }
}

pub async fn record_request(
    State(scope): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let request_size = request.body().size_hint().exact();

    let response = next.run(request).await;

    scope.telemetry.record_request(
        scope.operation,
        &method,
        response.status().as_u16(),
        request_size,
        response.body().size_hint().exact(),
        start_time,
    );

    response
}

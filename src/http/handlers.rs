//! Request handlers for the three routes.
//!
//! None of them can fail: telemetry side effects are best-effort and
//! never change the response.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics::CONTENT_TYPE;

/// `/` and every unmatched path.
pub async fn root(State(state): State<AppState>) -> &'static str {
    tracing::info!("Hello from the root endpoint");
    state.telemetry.add(1);
    "Hello world\n"
}

/// `/metrics`: count the scrape, then hand back the exporter's output untouched.
pub async fn metrics(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    tracing::info!(remoteAddr = %remote_addr, "Serving metrics scrape");
    state.telemetry.add(1);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        state.telemetry.render(),
    )
        .into_response()
}

/// `/healthcheck`: no logging, no counting.
pub async fn healthcheck() -> &'static str {
    "ok\n"
}

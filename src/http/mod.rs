//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, TraceLayer with app/build span)
//!     → middleware/request_metrics.rs (duration and sizes, / and /metrics only)
//!     → path dispatch
//!         /            → handlers::root        (log + count)
//!         /metrics     → handlers::metrics     (log + count + render)
//!         /healthcheck → handlers::healthcheck (nothing else)
//!         anything else → handlers::root
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{build_router, AppState, HttpServer};

//! Route-level middleware.

pub mod request_metrics;

pub use request_metrics::{record_request, RequestMetrics};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and bootstrap produce:
//!     → logging.rs (structured log events with app/build context)
//!     → metrics.rs (request counter, runtime gauges)
//!
//! Consumers:
//!     → stderr (log lines)
//!     → GET /metrics (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Both are built once at startup and handed to handlers explicitly
//! - Telemetry is best-effort: nothing here can fail a request

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogContext, LoggingError};
pub use metrics::{MetricsError, Telemetry};

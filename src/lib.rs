//! Minimal HTTP service exporting a request counter and runtime telemetry.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use error::StartupError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::Telemetry;

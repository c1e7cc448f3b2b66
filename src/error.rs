//! Startup error type.
//!
//! Every variant is fatal: the process logs it once and exits non-zero.
//! Request handling has no error path of its own.

use thiserror::Error;

use crate::config::ConfigError;
use crate::observability::MetricsError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize metrics pipeline: {0}")]
    Metrics(#[from] MetricsError),

    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create HTTP server: {0}")]
    Serve(#[source] std::io::Error),
}

//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide tracing subscriber once at startup
//! - Carry the static `app` and `build` fields on every line
//!
//! # Design Decisions
//! - Lines go to stderr
//! - `RUST_LOG` takes precedence over the configured filter
//! - Timestamps are UTC RFC 3339 (the fmt layer's default timer)

use std::sync::Arc;

use axum::http::Request;
use thiserror::Error;
use tracing::Span;
use tracing_subscriber::fmt::{
    self,
    format::{DefaultFields, Format},
    MakeWriter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

#[derive(Debug, Error)]
#[error("failed to install log subscriber: {0}")]
pub struct LoggingError(#[from] tracing_subscriber::util::TryInitError);

/// Install the global subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let (text, json) = match config.log_format {
        LogFormat::Text => (Some(text_layer(std::io::stderr)), None),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()?;

    Ok(())
}

/// `key=value` layer without the module target, writing to `writer`.
pub fn text_layer<S, W>(writer: W) -> fmt::Layer<S, DefaultFields, Format, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer().with_target(false).with_writer(writer)
}

/// Static fields merged into every log line.
#[derive(Debug, Clone)]
pub struct LogContext {
    app: Arc<str>,
    build: Arc<str>,
}

impl LogContext {
    pub fn new(config: &ObservabilityConfig) -> Self {
        Self {
            app: Arc::from(config.app_name.as_str()),
            build: Arc::from(config.build.as_str()),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn build(&self) -> &str {
        &self.build
    }

    /// Root span for bootstrap and shutdown events.
    pub fn service_span(&self) -> Span {
        tracing::info_span!("service", app = %self.app, build = %self.build)
    }

    /// Per-request span; handler events inherit `app` and `build` from it.
    pub fn request_span<B>(&self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            app = %self.app,
            build = %self.build,
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};

/// Listen address used when neither the config file nor `SERVER_LISTEN` set one.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Application name attached to log lines and the request counter label.
pub const DEFAULT_APP_NAME: &str = "exporter-test";

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address in `host:port` form.
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `key=value` lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Application name, used as the `app` log field and metric label.
    pub app_name: String,

    /// Build identifier, used as the `build` log field.
    pub build: String,

    /// Filter directive used when `RUST_LOG` is not set.
    pub log_filter: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Sampling period of the runtime and host gauges.
    pub runtime_metrics_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            build: option_env!("BUILD_ID").unwrap_or("unknown").to_string(),
            log_filter: "info".to_string(),
            log_format: LogFormat::Text,
            runtime_metrics_interval_secs: 10,
        }
    }
}

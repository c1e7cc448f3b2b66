//! Semantic checks on a deserialized configuration.

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bind address {0:?} is not of the form host:port")]
    BindAddress(String),
    #[error("app_name must not be empty")]
    EmptyAppName,
    #[error("runtime_metrics_interval_secs must be greater than zero")]
    ZeroInterval,
}

/// Validate the configuration, collecting every problem rather than stopping at the first.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&config.listener.bind_address) {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.app_name.trim().is_empty() {
        errors.push(ValidationError::EmptyAppName);
    }
    if config.observability.runtime_metrics_interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `host:port`, `[v6]:port` and `:port` (all interfaces). The host is not resolved here.
fn is_host_port(address: &str) -> bool {
    let Some((host, port)) = address.rsplit_once(':') else {
        return false;
    };
    let host_ok = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(v6) => !v6.is_empty(),
        None => !host.contains(['[', ']']),
    };

    host_ok && !host.contains(char::is_whitespace) && port.parse::<u16>().is_ok()
}

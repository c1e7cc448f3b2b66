//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → loader.rs (optional TOML file from --config)
//!     → loader.rs (SERVER_LISTEN override, ignored when empty)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults so the service runs with no file at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError, SERVER_LISTEN_ENV};
pub use schema::{ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig};

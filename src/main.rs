//! exporter-test
//!
//! Serves a greeting on `/`, Prometheus metrics on `/metrics` and a
//! liveness probe on `/healthcheck`.
//!
//! # Startup
//!
//! ```text
//! logger → metrics pipeline → listen address → router → serve
//! ```
//!
//! Any startup failure is logged once and exits with status 1. Restarting
//! is left to the supervisor.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Instrument;

use exporter_test::config;
use exporter_test::lifecycle::{signals, startup, Shutdown};
use exporter_test::observability::{init_logging, LogContext};
use exporter_test::StartupError;

#[derive(Parser, Debug)]
#[command(name = "exporter-test", version, about)]
struct Cli {
    /// Optional TOML config file. `SERVER_LISTEN` still overrides the listen address.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = config::load(cli.config.as_deref());
    let observability = loaded
        .as_ref()
        .map(|c| c.observability.clone())
        .unwrap_or_default();

    if let Err(err) = init_logging(&observability) {
        eprintln!("{}", err);
        return ExitCode::FAILURE;
    }

    let span = LogContext::new(&observability).service_span();

    let result = async {
        let config = loaded.map_err(StartupError::from)?;

        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        tokio::spawn(
            async move {
                signals::shutdown_signal().await;
                trigger.trigger();
            }
            .in_current_span(),
        );

        startup::run(config, shutdown).await
    }
    .instrument(span.clone())
    .await;

    match result {
        Ok(()) => {
            span.in_scope(|| tracing::info!("Shutdown complete"));
            ExitCode::SUCCESS
        }
        Err(err) => {
            span.in_scope(|| tracing::error!(err = %err, "Service terminated"));
            ExitCode::FAILURE
        }
    }
}

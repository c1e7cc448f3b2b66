//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the metrics pipeline and start runtime collection
//! - Bind the listener and build the router
//! - Serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, no retries
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last

use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ServiceConfig;
use crate::error::StartupError;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::observability::{LogContext, Telemetry};

/// A fully initialized service that has not started serving yet.
pub struct Service {
    server: HttpServer,
    listener: TcpListener,
    local_addr: SocketAddr,
    telemetry: Arc<Telemetry>,
}

impl Service {
    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Serve until `shutdown` fires. A listener error is fatal.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
        self.server
            .run(self.listener, shutdown)
            .await
            .map_err(StartupError::Serve)
    }
}

/// Initialize metrics, bind the listener and build the router.
pub async fn start(config: &ServiceConfig, shutdown: &Shutdown) -> Result<Service, StartupError> {
    let observability = &config.observability;

    let telemetry = Arc::new(Telemetry::new(&observability.app_name)?);
    telemetry.start_runtime_collection(
        Duration::from_secs(observability.runtime_metrics_interval_secs),
        shutdown.subscribe(),
    )?;

    let address = &config.listener.bind_address;
    tracing::info!("Listening on {}", address);

    let listener = TcpListener::bind(bind_target(address).as_ref())
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(StartupError::Serve)?;

    let state = AppState::new(telemetry.clone(), LogContext::new(observability));

    Ok(Service {
        server: HttpServer::new(state),
        listener,
        local_addr,
        telemetry,
    })
}

/// `:port` means every interface; tokio needs an explicit host for that.
fn bind_target(address: &str) -> Cow<'_, str> {
    if address.starts_with(':') {
        Cow::Owned(format!("0.0.0.0{}", address))
    } else {
        Cow::Borrowed(address)
    }
}

/// Start the service and serve until `shutdown` is triggered.
pub async fn run(config: ServiceConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let service = start(&config, &shutdown).await?;
    service.run(shutdown.subscribe()).await
}

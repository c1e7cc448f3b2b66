//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Register the request counter with its fixed label set
//! - Record per-request server metrics for the instrumented routes
//! - Sample process, host and tokio runtime metrics in the background
//! - Render everything in the Prometheus text exposition format
//!
//! # Metrics
//! - `http_requests_total` (counter): requests served by `/` and `/metrics`, labelled `app`
//! - `http_server_duration_seconds` (histogram): handler latency by operation, method, status
//! - `http_server_request_size_bytes` (histogram): request body size, when known
//! - `http_server_response_size_bytes` (histogram): response body size, when known
//! - `process_*` (gauges/counter): CPU seconds, resident and virtual memory, threads,
//!   open fds, start time (via `metrics-process`)
//! - `process_uptime_seconds` (gauge): seconds since the pipeline was built
//! - `host_available_parallelism` (gauge): CPUs usable by this process
//! - `tokio_runtime_workers` (gauge): worker threads of the runtime
//! - `tokio_runtime_alive_tasks` (gauge): tasks currently alive
//! - `tokio_runtime_global_queue_depth` (gauge): tasks waiting in the injection queue
//!
//! # Design Decisions
//! - The recorder is built, not installed globally; handles are passed explicitly
//! - Counter and gauge updates are atomic inside the recorder, no locks here
//! - Histogram buckets tuned for typical web latencies and small bodies

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{Counter, Gauge, Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusRecorder};
use metrics_process::Collector;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Name of the request counter.
pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_server_duration_seconds";
pub const REQUEST_SIZE: &str = "http_server_request_size_bytes";
pub const RESPONSE_SIZE: &str = "http_server_response_size_bytes";

/// Content type of [`Telemetry::render`] output.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const DURATION_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];
const SIZE_BUCKETS: &[f64] = &[
    0.0, 16.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0,
];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("application name used as metric label must not be empty")]
    EmptyAppName,
    #[error("invalid exporter configuration: {0}")]
    Exporter(#[from] BuildError),
    #[error("runtime metrics collection requires a running tokio runtime")]
    NoRuntime,
    #[error("runtime metrics interval must be greater than zero")]
    InvalidInterval,
}

/// Metrics pipeline: request counter, server histograms, runtime gauges and the recorder.
pub struct Telemetry {
    labels: Vec<Label>,
    requests: Counter,
    gauges: RuntimeGauges,
    recorder: Arc<PrometheusRecorder>,
}

impl Telemetry {
    /// Build the recorder and register every series. The counter starts at zero
    /// so it is exported before the first request.
    pub fn new(app_name: &str) -> Result<Self, MetricsError> {
        if app_name.trim().is_empty() {
            return Err(MetricsError::EmptyAppName);
        }

        let recorder = Arc::new(
            PrometheusBuilder::new()
                .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.into()), DURATION_BUCKETS)?
                .set_buckets_for_metric(Matcher::Full(REQUEST_SIZE.into()), SIZE_BUCKETS)?
                .set_buckets_for_metric(Matcher::Full(RESPONSE_SIZE.into()), SIZE_BUCKETS)?
                .build_recorder(),
        );
        let labels = vec![Label::new("app", app_name.to_string())];

        recorder.describe_counter(
            KeyName::from_const_str(REQUESTS_TOTAL),
            None,
            "Total number of requests".into(),
        );
        recorder.describe_histogram(
            KeyName::from_const_str(REQUEST_DURATION),
            None,
            "Duration of inbound HTTP requests in seconds".into(),
        );
        recorder.describe_histogram(
            KeyName::from_const_str(REQUEST_SIZE),
            None,
            "Size of inbound HTTP request bodies in bytes".into(),
        );
        recorder.describe_histogram(
            KeyName::from_const_str(RESPONSE_SIZE),
            None,
            "Size of HTTP response bodies in bytes".into(),
        );

        let requests = recorder.register_counter(
            &Key::from_parts(REQUESTS_TOTAL, labels.clone()),
            &metadata(),
        );
        requests.increment(0);

        let gauges = RuntimeGauges::register(recorder.clone());

        Ok(Self {
            labels,
            requests,
            gauges,
            recorder,
        })
    }

    /// Add `amount` to the request counter under the fixed label set.
    pub fn add(&self, amount: u64) {
        self.requests.increment(amount);
    }

    /// Record one served request of `operation`. Sizes are skipped when unknown.
    pub fn record_request(
        &self,
        operation: &'static str,
        method: &str,
        status: u16,
        request_size: Option<u64>,
        response_size: Option<u64>,
        start_time: Instant,
    ) {
        let mut labels = self.labels.clone();
        labels.push(Label::from_static_parts("operation", operation));
        labels.push(Label::new("method", method.to_string()));
        labels.push(Label::new("status", status.to_string()));

        let histogram = |name: &'static str| {
            self.recorder
                .register_histogram(&Key::from_parts(name, labels.clone()), &metadata())
        };

        histogram(REQUEST_DURATION).record(start_time.elapsed().as_secs_f64());
        if let Some(size) = request_size {
            histogram(REQUEST_SIZE).record(size as f64);
        }
        if let Some(size) = response_size {
            histogram(RESPONSE_SIZE).record(size as f64);
        }
    }

    /// Render all series in the Prometheus text format.
    pub fn render(&self) -> String {
        self.recorder.handle().render()
    }

    /// Current exported value of the request counter.
    pub fn requests_total(&self) -> Option<u64> {
        let series = format!("{}{}", REQUESTS_TOTAL, self.label_selector());
        sample_value(&self.render(), &series).map(|v| v as u64)
    }

    /// Labels rendered the way the exporter prints them, e.g. `{app="svc"}`.
    pub fn label_selector(&self) -> String {
        let pairs = self
            .labels
            .iter()
            .map(|l| format!("{}=\"{}\"", l.key(), l.value()))
            .collect::<Vec<_>>()
            .join(",");
        format!("{{{}}}", pairs)
    }

    /// Sample the gauges once, then keep sampling every `interval` on the
    /// current runtime until `shutdown` fires.
    pub fn start_runtime_collection(
        &self,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, MetricsError> {
        if interval.is_zero() {
            return Err(MetricsError::InvalidInterval);
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| MetricsError::NoRuntime)?;

        let gauges = self.gauges.clone();
        gauges.sample(&runtime);

        let sampler = runtime.clone();
        Ok(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => gauges.sample(&sampler),
                    _ = shutdown.recv() => {
                        tracing::debug!("Runtime metrics collection stopped");
                        break;
                    }
                }
            }
        }))
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

/// Process, host and runtime gauges.
#[derive(Clone)]
struct RuntimeGauges {
    recorder: Arc<PrometheusRecorder>,
    process: Arc<Collector>,
    started: Instant,
    uptime: Gauge,
    parallelism: Gauge,
    workers: Gauge,
    alive_tasks: Gauge,
    global_queue_depth: Gauge,
}

impl RuntimeGauges {
    fn register(recorder: Arc<PrometheusRecorder>) -> Self {
        let gauge = |name: &'static str, help: &'static str| {
            recorder.describe_gauge(
                KeyName::from_const_str(name),
                None,
                SharedString::const_str(help),
            );
            recorder.register_gauge(&Key::from_static_name(name), &metadata())
        };

        let uptime = gauge("process_uptime_seconds", "Seconds since the process started");
        let parallelism = gauge(
            "host_available_parallelism",
            "Number of CPUs available to the process",
        );
        let workers = gauge("tokio_runtime_workers", "Worker threads used by the runtime");
        let alive_tasks = gauge("tokio_runtime_alive_tasks", "Tasks currently alive");
        let global_queue_depth = gauge(
            "tokio_runtime_global_queue_depth",
            "Tasks currently scheduled in the global queue",
        );

        // metrics-process reports through the macros, so point them at our recorder.
        let process = Arc::new(Collector::default());
        metrics::with_local_recorder(recorder.as_ref(), || process.describe());

        Self {
            recorder,
            process,
            started: Instant::now(),
            uptime,
            parallelism,
            workers,
            alive_tasks,
            global_queue_depth,
        }
    }

    fn sample(&self, runtime: &tokio::runtime::Handle) {
        self.uptime.set(self.started.elapsed().as_secs_f64());

        if let Ok(cpus) = std::thread::available_parallelism() {
            self.parallelism.set(cpus.get() as f64);
        }

        let metrics = runtime.metrics();
        self.workers.set(metrics.num_workers() as f64);
        self.alive_tasks.set(metrics.num_alive_tasks() as f64);
        self.global_queue_depth
            .set(metrics.global_queue_depth() as f64);

        metrics::with_local_recorder(self.recorder.as_ref(), || self.process.collect());
    }
}

/// Find the value of an unlabelled or fully-labelled series in rendered output.
pub fn sample_value(rendered: &str, series: &str) -> Option<f64> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let rest = line.strip_prefix(series)?;
            rest.strip_prefix(' ')?.trim().parse().ok()
        })
}

//! Logging and metrics initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initializes the tracing subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. With
/// `json_format` the output is one JSON object per line for log
/// shipping; without it, human-readable lines for local work.
///
/// Initialization failures are ignored so tests can call this freely;
/// only the first subscriber in a process wins.
pub fn init_logging(json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_format {
        let fmt_layer = tracing_subscriber::fmt::layer().json().with_filter(filter);
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter);
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    }
}

/// Installs the Prometheus recorder and returns the render handle used
/// by the management metrics endpoint.
pub fn install_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

//! Gatehouse entry point.

use anyhow::Context;
use gatehouse_config::GatewayConfig;
use gatehouse_server::{telemetry, GatewayServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("loading configuration")?;
    telemetry::init_logging(config.log_json);

    let metrics = match telemetry::install_metrics() {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(error = %err, "metrics recorder unavailable");
            None
        }
    };

    let server = GatewayServer::build(&config, metrics).context("assembling gateway")?;
    server.run().await.context("running gateway")?;
    Ok(())
}

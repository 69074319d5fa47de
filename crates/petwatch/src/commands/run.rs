//! Long-running monitor.

use std::sync::Arc;

use tracing::info;

use petwatch_config::Config;
use petwatch_core::{AccessorySink, Monitor};

use crate::error::CliError;
use crate::sink::LogSink;

use super::build_client;

/// Start the monitor and keep it running until Ctrl-C.
pub async fn handle(cfg: &Config) -> Result<(), CliError> {
    let monitor_config = cfg.monitor_config()?;
    let client = Arc::new(build_client(cfg)?);
    let sink: Arc<dyn AccessorySink> = Arc::new(LogSink::new(monitor_config.escape_alert_type));

    info!(
        api = %client.base_url(),
        user = client.username(),
        ignored = monitor_config.ignored_pets.len(),
        "starting petwatch"
    );
    let monitor = Monitor::start(client, sink, monitor_config);

    let signal = tokio::signal::ctrl_c().await;
    info!("shutting down");
    monitor.shutdown().await;
    signal?;
    Ok(())
}

//! # Sleigh Telemetry Bridge
//!
//! Reads the (simulated) inertial sensor, estimates sleigh orientation,
//! and streams telemetry records to the broker ingress through a
//! retrying delivery queue.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (TOML file, built-in defaults if absent)
//!    - Set up logging with tracing subscriber, optionally into a
//!      rolling daily log file
//!    - Build the context: transport, client, sensor, indicator
//!
//! 2. **Main Loop**
//!    - 10ms sampling tick feeding the orientation filter
//!    - GPS worker assembling and enqueueing telemetry records
//!    - Periodic connectivity re-check driving the ready indicator
//!    - Gift-button events (stdin lines) incrementing the counter
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C stops the loop
//!    - GPS and queue workers stopped with a bounded wait
//!    - Transport session closed, clean logged exit

use anyhow::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info};

use sleigh_telemetry::app::Application;
use sleigh_telemetry::config::Config;
use sleigh_telemetry::device::{spawn_gift_listener, LogIndicator};
use sleigh_telemetry::sensor::SimulatedImu;
use sleigh_telemetry::telemetry::TelemetryClient;
use sleigh_telemetry::transport::{TcpTransport, Transport};

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    // RUST_LOG wins over the configured level when set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let _appender_guard = match &config.logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "sleigh-telemetry.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    };

    info!("Sleigh Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Broker endpoint: {}", config.transport.endpoint);

    let ready = Arc::new(AtomicBool::new(false));
    let transport = Arc::new(TcpTransport::new(&config.transport)) as Arc<dyn Transport>;
    let client = Arc::new(TelemetryClient::new(
        transport,
        &config.queue,
        Arc::clone(&ready),
    ));
    let imu = Box::new(SimulatedImu::new(config.fusion.sample_period_s));
    let gift_events = spawn_gift_listener();

    let app = Application::new(config, client, imu, Box::new(LogIndicator), ready);

    info!("Press Ctrl+C to exit");

    // Nothing past this point is fatal: log and exit cleanly, a
    // supervisor owns restarts
    if let Err(e) = app.run(gift_events).await {
        error!("Application terminated: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_default_config_path_parses_when_present() {
        // The shipped default file must stay loadable
        if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() {
            assert!(Config::load(DEFAULT_CONFIG_PATH).is_ok());
        }
    }
}

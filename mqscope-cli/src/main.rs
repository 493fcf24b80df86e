//! ## mqscope-cli
//! Entry point: decodes live MQTT traffic captured by an external
//! packet capture tool and logs every control packet it sees.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use mqscope_config::MqscopeConfig;
use mqscope_engine::run_live_mode;
use mqscope_telemetry::{EventLogger, MetricsRecorder};

mod cli;

use cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = MqscopeConfig::load()
        .context("failed to load configuration")?
        .with_overrides(cli.port, cli.interface)
        .context("invalid command line arguments")?;

    EventLogger::init(&config.telemetry.log_filter, config.telemetry.json);
    let metrics = MetricsRecorder::new().context("failed to register metrics")?;

    info!(
        interface = %config.capture.interface,
        port = config.capture.port,
        command = %config.capture.command,
        "MQTT packet decoder starting"
    );

    run_live_mode(&config, &metrics).context("MQTT capture failed")?;
    Ok(())
}

// mqscope-engine/src/runtime.rs

/*!
# Runtime

Live mode: start the capture process, decode its stream until it ends or
the user interrupts, then stop the process and report what was seen.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use mqscope_capture::{CaptureError, CaptureProcess};
use mqscope_config::MqscopeConfig;
use mqscope_telemetry::MetricsRecorder;

use crate::capture_loop::{CaptureLoop, CaptureStats};
use crate::error::EngineError;
use crate::sink::TracingSink;

/// Runs live capture with the tracing sink until the stream ends or Ctrl-C.
#[instrument(level = "info", name = "run_live_mode", skip_all, fields(port = config.capture.port, interface = %config.capture.interface))]
pub fn run_live_mode(
    config: &MqscopeConfig,
    metrics: &MetricsRecorder,
) -> Result<CaptureStats, EngineError> {
    let terminate = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&terminate);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let capture_config = &config.capture;
    let mut process = CaptureProcess::spawn(
        &capture_config.command,
        &capture_config.interface,
        capture_config.port,
    )?;
    let stdout = process.take_stdout()?;

    let mut capture = match CaptureLoop::open(
        stdout,
        capture_config.port,
        capture_config.max_record_len,
        Arc::clone(&terminate),
    ) {
        Ok(capture) => capture.with_metrics(metrics.clone()),
        Err(CaptureError::EmptyStream) if terminate.load(Ordering::SeqCst) => {
            process.terminate();
            return Ok(CaptureStats::default());
        }
        Err(CaptureError::EmptyStream) => return Err(process.early_exit_error().into()),
        Err(e) => return Err(e.into()),
    };

    info!("waiting for MQTT packets, press Ctrl+C to stop");
    let result = capture.run(&mut TracingSink::new());
    process.terminate();
    let stats = result?;

    info!(
        frames = stats.frames,
        frames_with_payload = stats.frames_with_payload,
        frames_skipped = stats.frames_skipped,
        packets = stats.packets,
        "capture stopped"
    );
    match metrics.gather_metrics() {
        Ok(text) => debug!(metrics = %text, "final metrics"),
        Err(e) => debug!(error = %e, "failed to gather metrics"),
    }

    Ok(stats)
}

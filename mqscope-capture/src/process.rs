//! # Capture process
//!
//! Launches the external packet capture tool (tcpdump by default) so it
//! writes a pcap stream to its stdout, and makes sure the child is reaped
//! when capture stops.

use std::io;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::CaptureError;

pub struct CaptureProcess {
    command: String,
    child: Child,
    reaped: bool,
}

impl CaptureProcess {
    /// Arguments for a tcpdump compatible tool: unbuffered, full-length
    /// pcap on stdout, filtered to the broker port.
    pub fn args(interface: &str, port: u16) -> Vec<String> {
        vec![
            "-i".into(),
            interface.into(),
            "-w".into(),
            "-".into(),
            "-U".into(),
            "-s".into(),
            "0".into(),
            format!("tcp port {}", port),
        ]
    }

    /// Spawns `command` capturing TCP traffic on `port` from `interface`.
    pub fn spawn(command: &str, interface: &str, port: u16) -> Result<Self, CaptureError> {
        let args = Self::args(interface, port);
        info!(command, ?args, "starting capture process");

        let child = Command::new(command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| spawn_error(command, source))?;

        Ok(CaptureProcess {
            command: command.to_string(),
            child,
            reaped: false,
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Hands out the pcap stream. Can only be taken once.
    pub fn take_stdout(&mut self) -> Result<ChildStdout, CaptureError> {
        self.child.stdout.take().ok_or(CaptureError::MissingStdout)
    }

    /// Explains why the stream ended before the pcap header arrived.
    ///
    /// Waits for the child, so only call this once the stream is closed.
    pub fn early_exit_error(&mut self) -> CaptureError {
        match self.child.wait() {
            Ok(status) => {
                self.reaped = true;
                if status.success() {
                    CaptureError::EmptyStream
                } else {
                    CaptureError::ProcessExited { status }
                }
            }
            Err(e) => CaptureError::Io(e),
        }
    }

    /// Stops the capture process if it is still running and reaps it.
    pub fn terminate(&mut self) {
        if self.reaped {
            return;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => debug!(command = %self.command, %status, "capture process already exited"),
            Ok(None) => {
                if let Err(e) = self.child.kill() {
                    warn!(command = %self.command, error = %e, "failed to kill capture process");
                }
            }
            Err(e) => warn!(command = %self.command, error = %e, "failed to poll capture process"),
        }
        if self.child.wait().is_ok() {
            self.reaped = true;
        }
    }
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn spawn_error(command: &str, source: io::Error) -> CaptureError {
    let command = command.to_string();
    match source.kind() {
        io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied { command },
        io::ErrorKind::NotFound => CaptureError::CommandNotFound { command },
        _ => CaptureError::Spawn { command, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_args() {
        assert_eq!(
            CaptureProcess::args("any", 1883),
            ["-i", "any", "-w", "-", "-U", "-s", "0", "tcp port 1883"]
        );
    }

    #[test]
    fn test_spawn_error_mapping() {
        let err = spawn_error("tcpdump", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, CaptureError::PermissionDenied { .. }));
        assert!(err.to_string().contains("elevated privileges"));

        let err = spawn_error("tcpdump", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, CaptureError::CommandNotFound { .. }));

        let err = spawn_error("tcpdump", io::Error::from(io::ErrorKind::Other));
        assert!(matches!(err, CaptureError::Spawn { .. }));
    }

    #[test]
    fn test_missing_command() {
        let result = CaptureProcess::spawn("mqscope-no-such-capture-tool", "any", 1883);
        assert!(matches!(result, Err(CaptureError::CommandNotFound { .. })));
    }
}

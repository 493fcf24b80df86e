//! # Capture Errors

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Fatal errors of the capture stream. Any of these ends the capture loop.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture command `{command}` requires elevated privileges (try running with sudo)")]
    PermissionDenied { command: String },

    #[error("capture command `{command}` not found; install it or set capture.command")]
    CommandNotFound { command: String },

    #[error("failed to launch capture command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("capture process exited ({status}) before producing any data; it requires elevated privileges and an existing interface")]
    ProcessExited { status: ExitStatus },

    #[error("capture process has no stdout")]
    MissingStdout,

    #[error("capture stream ended before the global header")]
    EmptyStream,

    #[error("capture stream is not classic pcap: {0}")]
    Format(String),

    #[error("capture record of {len} bytes exceeds the {max} byte limit; stream is out of sync")]
    RecordTooLarge { len: usize, max: usize },

    #[error("capture stream I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Reasons a captured frame does not yield a TCP payload.
///
/// These are per-frame and never fatal: the frame is skipped.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("frame truncated inside the {0} header")]
    Truncated(&'static str),

    #[error("{layer} header length {len} is below the minimum")]
    BadHeaderLength { layer: &'static str, len: usize },

    #[error("malformed {0} header")]
    Malformed(&'static str),

    #[error("unsupported IP version {0}")]
    UnsupportedIpVersion(u8),

    #[error("IP protocol {0} is not TCP")]
    NotTcp(u8),
}

// mqscope-config/src/capture.rs
//! Packet capture configuration.
//!
//! Selects what the external capture process listens to and how much of
//! its output stream the reader is willing to buffer per record.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Packet capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// TCP port the broker listens on.
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Network interface to capture on (`any` for all of them).
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Capture program writing pcap to stdout.
    #[validate(length(min = 1))]
    #[serde(default = "default_command")]
    pub command: String,

    /// Largest capture record accepted before the stream is considered corrupt.
    #[validate(range(min = 65535, max = 16777216))]
    #[serde(default = "default_max_record_len")]
    pub max_record_len: usize,
}

fn default_port() -> u16 {
    1883
}

fn default_interface() -> String {
    "any".into()
}

fn default_command() -> String {
    "tcpdump".into()
}

fn default_max_record_len() -> usize {
    262_144
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            interface: default_interface(),
            command: default_command(),
            max_record_len: default_max_record_len(),
        }
    }
}

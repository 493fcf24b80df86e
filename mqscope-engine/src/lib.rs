//! # mqscope Engine
//!
//! Drives the capture pipeline: pcap stream → frame extraction → MQTT
//! packet splitting and decoding → packet sink.

pub mod capture_loop;
pub mod error;
pub mod runtime;
pub mod sink;

pub use capture_loop::{CaptureLoop, CaptureStats, CapturedPacket};
pub use error::EngineError;
pub use runtime::run_live_mode;
pub use sink::{PacketSink, TracingSink};

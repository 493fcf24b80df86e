//! mqscope-capture
//!
//! Reads the pcap byte stream written by an external capture process and
//! strips link, network and transport headers to get at the TCP payload.

pub mod error;
pub mod extract;
pub mod packet;
pub mod process;
pub mod stream;

pub use error::{CaptureError, ExtractError};
pub use extract::FrameExtractor;
pub use packet::{Direction, RawFrame, TransportSegment};
pub use process::CaptureProcess;
pub use stream::{GlobalHeader, LinkType, PcapStreamReader};

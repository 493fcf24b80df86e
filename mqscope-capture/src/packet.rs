//! Frame and segment types passed between the capture stages.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One captured link-layer frame.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Bytes,
    pub timestamp: DateTime<Utc>,
    /// Length of the frame on the wire; larger than `data` when the snaplen cut it.
    pub orig_len: u32,
}

impl RawFrame {
    /// Creates a new frame from raw data, stamped with the current time.
    pub fn new(data: Vec<u8>) -> Self {
        let orig_len = data.len() as u32;
        RawFrame {
            data: Bytes::from(data),
            timestamp: Utc::now(),
            orig_len,
        }
    }

    pub fn with_timestamp(data: Bytes, timestamp: DateTime<Utc>, orig_len: u32) -> Self {
        RawFrame {
            data,
            timestamp,
            orig_len,
        }
    }
}

/// Which side of the broker connection sent a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToBroker,
    BrokerToClient,
}

impl Direction {
    /// Segments sent from the observed broker port flow towards the client.
    pub fn classify(src_port: u16, broker_port: u16) -> Self {
        if src_port == broker_port {
            Direction::BrokerToClient
        } else {
            Direction::ClientToBroker
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToBroker => f.write_str("Client->Broker"),
            Direction::BrokerToClient => f.write_str("Broker->Client"),
        }
    }
}

/// TCP view of a frame. `payload` shares the frame's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSegment {
    pub src_port: u16,
    pub dst_port: u16,
    pub tcp_flags: u8,
    pub payload: Bytes,
}

impl TransportSegment {
    pub fn direction(&self, broker_port: u16) -> Direction {
        Direction::classify(self.src_port, broker_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_classification() {
        assert_eq!(Direction::classify(1883, 1883), Direction::BrokerToClient);
        assert_eq!(Direction::classify(51234, 1883), Direction::ClientToBroker);
        assert_eq!(Direction::BrokerToClient.to_string(), "Broker->Client");
        assert_eq!(Direction::ClientToBroker.to_string(), "Client->Broker");
    }

    #[test]
    fn test_raw_frame_new() {
        let frame = RawFrame::new(vec![1, 2, 3]);
        assert_eq!(frame.orig_len, 3);
        assert_eq!(&frame.data[..], &[1, 2, 3]);
    }
}

//! ## mqscope-protocols::mqtt::frames
//! Splits one TCP payload into the MQTT packets it carries back to back.
//!
//! Packets split across TCP segments are not reassembled: the iterator
//! stops at the first byte it cannot decode and the rest of the payload
//! is dropped.

use std::iter::FusedIterator;

use super::{MqttPacket, MqttParser, PacketType};

/// A decoded packet and where it started inside the payload.
#[derive(Clone, Debug, PartialEq)]
pub struct FramedPacket {
    pub offset: usize,
    pub packet: MqttPacket,
}

/// Iterator over the MQTT packets in a single payload buffer.
#[derive(Debug, Clone)]
pub struct MqttFrames<'a> {
    parser: MqttParser,
    data: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> MqttFrames<'a> {
    pub fn new(parser: MqttParser, data: &'a [u8]) -> Self {
        Self {
            parser,
            data,
            offset: 0,
            done: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for MqttFrames<'_> {
    type Item = FramedPacket;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = self.data.get(self.offset..).unwrap_or_default();
        if rest.len() < 2 || !PacketType::is_valid_code(rest[0] >> 4) {
            self.done = true;
            return None;
        }

        match self.parser.decode(rest) {
            Some(packet) => {
                let offset = self.offset;
                self.offset += packet.encoded_len();
                Some(FramedPacket { offset, packet })
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl FusedIterator for MqttFrames<'_> {}

//! ## mqscope-protocols::mqtt
//! MQTT 3.1.1 packet decoder. Parses the fixed header, decodes the
//! variable-length remaining length and dispatches to a per-type body
//! decoder. Every read is bounds-checked so malformed capture data can
//! only ever produce an error, never a panic.

use std::fmt;

use thiserror::Error;
use tracing::debug;

pub mod body;
pub mod codec;
pub mod frames;

pub use body::{
    ConnackBody, ConnectBody, ConnectFlags, ConnectReturnCode, PacketBody, PublishBody,
    PublishPayload, TopicFilter, Will, REDACTED_PASSWORD,
};
pub use frames::{FramedPacket, MqttFrames};

/// Errors that can occur while parsing an MQTT packet.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MqttParseError {
    #[error("Insufficient data to parse MQTT packet")]
    InsufficientData,
    #[error("Malformed remaining length field")]
    RemainingLengthMalformed,
    #[error("Invalid MQTT packet type {0}")]
    InvalidPacketType(u8),
}

/// The fourteen MQTT 3.1.1 control packet types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    Connack = 2,
    Publish = 3,
    Puback = 4,
    Pubrec = 5,
    Pubrel = 6,
    Pubcomp = 7,
    Subscribe = 8,
    Suback = 9,
    Unsubscribe = 10,
    Unsuback = 11,
    Pingreq = 12,
    Pingresp = 13,
    Disconnect = 14,
}

impl PacketType {
    /// Numeric type code as carried in the high nibble of the first byte.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Upper-case name used by the MQTT specification.
    pub fn name(self) -> &'static str {
        match self {
            PacketType::Connect => "CONNECT",
            PacketType::Connack => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::Puback => "PUBACK",
            PacketType::Pubrec => "PUBREC",
            PacketType::Pubrel => "PUBREL",
            PacketType::Pubcomp => "PUBCOMP",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::Suback => "SUBACK",
            PacketType::Unsubscribe => "UNSUBSCRIBE",
            PacketType::Unsuback => "UNSUBACK",
            PacketType::Pingreq => "PINGREQ",
            PacketType::Pingresp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
        }
    }

    /// Cheap check used to tell MQTT data apart from trailing noise.
    pub fn is_valid_code(code: u8) -> bool {
        (1..=14).contains(&code)
    }
}

impl TryFrom<u8> for PacketType {
    type Error = MqttParseError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => PacketType::Connect,
            2 => PacketType::Connack,
            3 => PacketType::Publish,
            4 => PacketType::Puback,
            5 => PacketType::Pubrec,
            6 => PacketType::Pubrel,
            7 => PacketType::Pubcomp,
            8 => PacketType::Subscribe,
            9 => PacketType::Suback,
            10 => PacketType::Unsubscribe,
            11 => PacketType::Unsuback,
            12 => PacketType::Pingreq,
            13 => PacketType::Pingresp,
            14 => PacketType::Disconnect,
            other => return Err(MqttParseError::InvalidPacketType(other)),
        })
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded MQTT fixed header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    /// Low nibble of the first byte.
    pub flags: u8,
    pub remaining_length: u32,
    /// Offset of the first body byte, i.e. where the remaining length field ends.
    pub header_len: usize,
}

impl FixedHeader {
    /// Parses the type/flags byte and the remaining length field.
    pub fn parse(data: &[u8]) -> Result<Self, MqttParseError> {
        if data.len() < 2 {
            return Err(MqttParseError::InsufficientData);
        }
        let packet_type = PacketType::try_from(data[0] >> 4)?;
        let flags = data[0] & 0x0F;
        let (remaining_length, header_len) = codec::decode_remaining_length(data, 1)?;

        Ok(FixedHeader {
            packet_type,
            flags,
            remaining_length,
            header_len,
        })
    }

    /// Number of bytes the whole packet occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        self.header_len + self.remaining_length as usize
    }
}

/// A fully decoded MQTT control packet.
#[derive(Clone, Debug, PartialEq)]
pub struct MqttPacket {
    pub fixed_header: FixedHeader,
    pub packet_id: Option<u16>,
    pub body: PacketBody,
}

impl MqttPacket {
    pub fn packet_type(&self) -> PacketType {
        self.fixed_header.packet_type
    }

    pub fn type_code(&self) -> u8 {
        self.fixed_header.packet_type.code()
    }

    pub fn flags(&self) -> u8 {
        self.fixed_header.flags
    }

    pub fn remaining_length(&self) -> u32 {
        self.fixed_header.remaining_length
    }

    pub fn encoded_len(&self) -> usize {
        self.fixed_header.encoded_len()
    }
}

/// Stateless MQTT decoder.
#[derive(Default, Debug, Copy, Clone)]
pub struct MqttParser;

impl MqttParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses one MQTT packet from the start of `data`.
    ///
    /// Body decoders only see the bytes the remaining length declares, so
    /// a following packet in the same segment is never read as part of
    /// this one. A packet cut short by the end of `data` is decoded from
    /// whatever is present.
    pub fn parse(&self, data: &[u8]) -> Result<MqttPacket, MqttParseError> {
        let fixed_header = FixedHeader::parse(data)?;
        let end = fixed_header.encoded_len().min(data.len());
        let window = &data[..end];

        let (packet_id, body) = body::decode_body(&fixed_header, window)?;

        Ok(MqttPacket {
            fixed_header,
            packet_id,
            body,
        })
    }

    /// Like [`MqttParser::parse`] but swallows the error.
    ///
    /// Capture traffic is expected to contain garbage; callers that only
    /// care about well-formed packets use this.
    pub fn decode(&self, data: &[u8]) -> Option<MqttPacket> {
        match self.parse(data) {
            Ok(packet) => Some(packet),
            Err(err) => {
                debug!(error = %err, len = data.len(), "dropping undecodable MQTT data");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pingreq() {
        let packet = MqttParser::new().parse(&[0xC0, 0x00]).unwrap();
        assert_eq!(packet.packet_type(), PacketType::Pingreq);
        assert_eq!(packet.packet_type().name(), "PINGREQ");
        assert_eq!(packet.type_code(), 12);
        assert_eq!(packet.remaining_length(), 0);
        assert_eq!(packet.packet_id, None);
        assert_eq!(packet.body, PacketBody::Empty);
        assert_eq!(packet.encoded_len(), 2);
    }

    #[test]
    fn test_disconnect_and_pingresp() {
        let parser = MqttParser::new();
        assert_eq!(
            parser.parse(&[0xD0, 0x00]).unwrap().packet_type(),
            PacketType::Pingresp
        );
        assert_eq!(
            parser.parse(&[0xE0, 0x00]).unwrap().packet_type(),
            PacketType::Disconnect
        );
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            MqttParser::new().parse(&[0xC0]),
            Err(MqttParseError::InsufficientData)
        );
        assert_eq!(MqttParser::new().decode(&[]), None);
    }

    #[test]
    fn test_invalid_packet_types() {
        let parser = MqttParser::new();
        assert_eq!(
            parser.parse(&[0x00, 0x00]),
            Err(MqttParseError::InvalidPacketType(0))
        );
        assert_eq!(
            parser.parse(&[0xF0, 0x00]),
            Err(MqttParseError::InvalidPacketType(15))
        );
    }

    #[test]
    fn test_malformed_remaining_length() {
        let packet = [0x30, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert_eq!(
            MqttParser::new().parse(&packet),
            Err(MqttParseError::RemainingLengthMalformed)
        );
    }

    #[test]
    fn test_empty_connect_is_insufficient() {
        assert_eq!(
            MqttParser::new().parse(&[0x10, 0x00]),
            Err(MqttParseError::InsufficientData)
        );
        assert!(MqttParser::new().decode(&[0x10, 0x00]).is_none());
    }

    #[test]
    fn test_flags_are_kept() {
        let packet = MqttParser::new().parse(&[0x62, 0x02, 0x00, 0x07]).unwrap();
        assert_eq!(packet.packet_type(), PacketType::Pubrel);
        assert_eq!(packet.flags(), 0x02);
        assert_eq!(packet.packet_id, Some(7));
    }

    #[test]
    fn test_body_window_stops_at_declared_length() {
        // PUBLISH "t" / "hi" followed by a PINGREQ in the same buffer.
        let data = [0x30, 0x05, 0x00, 0x01, b't', b'h', b'i', 0xC0, 0x00];
        let packet = MqttParser::new().parse(&data).unwrap();
        match &packet.body {
            PacketBody::Publish(publish) => {
                assert_eq!(publish.payload, PublishPayload::Text("hi".into()));
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(packet.encoded_len(), 7);
    }

    #[test]
    fn test_packet_type_round_trip() {
        for code in 1..=14u8 {
            let packet_type = PacketType::try_from(code).unwrap();
            assert_eq!(packet_type.code(), code);
            assert!(PacketType::is_valid_code(code));
        }
        assert!(!PacketType::is_valid_code(0));
        assert!(!PacketType::is_valid_code(15));
    }
}

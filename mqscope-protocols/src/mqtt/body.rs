//! ## mqscope-protocols::mqtt::body
//! Per-packet-type body layouts and their decoders.
//!
//! Fixed-size fields that a packet cannot exist without (the CONNECT
//! protocol header, the two CONNACK bytes, the PUBLISH topic) fail the
//! decode with [`MqttParseError::InsufficientData`]. Everything after them
//! is read in wire order and the first field that is missing ends the
//! body; the fields after it are left out.

use std::fmt;

use tracing::warn;

use super::codec::{decode_string, decode_u16};
use super::{FixedHeader, MqttParseError, PacketType};

/// Stand-in recorded whenever the CONNECT password flag is set.
pub const REDACTED_PASSWORD: &str = "***hidden***";

/// Decoded CONNECT flags byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectFlags {
    pub clean_session: bool,
    pub will: bool,
    pub will_qos: u8,
    pub will_retain: bool,
    pub password: bool,
    pub username: bool,
}

impl ConnectFlags {
    pub fn from_byte(flags: u8) -> Self {
        ConnectFlags {
            clean_session: flags & 0x02 != 0,
            will: flags & 0x04 != 0,
            will_qos: (flags & 0x18) >> 3,
            will_retain: flags & 0x20 != 0,
            password: flags & 0x40 != 0,
            username: flags & 0x80 != 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Will {
    pub topic: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectBody {
    pub protocol: String,
    pub level: u8,
    pub flags: ConnectFlags,
    pub keep_alive: u16,
    pub client_id: Option<String>,
    pub will: Option<Will>,
    pub username: Option<String>,
    /// Never the real password, only [`REDACTED_PASSWORD`] when the flag is set.
    pub password: Option<&'static str>,
}

/// CONNACK return codes from MQTT 3.1.1 section 3.2.2.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectReturnCode {
    Accepted,
    UnacceptableProtocolVersion,
    IdentifierRejected,
    ServerUnavailable,
    BadUsernameOrPassword,
    NotAuthorized,
    Unknown(u8),
}

impl ConnectReturnCode {
    pub fn code(self) -> u8 {
        match self {
            ConnectReturnCode::Accepted => 0,
            ConnectReturnCode::UnacceptableProtocolVersion => 1,
            ConnectReturnCode::IdentifierRejected => 2,
            ConnectReturnCode::ServerUnavailable => 3,
            ConnectReturnCode::BadUsernameOrPassword => 4,
            ConnectReturnCode::NotAuthorized => 5,
            ConnectReturnCode::Unknown(code) => code,
        }
    }
}

impl From<u8> for ConnectReturnCode {
    fn from(code: u8) -> Self {
        match code {
            0 => ConnectReturnCode::Accepted,
            1 => ConnectReturnCode::UnacceptableProtocolVersion,
            2 => ConnectReturnCode::IdentifierRejected,
            3 => ConnectReturnCode::ServerUnavailable,
            4 => ConnectReturnCode::BadUsernameOrPassword,
            5 => ConnectReturnCode::NotAuthorized,
            other => ConnectReturnCode::Unknown(other),
        }
    }
}

impl fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectReturnCode::Accepted => f.write_str("Connection Accepted"),
            ConnectReturnCode::UnacceptableProtocolVersion => {
                f.write_str("Unacceptable protocol version")
            }
            ConnectReturnCode::IdentifierRejected => f.write_str("Identifier rejected"),
            ConnectReturnCode::ServerUnavailable => f.write_str("Server unavailable"),
            ConnectReturnCode::BadUsernameOrPassword => f.write_str("Bad username or password"),
            ConnectReturnCode::NotAuthorized => f.write_str("Not authorized"),
            ConnectReturnCode::Unknown(code) => write!(f, "Unknown({})", code),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnackBody {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

/// PUBLISH application payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublishPayload {
    /// Payload was valid UTF-8.
    Text(String),
    /// Lowercase hex of a binary payload.
    Hex(String),
}

impl PublishPayload {
    fn from_bytes(raw: &[u8]) -> Self {
        match std::str::from_utf8(raw) {
            Ok(text) => PublishPayload::Text(text.to_owned()),
            Err(_) => PublishPayload::Hex(hex::encode(raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PublishPayload::Text(s) | PublishPayload::Hex(s) => s,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PublishPayload::Text(_) => "text",
            PublishPayload::Hex(_) => "hex",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishBody {
    pub dup: bool,
    /// Not range checked: the reserved value 3 is passed through.
    pub qos: u8,
    pub retain: bool,
    pub topic: String,
    pub payload: PublishPayload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicFilter {
    pub topic: String,
    pub qos: u8,
}

/// Type specific part of an [`super::MqttPacket`].
#[derive(Clone, Debug, PartialEq)]
pub enum PacketBody {
    Connect(ConnectBody),
    Connack(ConnackBody),
    Publish(PublishBody),
    Subscribe(Vec<TopicFilter>),
    /// Raw per-topic return codes.
    Suback(Vec<u8>),
    Unsubscribe(Vec<String>),
    /// Packets that carry nothing beyond the fixed header and packet id.
    Empty,
}

/// Decodes the body of the packet described by `header`.
///
/// `buf` starts at the fixed header and ends at the packet boundary.
pub(crate) fn decode_body(
    header: &FixedHeader,
    buf: &[u8],
) -> Result<(Option<u16>, PacketBody), MqttParseError> {
    let offset = header.header_len;

    match header.packet_type {
        PacketType::Connect => Ok((None, PacketBody::Connect(decode_connect(buf, offset)?))),
        PacketType::Connack => Ok((None, PacketBody::Connack(decode_connack(buf, offset)?))),
        PacketType::Publish => {
            let (packet_id, publish) = decode_publish(buf, offset, header.flags)?;
            Ok((packet_id, PacketBody::Publish(publish)))
        }
        PacketType::Puback
        | PacketType::Pubrec
        | PacketType::Pubrel
        | PacketType::Pubcomp
        | PacketType::Unsuback => Ok((optional_packet_id(buf, offset).0, PacketBody::Empty)),
        PacketType::Subscribe => {
            let (packet_id, topics) = decode_subscribe(buf, offset);
            Ok((packet_id, PacketBody::Subscribe(topics)))
        }
        PacketType::Suback => match optional_packet_id(buf, offset) {
            (Some(id), next) => Ok((Some(id), PacketBody::Suback(buf[next..].to_vec()))),
            (None, _) => Ok((None, PacketBody::Suback(Vec::new()))),
        },
        PacketType::Unsubscribe => {
            let (packet_id, topics) = decode_unsubscribe(buf, offset);
            Ok((packet_id, PacketBody::Unsubscribe(topics)))
        }
        PacketType::Pingreq | PacketType::Pingresp | PacketType::Disconnect => {
            Ok((None, PacketBody::Empty))
        }
    }
}

fn optional_packet_id(buf: &[u8], offset: usize) -> (Option<u16>, usize) {
    match decode_u16(buf, offset) {
        Ok((id, next)) => (Some(id), next),
        Err(_) => (None, offset),
    }
}

fn decode_connect(buf: &[u8], offset: usize) -> Result<ConnectBody, MqttParseError> {
    let (protocol, offset) = decode_string(buf, offset)?;
    let Some(&[level, flags, ka_hi, ka_lo]) = buf.get(offset..offset + 4) else {
        return Err(MqttParseError::InsufficientData);
    };
    let flags = ConnectFlags::from_byte(flags);

    let mut connect = ConnectBody {
        protocol,
        level,
        flags,
        keep_alive: u16::from_be_bytes([ka_hi, ka_lo]),
        client_id: None,
        will: None,
        username: None,
        password: flags.password.then_some(REDACTED_PASSWORD),
    };

    let Ok((client_id, mut offset)) = decode_string(buf, offset + 4) else {
        return Ok(connect);
    };
    connect.client_id = Some(client_id);

    if flags.will {
        let Ok((topic, next)) = decode_string(buf, offset) else {
            return Ok(connect);
        };
        let Ok((message, next)) = decode_string(buf, next) else {
            return Ok(connect);
        };
        connect.will = Some(Will { topic, message });
        offset = next;
    }

    if flags.username {
        connect.username = decode_string(buf, offset).ok().map(|(username, _)| username);
    }

    Ok(connect)
}

fn decode_connack(buf: &[u8], offset: usize) -> Result<ConnackBody, MqttParseError> {
    match buf.get(offset..offset + 2) {
        Some(&[ack_flags, code]) => Ok(ConnackBody {
            session_present: ack_flags & 0x01 != 0,
            return_code: ConnectReturnCode::from(code),
        }),
        _ => Err(MqttParseError::InsufficientData),
    }
}

fn decode_publish(
    buf: &[u8],
    offset: usize,
    flags: u8,
) -> Result<(Option<u16>, PublishBody), MqttParseError> {
    let dup = flags & 0x08 != 0;
    let qos = (flags & 0x06) >> 1;
    let retain = flags & 0x01 != 0;
    if qos > 2 {
        warn!(qos, "PUBLISH with reserved QoS value");
    }

    let (topic, mut offset) = decode_string(buf, offset)?;

    let mut packet_id = None;
    if qos > 0 {
        if let Ok((id, next)) = decode_u16(buf, offset) {
            packet_id = Some(id);
            offset = next;
        }
    }

    let payload = PublishPayload::from_bytes(buf.get(offset..).unwrap_or_default());

    Ok((
        packet_id,
        PublishBody {
            dup,
            qos,
            retain,
            topic,
            payload,
        },
    ))
}

fn decode_subscribe(buf: &[u8], offset: usize) -> (Option<u16>, Vec<TopicFilter>) {
    let (packet_id, mut offset) = optional_packet_id(buf, offset);

    let mut topics = Vec::new();
    while offset < buf.len() {
        let Ok((topic, next)) = decode_string(buf, offset) else {
            break;
        };
        let Some(&qos) = buf.get(next) else {
            break;
        };
        topics.push(TopicFilter { topic, qos });
        offset = next + 1;
    }

    (packet_id, topics)
}

fn decode_unsubscribe(buf: &[u8], offset: usize) -> (Option<u16>, Vec<String>) {
    let (packet_id, mut offset) = optional_packet_id(buf, offset);
    if packet_id.is_none() {
        return (None, Vec::new());
    }

    let mut topics = Vec::new();
    while offset < buf.len() {
        let Ok((topic, next)) = decode_string(buf, offset) else {
            break;
        };
        topics.push(topic);
        offset = next;
    }

    (packet_id, topics)
}

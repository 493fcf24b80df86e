//! # mqscope Protocol Parsers
//!
//! Crate for decoding MQTT 3.1.1 control packets out of captured TCP payloads.

pub mod mqtt;

pub use mqtt::{
    ConnackBody, ConnectBody, ConnectFlags, ConnectReturnCode, FixedHeader, FramedPacket,
    MqttFrames, MqttPacket, MqttParseError, MqttParser, PacketBody, PacketType, PublishBody,
    PublishPayload, TopicFilter, Will,
};

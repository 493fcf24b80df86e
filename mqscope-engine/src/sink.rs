//! Packet sinks: where decoded packets go.

use std::fmt::Write;

use tracing::info;

use mqscope_protocols::PacketBody;

use crate::capture_loop::CapturedPacket;

/// Longest payload excerpt put into a log line.
const MAX_PAYLOAD_CHARS: usize = 100;

/// Receives every decoded packet, in capture order.
pub trait PacketSink {
    fn deliver(&mut self, packet: CapturedPacket);
}

impl<F> PacketSink for F
where
    F: FnMut(CapturedPacket),
{
    fn deliver(&mut self, packet: CapturedPacket) {
        self(packet)
    }
}

/// Reports each packet as a structured `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl PacketSink for TracingSink {
    fn deliver(&mut self, captured: CapturedPacket) {
        let packet = &captured.packet;
        info!(
            timestamp = %captured.timestamp.format("%H:%M:%S%.3f"),
            direction = %captured.direction,
            packet_type = packet.packet_type().name(),
            type_code = packet.type_code(),
            flags = %format_args!("{:#04x}", packet.flags()),
            remaining_length = packet.remaining_length(),
            packet_id = ?packet.packet_id,
            details = %summary(&packet.body),
            "MQTT packet"
        );
    }
}

/// One-line description of a packet body.
pub fn summary(body: &PacketBody) -> String {
    let mut out = String::new();
    match body {
        PacketBody::Connect(connect) => {
            let _ = write!(
                out,
                "protocol={} level={} client_id={} clean_session={} keep_alive={}s",
                connect.protocol,
                connect.level,
                connect.client_id.as_deref().unwrap_or("N/A"),
                connect.flags.clean_session,
                connect.keep_alive,
            );
            if let Some(username) = &connect.username {
                let _ = write!(out, " username={}", username);
            }
            if let Some(password) = connect.password {
                let _ = write!(out, " password={}", password);
            }
            if let Some(will) = &connect.will {
                let _ = write!(
                    out,
                    " will_topic={} will_qos={} will_retain={}",
                    will.topic, connect.flags.will_qos, connect.flags.will_retain
                );
            }
        }
        PacketBody::Connack(connack) => {
            let _ = write!(
                out,
                "session_present={} return_code={}",
                connack.session_present, connack.return_code
            );
        }
        PacketBody::Publish(publish) => {
            let payload = publish.payload.as_str();
            let excerpt: String = payload.chars().take(MAX_PAYLOAD_CHARS).collect();
            let ellipsis = if payload.chars().nth(MAX_PAYLOAD_CHARS).is_some() {
                "..."
            } else {
                ""
            };
            let _ = write!(
                out,
                "topic={} qos={} retain={} dup={} payload({})={}{}",
                publish.topic,
                publish.qos,
                publish.retain,
                publish.dup,
                publish.payload.kind(),
                excerpt,
                ellipsis
            );
        }
        PacketBody::Subscribe(topics) => {
            let list: Vec<String> = topics
                .iter()
                .map(|t| format!("{}@{}", t.topic, t.qos))
                .collect();
            let _ = write!(out, "topics=[{}]", list.join(", "));
        }
        PacketBody::Suback(codes) => {
            let _ = write!(out, "return_codes={:?}", codes);
        }
        PacketBody::Unsubscribe(topics) => {
            let _ = write!(out, "topics=[{}]", topics.join(", "));
        }
        PacketBody::Empty => {}
    }
    out
}

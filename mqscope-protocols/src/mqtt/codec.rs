//! ## mqscope-protocols::mqtt::codec
//! Primitive field decoders shared by every MQTT packet body: the
//! variable-length "remaining length" integer, length-prefixed UTF-8
//! strings and big-endian `u16` fields.

use super::MqttParseError;

/// The remaining length field never spans more than four bytes.
pub const MAX_REMAINING_LENGTH_BYTES: usize = 4;

/// Largest value a four byte remaining length can carry.
pub const MAX_REMAINING_LENGTH: u32 = 268_435_455;

/// Decodes MQTT's variable-length "remaining length" field starting at `offset`.
///
/// Returns `(value, next_offset)` where `next_offset` is the index right
/// after the terminating byte. A fourth byte that still has its
/// continuation bit set is malformed; running out of input before the
/// terminating byte is insufficient data.
pub fn decode_remaining_length(buf: &[u8], offset: usize) -> Result<(u32, usize), MqttParseError> {
    let mut multiplier: u32 = 1;
    let mut value: u32 = 0;

    for i in 0..MAX_REMAINING_LENGTH_BYTES {
        let byte = *buf
            .get(offset + i)
            .ok_or(MqttParseError::InsufficientData)?;
        value += u32::from(byte & 0x7F) * multiplier;
        if byte & 0x80 == 0 {
            return Ok((value, offset + i + 1));
        }
        multiplier *= 128;
    }

    Err(MqttParseError::RemainingLengthMalformed)
}

/// Reads a big-endian `u16` at `offset`.
pub fn decode_u16(buf: &[u8], offset: usize) -> Result<(u16, usize), MqttParseError> {
    match buf.get(offset..offset + 2) {
        Some(&[hi, lo]) => Ok((u16::from_be_bytes([hi, lo]), offset + 2)),
        _ => Err(MqttParseError::InsufficientData),
    }
}

/// Decodes a length-prefixed MQTT string starting at `offset`.
///
/// Invalid UTF-8 is replaced with U+FFFD instead of failing; captured
/// payloads are frequently garbled and a lossy topic is still useful.
pub fn decode_string(buf: &[u8], offset: usize) -> Result<(String, usize), MqttParseError> {
    let (len, start) = decode_u16(buf, offset)?;
    let end = start + usize::from(len);
    let raw = buf
        .get(start..end)
        .ok_or(MqttParseError::InsufficientData)?;
    Ok((String::from_utf8_lossy(raw).into_owned(), end))
}

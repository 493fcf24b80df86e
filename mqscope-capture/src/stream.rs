//! # pcap stream reader
//!
//! Reads the classic pcap format from any `Read` with `pcap_parser`, pulling
//! more bytes only when a record is incomplete so a live pipe can be
//! followed. A stream that ends inside a record is the end of the capture,
//! not an error.

use std::io::{self, Cursor, Read};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError, PcapHeader};
use tracing::debug;

use crate::error::CaptureError;
use crate::packet::RawFrame;

pub const GLOBAL_HEADER_LEN: usize = 24;
pub const RECORD_HEADER_LEN: usize = 16;

/// Largest snaplen tcpdump will use.
pub const DEFAULT_MAX_RECORD_LEN: usize = 262_144;

const MIN_BUFFER_LEN: usize = 65_536;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampResolution {
    Micros,
    Nanos,
}

/// Link-layer framing of every record in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    /// Linux cooked capture, what `tcpdump -i any` writes.
    LinuxSll,
    LinuxSll2,
    Raw,
    Other(u32),
}

impl LinkType {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => LinkType::Ethernet,
            101 => LinkType::Raw,
            113 => LinkType::LinuxSll,
            276 => LinkType::LinuxSll2,
            other => LinkType::Other(other),
        }
    }
}

/// The parts of the pcap global header the capture loop needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalHeader {
    pub byte_order: ByteOrder,
    pub resolution: TimestampResolution,
    pub version: (u16, u16),
    pub snaplen: u32,
    pub link_type: LinkType,
}

impl From<&PcapHeader> for GlobalHeader {
    fn from(header: &PcapHeader) -> Self {
        // The upper bits of the link type field may carry FCS information.
        let link_type = (header.network.0 as u32) & 0x0FFF_FFFF;
        GlobalHeader {
            byte_order: if header.is_bigendian() {
                ByteOrder::Big
            } else {
                ByteOrder::Little
            },
            resolution: if header.is_nanosecond_precision() {
                TimestampResolution::Nanos
            } else {
                TimestampResolution::Micros
            },
            version: (header.version_major, header.version_minor),
            snaplen: header.snaplen,
            link_type: LinkType::from_code(link_type),
        }
    }
}

impl GlobalHeader {
    /// Record timestamp; `ts_frac` is in the stream's resolution.
    pub fn timestamp(&self, ts_sec: u32, ts_frac: u32) -> DateTime<Utc> {
        let nanos = match self.resolution {
            TimestampResolution::Micros => ts_frac.saturating_mul(1_000),
            TimestampResolution::Nanos => ts_frac,
        };
        DateTime::from_timestamp(i64::from(ts_sec), nanos).unwrap_or_default()
    }
}

type HeaderThenStream<R> = io::Chain<Cursor<[u8; GLOBAL_HEADER_LEN]>, R>;

/// Pull reader over a pcap byte stream.
///
/// Consumed bytes are only reclaimed by `refill`: a shifted empty buffer
/// reads as end of stream to the parser.
pub struct PcapStreamReader<R: Read> {
    reader: LegacyPcapReader<HeaderThenStream<R>>,
    header: GlobalHeader,
    max_record_len: usize,
    records: u64,
}

impl<R: Read> PcapStreamReader<R> {
    /// Consumes the global header from `reader`.
    ///
    /// The header is read in full before the parser sees it, so a short
    /// first read from a pipe is not mistaken for a broken stream.
    pub fn open(mut reader: R, max_record_len: usize) -> Result<Self, CaptureError> {
        let mut raw = [0u8; GLOBAL_HEADER_LEN];
        match reader.read_exact(&mut raw) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(CaptureError::EmptyStream)
            }
            Err(e) => return Err(e.into()),
        }

        let capacity = (max_record_len + RECORD_HEADER_LEN).max(MIN_BUFFER_LEN);
        let mut reader =
            LegacyPcapReader::new(capacity, Cursor::new(raw).chain(reader)).map_err(format_error)?;

        let header = loop {
            match reader.next() {
                Ok((offset, PcapBlockOwned::LegacyHeader(header))) => {
                    let header = GlobalHeader::from(&header);
                    reader.consume_noshift(offset);
                    break header;
                }
                Ok((offset, _)) => reader.consume_noshift(offset),
                Err(PcapError::Incomplete(_)) => reader.refill().map_err(format_error)?,
                Err(PcapError::Eof) | Err(PcapError::UnexpectedEof) => {
                    return Err(CaptureError::EmptyStream)
                }
                Err(e) => return Err(format_error(e)),
            }
        };
        debug!(?header, "pcap global header");

        Ok(PcapStreamReader {
            reader,
            header,
            max_record_len,
            records: 0,
        })
    }

    pub fn header(&self) -> &GlobalHeader {
        &self.header
    }

    pub fn link_type(&self) -> LinkType {
        self.header.link_type
    }

    /// Records read so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Reads the next record. `Ok(None)` means the stream ended.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        loop {
            match self.reader.next() {
                Ok((offset, PcapBlockOwned::Legacy(block))) => {
                    check_record_len(block.data.len(), self.max_record_len)?;
                    let frame = RawFrame::with_timestamp(
                        Bytes::copy_from_slice(block.data),
                        self.header.timestamp(block.ts_sec, block.ts_usec),
                        block.origlen,
                    );
                    self.reader.consume_noshift(offset);
                    self.records += 1;
                    return Ok(Some(frame));
                }
                Ok((offset, _)) => self.reader.consume_noshift(offset),
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::UnexpectedEof) => {
                    debug!(records = self.records, "capture stream ended inside a record");
                    return Ok(None);
                }
                Err(PcapError::Incomplete(needed)) => {
                    // A desynchronised stream announces records that never fit.
                    let pending = self.reader.data().len() + needed;
                    check_record_len(pending.saturating_sub(RECORD_HEADER_LEN), self.max_record_len)?;
                    self.reader.refill().map_err(format_error)?;
                }
                Err(e) => return Err(format_error(e)),
            }
        }
    }
}

fn check_record_len(len: usize, max: usize) -> Result<(), CaptureError> {
    if len > max {
        return Err(CaptureError::RecordTooLarge { len, max });
    }
    Ok(())
}

fn format_error<E: std::fmt::Display>(e: E) -> CaptureError {
    CaptureError::Format(e.to_string())
}

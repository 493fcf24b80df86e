// mqscope-engine/src/capture_loop.rs

/*!
# Capture Loop

Single-threaded pull loop over a pcap byte stream. Every record is read,
dissected down to its TCP payload, split into MQTT packets and handed to
a [`PacketSink`] before the next record is read.

The loop ends when the stream runs dry or the shared termination flag is
raised; both are normal stops. MQTT packets that straddle two TCP
segments are not reassembled.
*/

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use mqscope_capture::{
    CaptureError, Direction, FrameExtractor, PcapStreamReader, RawFrame,
};
use mqscope_protocols::{MqttFrames, MqttPacket, MqttParser};
use mqscope_telemetry::MetricsRecorder;

use crate::sink::PacketSink;

/// A decoded packet together with where and when it was seen.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPacket {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub src_port: u16,
    pub dst_port: u16,
    /// Offset of the packet inside its TCP payload.
    pub offset: usize,
    pub packet: MqttPacket,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames: u64,
    pub frames_with_payload: u64,
    pub frames_skipped: u64,
    pub packets: u64,
}

pub struct CaptureLoop<R: Read> {
    reader: PcapStreamReader<R>,
    extractor: FrameExtractor,
    parser: MqttParser,
    broker_port: u16,
    terminate: Arc<AtomicBool>,
    metrics: Option<MetricsRecorder>,
    stats: CaptureStats,
}

impl<R: Read> CaptureLoop<R> {
    /// Reads the pcap global header from `stream` and prepares the loop.
    pub fn open(
        stream: R,
        broker_port: u16,
        max_record_len: usize,
        terminate: Arc<AtomicBool>,
    ) -> Result<Self, CaptureError> {
        let reader = PcapStreamReader::open(stream, max_record_len)?;
        let extractor = FrameExtractor::new(reader.link_type());
        info!(link_type = ?reader.link_type(), broker_port, "capture stream opened");

        Ok(CaptureLoop {
            reader,
            extractor,
            parser: MqttParser::new(),
            broker_port,
            terminate,
            metrics: None,
            stats: CaptureStats::default(),
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Runs until end of stream or termination.
    pub fn run<S: PacketSink>(&mut self, sink: &mut S) -> Result<CaptureStats, CaptureError> {
        while !self.terminate.load(Ordering::SeqCst) {
            let Some(frame) = self.reader.next_frame()? else {
                debug!("capture stream ended");
                break;
            };
            self.process_frame(&frame, sink);
        }
        Ok(self.stats)
    }

    /// Decodes every MQTT packet in one captured frame.
    pub fn process_frame<S: PacketSink>(&mut self, frame: &RawFrame, sink: &mut S) {
        self.stats.frames += 1;
        if let Some(metrics) = &self.metrics {
            metrics.inc_frames_captured();
        }

        let segment = match self.extractor.extract(frame) {
            Ok(segment) => segment,
            Err(e) => {
                debug!(error = %e, len = frame.data.len(), "skipping frame");
                self.stats.frames_skipped += 1;
                if let Some(metrics) = &self.metrics {
                    metrics.inc_frames_skipped();
                }
                return;
            }
        };

        if segment.payload.is_empty() {
            trace!(
                src_port = segment.src_port,
                dst_port = segment.dst_port,
                tcp_flags = segment.tcp_flags,
                "segment without payload"
            );
            return;
        }
        self.stats.frames_with_payload += 1;

        let direction = segment.direction(self.broker_port);
        for framed in MqttFrames::new(self.parser, &segment.payload) {
            self.stats.packets += 1;
            if let Some(metrics) = &self.metrics {
                metrics.inc_packets_decoded(framed.packet.packet_type().name());
            }
            sink.deliver(CapturedPacket {
                timestamp: frame.timestamp,
                direction,
                src_port: segment.src_port,
                dst_port: segment.dst_port,
                offset: framed.offset,
                packet: framed.packet,
            });
        }
    }
}

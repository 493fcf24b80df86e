//! ## mqscope-telemetry::metrics
//! **Prometheus counters for the capture pipeline**

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub frames_captured: IntCounter,
    pub frames_skipped: IntCounter,
    pub packets_decoded: IntCounterVec,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let frames_captured =
            IntCounter::new("mqscope_frames_total", "Capture records read from the stream")?;
        let frames_skipped = IntCounter::new(
            "mqscope_frames_skipped_total",
            "Frames that did not contain a TCP payload",
        )?;
        let packets_decoded = IntCounterVec::new(
            Opts::new("mqscope_packets_total", "Decoded MQTT control packets"),
            &["packet_type"],
        )?;

        registry.register(Box::new(frames_captured.clone()))?;
        registry.register(Box::new(frames_skipped.clone()))?;
        registry.register(Box::new(packets_decoded.clone()))?;

        Ok(Self {
            registry,
            frames_captured,
            frames_skipped,
            packets_decoded,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn inc_frames_captured(&self) {
        self.frames_captured.inc();
    }

    pub fn inc_frames_skipped(&self) {
        self.frames_skipped.inc();
    }

    pub fn inc_packets_decoded(&self, packet_type: &str) {
        self.packets_decoded.with_label_values(&[packet_type]).inc();
    }
}

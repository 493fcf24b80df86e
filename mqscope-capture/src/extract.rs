//! # Frame extraction
//!
//! Walks link, IP and TCP headers of a captured frame with `etherparse`.
//! Header lengths come from the frames themselves (IPv4 IHL, TCP data
//! offset), so options are skipped correctly. IPv6 extension headers are
//! not followed.

use etherparse::err::{ipv4, ipv6, linux_sll, tcp};
use etherparse::{
    Ethernet2HeaderSlice, IpNumber, Ipv4HeaderSlice, Ipv6HeaderSlice, LinuxSllHeaderSlice,
    TcpHeaderSlice,
};

use crate::error::ExtractError;
use crate::packet::{RawFrame, TransportSegment};
use crate::stream::LinkType;

/// Linux cooked v2 header; not covered by etherparse.
const LINUX_SLL2_HEADER_LEN: usize = 20;

#[derive(Clone, Copy, Debug)]
pub struct FrameExtractor {
    link_type: LinkType,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(LinkType::Ethernet)
    }
}

impl FrameExtractor {
    pub fn new(link_type: LinkType) -> Self {
        Self { link_type }
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// Locates the TCP header and payload of `frame`.
    ///
    /// The payload runs to the end of the frame and is a zero-copy slice
    /// of `frame.data`.
    pub fn extract(&self, frame: &RawFrame) -> Result<TransportSegment, ExtractError> {
        let data = &frame.data[..];

        let ip_start = self.link_header_len(data)?;
        let ip = data.get(ip_start..).unwrap_or_default();
        let version_ihl = *ip.first().ok_or(ExtractError::Truncated("IP"))?;

        let (ip_header_len, protocol) = match version_ihl >> 4 {
            4 => match Ipv4HeaderSlice::from_slice(ip) {
                Ok(header) => (header.slice().len(), header.protocol()),
                Err(ipv4::HeaderSliceError::Len(_)) => return Err(ExtractError::Truncated("IPv4")),
                Err(ipv4::HeaderSliceError::Content(_)) => {
                    return Err(ExtractError::BadHeaderLength {
                        layer: "IPv4",
                        len: usize::from(version_ihl & 0x0F) * 4,
                    })
                }
            },
            6 => match Ipv6HeaderSlice::from_slice(ip) {
                Ok(header) => (header.slice().len(), header.next_header()),
                Err(ipv6::HeaderSliceError::Len(_)) => return Err(ExtractError::Truncated("IPv6")),
                Err(ipv6::HeaderSliceError::Content(_)) => {
                    return Err(ExtractError::UnsupportedIpVersion(6))
                }
            },
            version => return Err(ExtractError::UnsupportedIpVersion(version)),
        };

        if protocol != IpNumber::TCP {
            return Err(ExtractError::NotTcp(protocol.0));
        }

        let tcp_start = ip_start + ip_header_len;
        let tcp_bytes = data.get(tcp_start..).unwrap_or_default();
        let header = match TcpHeaderSlice::from_slice(tcp_bytes) {
            Ok(header) => header,
            Err(tcp::HeaderSliceError::Len(_)) => return Err(ExtractError::Truncated("TCP")),
            Err(tcp::HeaderSliceError::Content(_)) => {
                return Err(ExtractError::BadHeaderLength {
                    layer: "TCP",
                    len: tcp_bytes.get(12).map_or(0, |b| usize::from(b >> 4) * 4),
                })
            }
        };

        let tcp_header = header.slice();
        let payload_start = tcp_start + tcp_header.len();

        Ok(TransportSegment {
            src_port: header.source_port(),
            dst_port: header.destination_port(),
            tcp_flags: tcp_header[13],
            payload: frame.data.slice(payload_start..),
        })
    }

    /// Bytes in front of the IP header. Unknown link types are read as Ethernet.
    fn link_header_len(&self, data: &[u8]) -> Result<usize, ExtractError> {
        match self.link_type {
            LinkType::Ethernet | LinkType::Other(_) => Ethernet2HeaderSlice::from_slice(data)
                .map(|header| header.slice().len())
                .map_err(|_| ExtractError::Truncated("Ethernet")),
            LinkType::LinuxSll => match LinuxSllHeaderSlice::from_slice(data) {
                Ok(header) => Ok(header.slice().len()),
                Err(linux_sll::HeaderSliceError::Len(_)) => {
                    Err(ExtractError::Truncated("Linux SLL"))
                }
                Err(linux_sll::HeaderSliceError::Content(_)) => {
                    Err(ExtractError::Malformed("Linux SLL"))
                }
            },
            LinkType::LinuxSll2 if data.len() < LINUX_SLL2_HEADER_LEN => {
                Err(ExtractError::Truncated("Linux SLL2"))
            }
            LinkType::LinuxSll2 => Ok(LINUX_SLL2_HEADER_LEN),
            LinkType::Raw => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPPROTO_TCP: u8 = 6;
    const TCP_PSH_ACK: u8 = 0x18;

    /// IPv4 (no options) + TCP (no options) around `payload`.
    fn ipv4_tcp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let total_len = (20 + 20 + payload.len()) as u16;
        let mut packet = vec![0x45, 0x00];
        packet.extend_from_slice(&total_len.to_be_bytes());
        packet.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 0x40, IPPROTO_TCP, 0x00, 0x00]);
        packet.extend_from_slice(&[127, 0, 0, 1, 127, 0, 0, 1]);

        packet.extend_from_slice(&src_port.to_be_bytes());
        packet.extend_from_slice(&dst_port.to_be_bytes());
        packet.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1]);
        packet.extend_from_slice(&[0x50, TCP_PSH_ACK, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00]);

        packet.extend_from_slice(payload);
        packet
    }

    fn ethernet_ipv4_tcp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&[0x08, 0x00]);
        frame.extend_from_slice(&ipv4_tcp(src_port, dst_port, payload));
        frame
    }

    /// Linux cooked v1 header as `tcpdump -i any` writes it for Ethernet devices.
    fn linux_sll(packet: &[u8]) -> Vec<u8> {
        let mut frame = vec![0x00, 0x00, 0x00, 0x01, 0x00, 0x06];
        frame.extend_from_slice(&[0x02, 0x42, 0xAC, 0x11, 0x00, 0x02, 0x00, 0x00]);
        frame.extend_from_slice(&[0x08, 0x00]);
        frame.extend_from_slice(packet);
        frame
    }

    #[test]
    fn test_extract_pingreq() {
        let frame = RawFrame::new(ethernet_ipv4_tcp(51000, 1883, &[0xC0, 0x00]));
        let segment = FrameExtractor::default().extract(&frame).unwrap();
        assert_eq!(segment.src_port, 51000);
        assert_eq!(segment.dst_port, 1883);
        assert_eq!(segment.tcp_flags, TCP_PSH_ACK);
        assert_eq!(&segment.payload[..], &[0xC0, 0x00]);
    }

    #[test]
    fn test_extract_honours_header_options() {
        let mut raw = ethernet_ipv4_tcp(1883, 40000, &[]);
        // IHL 6: one word of IP options.
        raw[14] = 0x46;
        raw.splice(34..34, [0x01, 0x01, 0x01, 0x00]);
        // TCP data offset 8: twelve bytes of options.
        raw[34 + 4 + 12] = 0x80;
        raw.extend_from_slice(&[0x01; 12]);
        raw.extend_from_slice(&[0xD0, 0x00]);

        let segment = FrameExtractor::default()
            .extract(&RawFrame::new(raw))
            .unwrap();
        assert_eq!(segment.src_port, 1883);
        assert_eq!(&segment.payload[..], &[0xD0, 0x00]);
    }

    #[test]
    fn test_extract_empty_payload() {
        let frame = RawFrame::new(ethernet_ipv4_tcp(1883, 40000, &[]));
        let segment = FrameExtractor::default().extract(&frame).unwrap();
        assert!(segment.payload.is_empty());
    }

    #[test]
    fn test_payload_runs_to_end_of_padded_frame() {
        // PUBLISH "t" "hi", padded by the link layer to a 4 byte boundary.
        let publish = [0x30, 0x05, 0x00, 0x01, b't', b'h', b'i'];
        let mut raw = ethernet_ipv4_tcp(40000, 1883, &publish);
        raw.extend_from_slice(&[0u8; 4]);

        let segment = FrameExtractor::default()
            .extract(&RawFrame::new(raw))
            .unwrap();
        assert_eq!(&segment.payload[..publish.len()], &publish);
        assert_eq!(segment.payload.len(), publish.len() + 4);
    }

    #[test]
    fn test_extract_linux_cooked() {
        // QoS 3 PUBLISH followed by PINGRESP in one segment.
        let payload = [0x36, 0x05, 0x00, 0x01, b't', 0x00, 0x07, 0xD0, 0x00];
        let raw = linux_sll(&ipv4_tcp(1883, 40000, &payload));
        let segment = FrameExtractor::new(LinkType::LinuxSll)
            .extract(&RawFrame::new(raw))
            .unwrap();
        assert_eq!(segment.src_port, 1883);
        assert_eq!(&segment.payload[..], &payload);
    }

    #[test]
    fn test_extract_linux_cooked_v2_and_raw_ip() {
        let mut sll2 = vec![0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02];
        sll2.extend_from_slice(&[0x00, 0x01, 0x00, 0x06]);
        sll2.extend_from_slice(&[0u8; 8]);
        sll2.extend_from_slice(&ipv4_tcp(40000, 1883, &[0xE0, 0x00]));
        let segment = FrameExtractor::new(LinkType::LinuxSll2)
            .extract(&RawFrame::new(sll2))
            .unwrap();
        assert_eq!(&segment.payload[..], &[0xE0, 0x00]);

        let raw = ipv4_tcp(40000, 1883, &[0xC0, 0x00]);
        let segment = FrameExtractor::new(LinkType::Raw)
            .extract(&RawFrame::new(raw))
            .unwrap();
        assert_eq!(&segment.payload[..], &[0xC0, 0x00]);

        assert_eq!(
            FrameExtractor::new(LinkType::LinuxSll2).extract(&RawFrame::new(vec![0u8; 12])),
            Err(ExtractError::Truncated("Linux SLL2"))
        );
    }

    #[test]
    fn test_extract_ipv6() {
        let mut raw = vec![0u8; 12];
        raw.extend_from_slice(&[0x86, 0xDD]);
        raw.extend_from_slice(&[0x60, 0, 0, 0, 0, 22, IPPROTO_TCP, 64]);
        raw.extend_from_slice(&[0u8; 32]);
        raw.extend_from_slice(&ipv4_tcp(40000, 1883, &[0xC0, 0x00])[20..]);
        let segment = FrameExtractor::default()
            .extract(&RawFrame::new(raw))
            .unwrap();
        assert_eq!(segment.dst_port, 1883);
        assert_eq!(&segment.payload[..], &[0xC0, 0x00]);
    }

    #[test]
    fn test_extract_rejects_udp() {
        let mut raw = ethernet_ipv4_tcp(40000, 1883, &[]);
        raw[14 + 9] = 17;
        assert_eq!(
            FrameExtractor::default().extract(&RawFrame::new(raw)),
            Err(ExtractError::NotTcp(17))
        );
    }

    #[test]
    fn test_extract_truncated_frames() {
        let extractor = FrameExtractor::default();
        assert_eq!(
            extractor.extract(&RawFrame::new(vec![0u8; 10])),
            Err(ExtractError::Truncated("Ethernet"))
        );
        assert_eq!(
            extractor.extract(&RawFrame::new(vec![0u8; 14])),
            Err(ExtractError::Truncated("IP"))
        );

        let raw = ethernet_ipv4_tcp(40000, 1883, &[]);
        assert_eq!(
            extractor.extract(&RawFrame::new(raw[..30].to_vec())),
            Err(ExtractError::Truncated("IPv4"))
        );
        assert_eq!(
            extractor.extract(&RawFrame::new(raw[..40].to_vec())),
            Err(ExtractError::Truncated("TCP"))
        );
        assert_eq!(
            FrameExtractor::new(LinkType::LinuxSll).extract(&RawFrame::new(vec![0u8; 8])),
            Err(ExtractError::Truncated("Linux SLL"))
        );
    }

    #[test]
    fn test_extract_bad_lengths() {
        let extractor = FrameExtractor::default();

        let mut raw = ethernet_ipv4_tcp(40000, 1883, &[]);
        raw[14] = 0x44;
        assert_eq!(
            extractor.extract(&RawFrame::new(raw)),
            Err(ExtractError::BadHeaderLength {
                layer: "IPv4",
                len: 16
            })
        );

        let mut raw = ethernet_ipv4_tcp(40000, 1883, &[]);
        raw[14] = 0x25;
        assert_eq!(
            extractor.extract(&RawFrame::new(raw)),
            Err(ExtractError::UnsupportedIpVersion(2))
        );

        let mut raw = ethernet_ipv4_tcp(40000, 1883, &[]);
        raw[34 + 12] = 0x40;
        assert_eq!(
            extractor.extract(&RawFrame::new(raw)),
            Err(ExtractError::BadHeaderLength {
                layer: "TCP",
                len: 16
            })
        );

        let mut raw = ethernet_ipv4_tcp(40000, 1883, &[]);
        raw[34 + 12] = 0xF0;
        assert_eq!(
            extractor.extract(&RawFrame::new(raw)),
            Err(ExtractError::Truncated("TCP"))
        );
    }
}

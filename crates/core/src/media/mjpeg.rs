//! MJPEG RTP packetizer — RFC 2435.
//!
//! - Each JPEG frame maps to one or more RTP packets.
//! - RTP payload starts with an 8-byte JPEG-specific header
//!   (type, Q, width, height, fragment offset).
//! - Only the entropy-coded scan data is sent; the receiver rebuilds the
//!   JFIF markers (see [`super::jfif`]).
//! - Uses static payload type 26: `a=rtpmap:26 JPEG/90000`

use super::jpeg::{
    DEFAULT_TYPE_SPECIFIC, JpegPayloadHeader, MAX_FRAGMENT_OFFSET, Q_INBAND_MIN,
    QuantizationTableHeader,
};
use super::rtp::{RTP_HEADER_LEN, RtpSequencer};

/// Static RTP payload type for JPEG (RFC 3551 §6).
pub const JPEG_PAYLOAD_TYPE: u8 = 26;

const DEFAULT_MTU: usize = 1400;

/// One frame's worth of RTP/JPEG input: scan data plus the parameters the
/// receiver needs to rebuild the JFIF header.
#[derive(Debug, Clone)]
pub struct ScanFrame {
    pub jpeg_type: u8,
    pub q: u8,
    pub width_blocks: u8,
    pub height_blocks: u8,
    /// Tables to send in-band. Only used when `q >= 128`; at most
    /// [`MAX_TABLE_LEN`](super::jpeg::MAX_TABLE_LEN) bytes are sent.
    pub qtables: Option<Vec<u8>>,
    /// Entropy-coded scan data (everything between SOS and EOI).
    pub scan: Vec<u8>,
}

/// RTP/JPEG packetizer (RFC 2435 §3).
///
/// Splits scan data into MTU-sized fragments. The first packet carries the
/// quantization table header when the frame uses in-band tables; the last
/// packet has the RTP marker bit set.
#[derive(Debug)]
pub struct JpegPacketizer {
    header: RtpSequencer,
    mtu: usize,
}

impl JpegPacketizer {
    pub fn new(pt: u8, ssrc: u32) -> Self {
        Self {
            header: RtpSequencer::new(pt, ssrc),
            mtu: DEFAULT_MTU,
        }
    }

    /// Create with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8) -> Self {
        Self {
            header: RtpSequencer::with_random_ssrc(pt),
            mtu: DEFAULT_MTU,
        }
    }

    /// Maximum size of a packet payload (excluding the RTP header).
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Sequence number the next packet will carry.
    pub fn next_sequence(&self) -> u16 {
        self.header.sequence()
    }

    /// Packetize one frame and advance the RTP timestamp afterwards.
    ///
    /// Scan data beyond the 24-bit fragment offset range is not sent.
    pub fn packetize(&mut self, frame: &ScanFrame, timestamp_increment: u32) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        let scan_len = frame.scan.len().min(MAX_FRAGMENT_OFFSET as usize + 1);
        let mut offset = 0usize;

        loop {
            let quantization = match &frame.qtables {
                Some(table) if offset == 0 && frame.q >= Q_INBAND_MIN => {
                    Some(QuantizationTableHeader {
                        mbz: 0,
                        precision: 0,
                        table: table.clone(),
                    })
                }
                _ => None,
            };

            let jpeg = JpegPayloadHeader {
                type_specific: DEFAULT_TYPE_SPECIFIC,
                fragment_offset: offset as u32,
                jpeg_type: frame.jpeg_type,
                q: frame.q,
                width_blocks: frame.width_blocks,
                height_blocks: frame.height_blocks,
                quantization,
            };

            let room = self.mtu.saturating_sub(jpeg.encoded_len()).max(1);
            let chunk = room.min(scan_len - offset);
            let last = offset + chunk >= scan_len;

            let mut packet = Vec::with_capacity(RTP_HEADER_LEN + jpeg.encoded_len() + chunk);
            self.header.next_header(last).write_to(&mut packet);
            jpeg.write_to(&mut packet);
            packet.extend_from_slice(&frame.scan[offset..offset + chunk]);
            packets.push(packet);

            offset += chunk;
            if last {
                break;
            }
        }

        self.header.advance_timestamp(timestamp_increment);

        tracing::trace!(
            rtp_packets = packets.len(),
            scan_bytes = scan_len,
            seq = self.header.sequence(),
            ts = self.header.timestamp(),
            "frame packetized"
        );

        packets
    }
}

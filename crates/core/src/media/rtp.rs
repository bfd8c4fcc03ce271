use crate::codec::{read_be16, read_be32, write_be16, write_be32};
use crate::error::{ParseErrorKind, Result};

/// RTP protocol version carried in every header (RFC 3550 §5.1).
pub const RTP_VERSION: u8 = 2;

/// Length of the fixed RTP header. CSRC lists and extensions are not parsed.
pub const RTP_HEADER_LEN: usize = 12;

/// RTP fixed header (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The padding and extension flags and the CSRC count are decoded but not
/// acted upon: the header is always treated as exactly 12 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    /// CSRC count (4-bit).
    pub csrc_count: u8,
    /// Set on the last packet of a frame.
    pub marker: bool,
    /// RTP payload type (7-bit, RFC 3551). JPEG is statically 26.
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
}

impl Default for RtpHeader {
    fn default() -> Self {
        Self {
            version: RTP_VERSION,
            padding: false,
            extension: false,
            csrc_count: 0,
            marker: false,
            payload_type: 0,
            sequence: 0,
            timestamp: 0,
            ssrc: 0,
        }
    }
}

impl RtpHeader {
    /// Parse the fixed header starting at `start`.
    ///
    /// Returns the header and the number of bytes consumed (always
    /// [`RTP_HEADER_LEN`]).
    pub fn parse(buf: &[u8], start: usize) -> Result<(Self, usize)> {
        if buf.len().saturating_sub(start) < RTP_HEADER_LEN {
            return Err(ParseErrorKind::TruncatedHeader.into());
        }

        let b0 = buf[start];
        let b1 = buf[start + 1];

        let version = b0 >> 6 & 0x03;
        if version != RTP_VERSION {
            return Err(ParseErrorKind::UnsupportedVersion.into());
        }

        let header = Self {
            version,
            padding: b0 >> 5 & 0x01 == 1,
            extension: b0 >> 4 & 0x01 == 1,
            csrc_count: b0 & 0x0f,
            marker: b1 >> 7 & 0x01 == 1,
            payload_type: b1 & 0x7f,
            sequence: read_be16(buf, start + 2),
            timestamp: read_be32(buf, start + 4),
            ssrc: read_be32(buf, start + 8),
        };

        Ok((header, RTP_HEADER_LEN))
    }

    /// Append the 12-byte wire form of this header to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(
            (self.version << 6 & 0xc0)
                | ((self.padding as u8) << 5)
                | ((self.extension as u8) << 4)
                | (self.csrc_count & 0x0f),
        );
        buf.push(((self.marker as u8) << 7) | (self.payload_type & 0x7f));
        write_be16(buf, self.sequence);
        write_be32(buf, self.timestamp);
        write_be32(buf, self.ssrc);
    }

    /// Serialize to a standalone 12-byte buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RTP_HEADER_LEN);
        self.write_to(&mut buf);
        buf
    }
}

/// Outgoing RTP header state for one stream.
///
/// - **Sequence number**: 16-bit, wrapping — incremented on every packet.
/// - **Timestamp**: stored as u64 internally; the lower 32 bits go on the wire.
/// - **SSRC**: randomly generated per RFC 3550 §8.1 unless given explicitly.
#[derive(Debug)]
pub struct RtpSequencer {
    /// RTP payload type (7-bit, RFC 3551).
    pub pt: u8,
    pub ssrc: u32,
    sequence: u16,
    timestamp: u64,
}

impl RtpSequencer {
    pub fn new(pt: u8, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP sequencer created"
        );
        Self {
            pt,
            ssrc,
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Create with a random SSRC.
    pub fn with_random_ssrc(pt: u8) -> Self {
        Self::new(pt, rand::random::<u32>())
    }

    /// Sequence number the next [`next_header`](Self::next_header) call will use.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Produce the header for the next packet and advance the sequence number.
    pub fn next_header(&mut self, marker: bool) -> RtpHeader {
        let header = RtpHeader {
            marker,
            payload_type: self.pt,
            sequence: self.sequence,
            timestamp: self.timestamp as u32,
            ssrc: self.ssrc,
            ..RtpHeader::default()
        };
        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// Advance the RTP timestamp, e.g. by `90000 / fps` per frame.
    pub fn advance_timestamp(&mut self, increment: u32) {
        self.timestamp = self.timestamp.wrapping_add(increment as u64);
    }
}

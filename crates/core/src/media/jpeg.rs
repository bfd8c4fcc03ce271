use crate::codec::{read_be16, read_be24, write_be16};
use crate::error::{ParseErrorKind, Result};

/// Length of the main RTP/JPEG header.
pub const JPEG_HEADER_LEN: usize = 8;

/// Length of the quantization table header preceding in-band table data.
pub const QUANT_HEADER_LEN: usize = 4;

/// The only supported type-specific value (progressive, not interlaced).
pub const DEFAULT_TYPE_SPECIFIC: u8 = 0;

/// JPEG types in this range signal a restart marker header.
pub const RESTART_TYPES: std::ops::RangeInclusive<u8> = 64..=127;

/// Q values at or above this carry in-band quantization tables.
pub const Q_INBAND_MIN: u8 = 128;

/// Largest value `fragment_offset` can hold on the wire.
pub const MAX_FRAGMENT_OFFSET: u32 = 0x00ff_ffff;

/// Largest in-band table payload the 16-bit length field can describe.
pub const MAX_TABLE_LEN: usize = u16::MAX as usize;

/// RTP/JPEG main header (RFC 2435 §3.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Type-specific |              Fragment Offset                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      Type     |       Q       |     Width     |     Height    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// When `fragment_offset == 0` and `q >= 128` the header is followed by a
/// [`QuantizationTableHeader`] (RFC 2435 §3.1.8) and the table bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegPayloadHeader {
    pub type_specific: u8,
    /// Byte offset of this fragment within the frame's scan data (24-bit).
    pub fragment_offset: u32,
    /// Decoder parameter id; 0 and 1 select 4:2:2 and 4:2:0 sampling.
    pub jpeg_type: u8,
    /// Quality factor (1..=99) or, for 128..=255, an in-band table id.
    pub q: u8,
    /// Frame width in 8-pixel blocks.
    pub width_blocks: u8,
    /// Frame height in 8-pixel blocks.
    pub height_blocks: u8,
    pub quantization: Option<QuantizationTableHeader>,
}

/// In-band quantization table header (RFC 2435 §3.1.8).
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      MBZ      |   Precision   |             Length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                    Quantization Table Data                    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTableHeader {
    pub mbz: u8,
    pub precision: u8,
    /// Raw table bytes, luma first then chroma, in zig-zag order.
    pub table: Vec<u8>,
}

impl JpegPayloadHeader {
    /// Parse the payload header starting at `start`.
    ///
    /// Returns the header and the number of bytes consumed: 8, or
    /// `8 + 4 + table length` when an in-band table is present.
    pub fn parse(buf: &[u8], start: usize) -> Result<(Self, usize)> {
        let available = buf.len().saturating_sub(start);
        if available < JPEG_HEADER_LEN {
            return Err(ParseErrorKind::TruncatedHeader.into());
        }

        let type_specific = buf[start];
        let fragment_offset = read_be24(buf, start + 1);
        let jpeg_type = buf[start + 4];
        let q = buf[start + 5];
        let width_blocks = buf[start + 6];
        let height_blocks = buf[start + 7];

        if type_specific != DEFAULT_TYPE_SPECIFIC {
            return Err(ParseErrorKind::UnsupportedTypeSpecifier.into());
        }
        if RESTART_TYPES.contains(&jpeg_type) {
            return Err(ParseErrorKind::UnsupportedRestartMarkers.into());
        }

        let mut consumed = JPEG_HEADER_LEN;
        let mut quantization = None;

        // Tables only travel with the first fragment of a frame.
        if fragment_offset == 0 && q >= Q_INBAND_MIN {
            if available - consumed < QUANT_HEADER_LEN {
                return Err(ParseErrorKind::TruncatedQuantizationHeader.into());
            }
            let qh = start + consumed;
            let mbz = buf[qh];
            let precision = buf[qh + 1];
            let length = read_be16(buf, qh + 2) as usize;
            consumed += QUANT_HEADER_LEN;

            if available - consumed < length {
                return Err(ParseErrorKind::TruncatedQuantizationTable.into());
            }
            let table = buf[start + consumed..start + consumed + length].to_vec();
            consumed += length;

            quantization = Some(QuantizationTableHeader {
                mbz,
                precision,
                table,
            });
        }

        Ok((
            Self {
                type_specific,
                fragment_offset,
                jpeg_type,
                q,
                width_blocks,
                height_blocks,
                quantization,
            },
            consumed,
        ))
    }

    /// Append the wire form of this header (and any table header) to `buf`.
    ///
    /// `fragment_offset` is truncated to 24 bits and table data to
    /// [`MAX_TABLE_LEN`] bytes.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.type_specific);
        buf.extend_from_slice(&self.fragment_offset.to_be_bytes()[1..]);
        buf.push(self.jpeg_type);
        buf.push(self.q);
        buf.push(self.width_blocks);
        buf.push(self.height_blocks);

        if let Some(qt) = &self.quantization {
            buf.push(qt.mbz);
            buf.push(qt.precision);
            let len = qt.table.len().min(MAX_TABLE_LEN);
            write_be16(buf, len as u16);
            buf.extend_from_slice(&qt.table[..len]);
        }
    }

    /// Encoded length including any quantization table header.
    pub fn encoded_len(&self) -> usize {
        JPEG_HEADER_LEN
            + self
                .quantization
                .as_ref()
                .map_or(0, |qt| QUANT_HEADER_LEN + qt.table.len().min(MAX_TABLE_LEN))
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u16 {
        u16::from(self.width_blocks) * 8
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u16 {
        u16::from(self.height_blocks) * 8
    }

    /// In-band table bytes, if this packet carried any.
    pub fn table(&self) -> Option<&[u8]> {
        self.quantization.as_ref().map(|qt| qt.table.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_header(offset: u32, jpeg_type: u8, q: u8) -> Vec<u8> {
        let mut buf = vec![0];
        buf.extend_from_slice(&offset.to_be_bytes()[1..]);
        buf.extend_from_slice(&[jpeg_type, q, 0xa0, 0x5a]);
        buf
    }

    #[test]
    fn seven_bytes_is_truncated() {
        let buf = main_header(0, 1, 50);
        let err = JpegPayloadHeader::parse(&buf[..7], 0).unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::TruncatedHeader));
    }

    #[test]
    fn eight_bytes_without_tables() {
        let buf = main_header(0, 1, 50);
        let (h, consumed) = JpegPayloadHeader::parse(&buf, 0).unwrap();
        assert_eq!(consumed, 8);
        assert_eq!(h.fragment_offset, 0);
        assert_eq!(h.jpeg_type, 1);
        assert_eq!(h.q, 50);
        assert_eq!(h.width(), 1280);
        assert_eq!(h.height(), 720);
        assert!(h.quantization.is_none());
    }

    #[test]
    fn fragment_offset_is_24_bit_big_endian() {
        let buf = main_header(0x0b14, 0, 255);
        let (h, consumed) = JpegPayloadHeader::parse(&buf, 0).unwrap();
        assert_eq!(h.fragment_offset, 0x0b14);
        // Non-zero offset: no table header even though q >= 128.
        assert_eq!(consumed, 8);
    }

    #[test]
    fn rejects_type_specific() {
        let mut buf = main_header(0, 1, 50);
        buf[0] = 1;
        let err = JpegPayloadHeader::parse(&buf, 0).unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnsupportedTypeSpecifier));
    }

    #[test]
    fn rejects_restart_types() {
        for t in [64, 70, 127] {
            let buf = main_header(0, t, 50);
            let err = JpegPayloadHeader::parse(&buf, 0).unwrap_err();
            assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnsupportedRestartMarkers));
        }
        assert!(JpegPayloadHeader::parse(&main_header(0, 63, 50), 0).is_ok());
        assert!(JpegPayloadHeader::parse(&main_header(0, 128, 50), 0).is_ok());
    }

    #[test]
    fn inband_table_header() {
        let mut buf = main_header(0, 1, 255);
        buf.extend_from_slice(&[0, 0, 0, 64]);
        buf.extend((1..=64).map(|v| v as u8));
        buf.extend_from_slice(&[0xAB, 0xCD]);

        let (h, consumed) = JpegPayloadHeader::parse(&buf, 0).unwrap();
        assert_eq!(consumed, 8 + 4 + 64);
        let qt = h.quantization.as_ref().unwrap();
        assert_eq!(qt.mbz, 0);
        assert_eq!(qt.precision, 0);
        assert_eq!(qt.table.len(), 64);
        assert_eq!(qt.table[0], 1);
        assert_eq!(qt.table[63], 64);
        assert_eq!(&buf[consumed..], &[0xAB, 0xCD]);
    }

    #[test]
    fn truncated_table_header() {
        let mut buf = main_header(0, 1, 200);
        buf.extend_from_slice(&[0, 0, 0]);
        let err = JpegPayloadHeader::parse(&buf, 0).unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::TruncatedQuantizationHeader));
    }

    #[test]
    fn truncated_table_data() {
        let mut buf = main_header(0, 1, 200);
        buf.extend_from_slice(&[0, 0, 0, 128]);
        buf.extend(std::iter::repeat_n(1u8, 127));
        let err = JpegPayloadHeader::parse(&buf, 0).unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::TruncatedQuantizationTable));
    }

    #[test]
    fn zero_length_table() {
        let mut buf = main_header(0, 0, 128);
        buf.extend_from_slice(&[0, 0, 0, 0]);
        let (h, consumed) = JpegPayloadHeader::parse(&buf, 0).unwrap();
        assert_eq!(consumed, 12);
        assert_eq!(h.table(), Some(&[][..]));
    }

    #[test]
    fn write_matches_parse() {
        let h = JpegPayloadHeader {
            type_specific: 0,
            fragment_offset: 0,
            jpeg_type: 1,
            q: 255,
            width_blocks: 80,
            height_blocks: 60,
            quantization: Some(QuantizationTableHeader {
                mbz: 0,
                precision: 0,
                table: vec![7; 128],
            }),
        };
        let mut buf = Vec::new();
        h.write_to(&mut buf);
        assert_eq!(buf.len(), h.encoded_len());
        assert_eq!(JpegPayloadHeader::parse(&buf, 0).unwrap(), (h, 140));
    }

    #[test]
    fn oversized_table_is_clamped() {
        let h = JpegPayloadHeader {
            type_specific: 0,
            fragment_offset: 0,
            jpeg_type: 0,
            q: 200,
            width_blocks: 1,
            height_blocks: 1,
            quantization: Some(QuantizationTableHeader {
                mbz: 0,
                precision: 0,
                table: vec![1; MAX_TABLE_LEN + 100],
            }),
        };
        let mut buf = Vec::new();
        h.write_to(&mut buf);
        assert_eq!(buf.len(), h.encoded_len());
        assert_eq!(buf.len(), JPEG_HEADER_LEN + QUANT_HEADER_LEN + MAX_TABLE_LEN);
        assert_eq!(&buf[10..12], &[0xff, 0xff]);

        let (parsed, consumed) = JpegPayloadHeader::parse(&buf, 0).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed.table().map(<[u8]>::len), Some(MAX_TABLE_LEN));
    }
}

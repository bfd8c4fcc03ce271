//! JFIF header synthesis for RTP/JPEG frames (RFC 2435 Appendix A/B).
//!
//! RTP/JPEG strips every marker segment from the JPEG bitstream and only
//! transmits the entropy-coded scan data. A receiver rebuilds a decodable
//! file by prefixing the scan with:
//!
//! ```text
//! SOI  APP0(JFIF)  [DRI]  DQT  DHT  SOF0  SOS  <scan data>  EOI
//! ```
//!
//! Huffman tables are always the Annex K.3 defaults; quantization tables
//! come from the stream or from [`derive_default_tables`].

use crate::codec::write_be16;
use crate::media::tables::{
    AC_CHROMA_BITS, AC_CHROMA_VALUES, AC_LUMA_BITS, AC_LUMA_VALUES, DC_CHROMA_BITS, DC_LUMA_BITS,
    DC_VALUES, DEFAULT_QUANTIZERS,
};

/// Number of coefficients in one 8-bit quantization table.
pub const QTABLE_LEN: usize = 64;

/// JPEG marker codes used when rebuilding a frame (ITU-T T.81 Table B.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Marker {
    /// Start of frame, baseline DCT.
    Sof0 = 0xc0,
    /// Define Huffman tables.
    Dht = 0xc4,
    /// Start of image.
    Soi = 0xd8,
    /// End of image.
    Eoi = 0xd9,
    /// Start of scan.
    Sos = 0xda,
    /// Define quantization tables.
    Dqt = 0xdb,
    /// Define restart interval.
    Dri = 0xdd,
    /// JFIF application segment.
    App0 = 0xe0,
}

/// Append a two-byte marker (`0xFF`, code) to `buf`.
pub fn put_marker(buf: &mut Vec<u8>, marker: Marker) {
    buf.push(0xff);
    buf.push(marker as u8);
}

/// Build the JFIF header for a frame of `width_blocks` x `height_blocks`
/// 8-pixel blocks.
///
/// `qtables` holds one or more 64-byte tables back to back in zig-zag order;
/// each becomes one DQT entry with id 0, 1, ... Trailing bytes that do not
/// form a whole table are ignored. A DRI segment is written only when
/// `restart_interval` is non-zero.
///
/// `jpeg_type` 0 selects 4:2:2 sampling (luma 2x1), any other type 4:2:0
/// (luma 2x2). Chroma components are always 1x1.
pub fn build_header(
    jpeg_type: u8,
    width_blocks: u8,
    height_blocks: u8,
    qtables: &[u8],
    restart_interval: u16,
) -> Vec<u8> {
    let width = u16::from(width_blocks) << 3;
    let height = u16::from(height_blocks) << 3;
    let tables: Vec<&[u8]> = qtables.chunks_exact(QTABLE_LEN).collect();

    let mut buf = Vec::with_capacity(640 + tables.len() * (QTABLE_LEN + 1));

    put_marker(&mut buf, Marker::Soi);

    // JFIF 1.02, no density units, no thumbnail.
    put_marker(&mut buf, Marker::App0);
    write_be16(&mut buf, 16);
    buf.extend_from_slice(b"JFIF\0");
    buf.extend_from_slice(&[1, 2]);
    buf.push(0);
    write_be16(&mut buf, 1);
    write_be16(&mut buf, 1);
    buf.push(0);
    buf.push(0);

    if restart_interval != 0 {
        put_marker(&mut buf, Marker::Dri);
        write_be16(&mut buf, 4);
        write_be16(&mut buf, restart_interval);
    }

    put_marker(&mut buf, Marker::Dqt);
    write_be16(&mut buf, (2 + tables.len() * (1 + QTABLE_LEN)) as u16);
    for (id, table) in tables.iter().enumerate() {
        buf.push(id as u8);
        buf.extend_from_slice(table);
    }

    put_marker(&mut buf, Marker::Dht);
    let dht_len_pos = buf.len();
    write_be16(&mut buf, 0);
    let mut dht_len = 2;
    dht_len += put_huffman_table(&mut buf, 0, 0, &DC_LUMA_BITS, &DC_VALUES);
    dht_len += put_huffman_table(&mut buf, 0, 1, &DC_CHROMA_BITS, &DC_VALUES);
    dht_len += put_huffman_table(&mut buf, 1, 0, &AC_LUMA_BITS, &AC_LUMA_VALUES);
    dht_len += put_huffman_table(&mut buf, 1, 1, &AC_CHROMA_BITS, &AC_CHROMA_VALUES);
    buf[dht_len_pos..dht_len_pos + 2].copy_from_slice(&(dht_len as u16).to_be_bytes());

    let chroma_table = if tables.len() >= 2 { 1 } else { 0 };

    put_marker(&mut buf, Marker::Sof0);
    write_be16(&mut buf, 17);
    buf.push(8); // bits per sample
    write_be16(&mut buf, height);
    write_be16(&mut buf, width);
    buf.push(3);
    // Y
    buf.push(1);
    buf.push(if jpeg_type == 0 { 0x21 } else { 0x22 });
    buf.push(0);
    // Cb
    buf.push(2);
    buf.push(0x11);
    buf.push(chroma_table);
    // Cr
    buf.push(3);
    buf.push(0x11);
    buf.push(chroma_table);

    put_marker(&mut buf, Marker::Sos);
    write_be16(&mut buf, 12);
    buf.push(3);
    buf.extend_from_slice(&[1, 0x00]);
    buf.extend_from_slice(&[2, 0x11]);
    buf.extend_from_slice(&[3, 0x11]);
    buf.push(0); // Ss
    buf.push(63); // Se
    buf.push(0); // Ah/Al

    buf
}

/// Write one DHT table entry and return its encoded length.
fn put_huffman_table(
    buf: &mut Vec<u8>,
    class: u8,
    id: u8,
    bits: &[u8; 16],
    values: &[u8],
) -> usize {
    let count: usize = bits.iter().map(|&b| b as usize).sum();
    buf.push(class << 4 | id);
    buf.extend_from_slice(bits);
    buf.extend_from_slice(&values[..count]);
    1 + bits.len() + count
}

/// Scale the default tables by an IJG-style quality factor.
///
/// `q` is clamped to 1..=99. Returns 128 bytes: the luma table followed by
/// the chroma table, each coefficient in 1..=255.
pub fn derive_default_tables(q: u8) -> [u8; 128] {
    let factor = u32::from(q.clamp(1, 99));
    let scale = if factor < 50 {
        5000 / factor
    } else {
        200 - factor * 2
    };

    let mut out = [0u8; 128];
    for (dst, &base) in out.iter_mut().zip(DEFAULT_QUANTIZERS.iter()) {
        let val = (u32::from(base) * scale + 50) / 100;
        *dst = val.clamp(1, 255) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk the marker segments between SOI and the end of SOS.
    fn segments(header: &[u8]) -> Vec<(u8, &[u8])> {
        assert_eq!(&header[..2], &[0xff, 0xd8]);
        let mut out = Vec::new();
        let mut pos = 2;
        while pos < header.len() {
            assert_eq!(header[pos], 0xff, "marker expected at {pos}");
            let code = header[pos + 1];
            let len = u16::from_be_bytes([header[pos + 2], header[pos + 3]]) as usize;
            out.push((code, &header[pos + 4..pos + 2 + len]));
            pos += 2 + len;
        }
        assert_eq!(pos, header.len(), "segment lengths must tile the header");
        out
    }

    #[test]
    fn segment_order_without_dri() {
        let header = build_header(1, 80, 60, &derive_default_tables(50), 0);
        let codes: Vec<u8> = segments(&header).iter().map(|(c, _)| *c).collect();
        assert_eq!(codes, [0xe0, 0xdb, 0xc4, 0xc0, 0xda]);
    }

    #[test]
    fn dri_written_when_nonzero() {
        let header = build_header(1, 80, 60, &derive_default_tables(50), 8);
        let segs = segments(&header);
        assert_eq!(segs[1].0, 0xdd);
        assert_eq!(segs[1].1, &[0, 8]);
    }

    #[test]
    fn app0_is_jfif_1_02() {
        let header = build_header(0, 1, 1, &[1; 64], 0);
        let segs = segments(&header);
        assert_eq!(&segs[0].1[..5], b"JFIF\0");
        assert_eq!(&segs[0].1[5..7], &[1, 2]);
    }

    #[test]
    fn dqt_entries_per_table() {
        let mut tables = vec![3u8; 64];
        tables.extend(vec![9u8; 64]);
        let header = build_header(1, 2, 2, &tables, 0);
        let dqt = segments(&header)[1].1;
        assert_eq!(dqt.len(), 130);
        assert_eq!(dqt[0], 0);
        assert!(dqt[1..65].iter().all(|&v| v == 3));
        assert_eq!(dqt[65], 1);
        assert!(dqt[66..130].iter().all(|&v| v == 9));

        let single = build_header(1, 2, 2, &tables[..64], 0);
        assert_eq!(segments(&single)[1].1.len(), 65);
    }

    #[test]
    fn dht_length_is_backpatched() {
        let header = build_header(1, 2, 2, &[1; 64], 0);
        let dht = segments(&header)[2];
        assert_eq!(dht.0, 0xc4);
        // 4 class/id bytes, 4 x 16 bit counts, 12 + 12 + 162 + 162 symbols.
        assert_eq!(dht.1.len(), 4 + 64 + 348);
        assert_eq!(dht.1[0], 0x00);
        assert_eq!(dht.1[17 + 12], 0x01);
        assert_eq!(dht.1[2 * 17 + 24], 0x10);
        assert_eq!(dht.1[3 * 17 + 24 + 162], 0x11);
    }

    #[test]
    fn sof0_dimensions_and_sampling() {
        let header = build_header(0, 0xa0, 0x5a, &derive_default_tables(80), 0);
        let sof = segments(&header)[3].1;
        assert_eq!(sof[0], 8);
        assert_eq!(u16::from_be_bytes([sof[1], sof[2]]), 720);
        assert_eq!(u16::from_be_bytes([sof[3], sof[4]]), 1280);
        assert_eq!(sof[5], 3);
        assert_eq!(&sof[6..9], &[1, 0x21, 0]);
        assert_eq!(&sof[9..12], &[2, 0x11, 1]);
        assert_eq!(&sof[12..15], &[3, 0x11, 1]);

        let header = build_header(1, 1, 1, &[1; 64], 0);
        let sof = segments(&header)[3].1;
        assert_eq!(&sof[6..9], &[1, 0x22, 0]);
        // One table: chroma shares table 0.
        assert_eq!(sof[11], 0);
        assert_eq!(sof[14], 0);
    }

    #[test]
    fn sos_selects_huffman_tables() {
        let header = build_header(1, 1, 1, &[1; 128], 0);
        let sos = segments(&header)[4].1;
        assert_eq!(sos, &[3, 1, 0x00, 2, 0x11, 3, 0x11, 0, 63, 0]);
    }

    #[test]
    fn quality_50_keeps_base_table() {
        let t = derive_default_tables(50);
        assert_eq!(t[0], 16);
        assert_eq!(&t[..], &DEFAULT_QUANTIZERS[..]);
    }

    #[test]
    fn derived_tables_known_values() {
        // q = 10: S = 500
        let t = derive_default_tables(10);
        assert_eq!(t[0], 80);
        assert_eq!(t[1], 55);
        assert_eq!(t[56], 255);
        // q = 90: S = 20
        let t = derive_default_tables(90);
        assert_eq!(t[0], 3);
        assert_eq!(t[64], 3);
        assert_eq!(t[127], 20);
        // q = 99: S = 2, small coefficients clamp to 1
        let t = derive_default_tables(99);
        assert_eq!(t[1], 1);
        assert_eq!(t[56], 2);
    }

    #[test]
    fn derived_tables_clamp_q() {
        assert_eq!(derive_default_tables(0), derive_default_tables(1));
        assert_eq!(derive_default_tables(100), derive_default_tables(99));
        assert_eq!(derive_default_tables(255), derive_default_tables(99));
    }

    #[test]
    fn derived_tables_are_pure_and_in_range() {
        for q in 0..=u8::MAX {
            let a = derive_default_tables(q);
            assert_eq!(a, derive_default_tables(q));
            assert_eq!(a.len(), 128);
            assert!(a.iter().all(|&v| v >= 1));
        }
    }
}

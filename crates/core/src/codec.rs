//! Byte-order helpers for reading and writing fixed-width integers.
//!
//! Readers take a buffer and an explicit offset. They do not bounds-check:
//! callers verify the remaining length first, as the header codecs do.
//! Writers always append to the end of a `Vec<u8>`.
//!
//! The `read_16`/`read_24`/`read_32`/`write_16`/`write_32` helpers resolve to
//! big-endian (network order) unless the `little-endian-words` feature is
//! enabled. RTP and RFC 2435 fields use the explicit `_be` forms.

/// Whether the native-order helpers use big-endian words.
pub const BIG_ENDIAN_WORDS: bool = !cfg!(feature = "little-endian-words");

/// # Panics
///
/// Panics if `buf` has fewer than `pos + 2` bytes.
pub fn read_be16(buf: &[u8], pos: usize) -> u16 {
    u16::from_be_bytes([buf[pos], buf[pos + 1]])
}

pub fn read_le16(buf: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([buf[pos], buf[pos + 1]])
}

/// Read a 24-bit big-endian value into the low bits of a `u32`.
pub fn read_be24(buf: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([0, buf[pos], buf[pos + 1], buf[pos + 2]])
}

pub fn read_le24(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], 0])
}

pub fn read_be32(buf: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

pub fn read_le32(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}

pub fn write_be16(buf: &mut Vec<u8>, val: u16) {
    buf.extend_from_slice(&val.to_be_bytes());
}

pub fn write_le16(buf: &mut Vec<u8>, val: u16) {
    buf.extend_from_slice(&val.to_le_bytes());
}

pub fn write_be32(buf: &mut Vec<u8>, val: u32) {
    buf.extend_from_slice(&val.to_be_bytes());
}

pub fn write_le32(buf: &mut Vec<u8>, val: u32) {
    buf.extend_from_slice(&val.to_le_bytes());
}

pub fn read_16(buf: &[u8], pos: usize) -> u16 {
    if BIG_ENDIAN_WORDS {
        read_be16(buf, pos)
    } else {
        read_le16(buf, pos)
    }
}

pub fn read_24(buf: &[u8], pos: usize) -> u32 {
    if BIG_ENDIAN_WORDS {
        read_be24(buf, pos)
    } else {
        read_le24(buf, pos)
    }
}

pub fn read_32(buf: &[u8], pos: usize) -> u32 {
    if BIG_ENDIAN_WORDS {
        read_be32(buf, pos)
    } else {
        read_le32(buf, pos)
    }
}

pub fn write_16(buf: &mut Vec<u8>, val: u16) {
    if BIG_ENDIAN_WORDS {
        write_be16(buf, val)
    } else {
        write_le16(buf, val)
    }
}

pub fn write_32(buf: &mut Vec<u8>, val: u32) {
    if BIG_ENDIAN_WORDS {
        write_be32(buf, val)
    } else {
        write_le32(buf, val)
    }
}

//! Wire formats for Motion-JPEG over RTP.
//!
//! ## RTP overview (RFC 3550)
//!
//! Each JPEG frame is split into one or more RTP packets. Every packet
//! carries a 12-byte fixed header ([`rtp::RtpHeader`]) containing:
//!
//! - **Sequence number** (16-bit, wrapping) — for reordering and loss detection.
//! - **Timestamp** (32-bit) — media clock, 90 kHz for video.
//! - **SSRC** (32-bit) — identifies the sender.
//! - **Marker bit** — set on the last packet of a frame.
//!
//! ## RTP/JPEG (RFC 2435)
//!
//! | Piece | Module |
//! |-------|--------|
//! | 8-byte payload header + in-band quantization tables | [`jpeg`] |
//! | JFIF marker synthesis, quality-factor tables | [`jfif`] |
//! | Annex K.3 Huffman tables, default quantizers | [`tables`] |
//! | Sender-side fragmentation | [`mjpeg`] |

pub mod jfif;
pub mod jpeg;
pub mod mjpeg;
pub mod rtp;
pub mod tables;

pub use jpeg::JpegPayloadHeader;
pub use rtp::RtpHeader;

//! RTP/JPEG frame reassembly.
//!
//! A [`FrameReassembler`] consumes one datagram at a time and produces a
//! complete JFIF image whenever a frame finishes:
//!
//! ```text
//! offset == 0      -> reset, synthesize JFIF header     (Idle -> Accumulating)
//! every fragment   -> append scan payload
//! marker bit set   -> append EOI, emit frame            (Accumulating -> Idle)
//! ```
//!
//! ## Continuity modes
//!
//! [`ContinuityMode::Trusting`] (the default) assumes datagrams arrive in
//! order and complete. Lost or reordered packets are not detected: a lost
//! first fragment makes the following fragments land in a headerless
//! buffer, and the result is emitted when the marker arrives.
//!
//! [`ContinuityMode::Strict`] runs a [`SequenceTracker`] and validates
//! fragment offsets. A gap or offset mismatch abandons the frame in flight,
//! and fragments are ignored until the next frame start.
//!
//! A gap reported by a checker installed with
//! [`FrameReassembler::with_checker`] has the same effect in either mode.

use std::collections::HashMap;

use crate::error::Result;
use crate::media::jfif::{self, Marker, QTABLE_LEN};
use crate::media::jpeg::{JpegPayloadHeader, Q_INBAND_MIN};
use crate::media::rtp::RtpHeader;

/// Receives completed frames.
///
/// Implemented for any `FnMut(Vec<u8>) + Send` closure.
pub trait FrameSink: Send {
    fn on_frame(&mut self, frame: Vec<u8>);
}

impl<F> FrameSink for F
where
    F: FnMut(Vec<u8>) + Send,
{
    fn on_frame(&mut self, frame: Vec<u8>) {
        (self)(frame)
    }
}

/// How strictly packet ordering is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContinuityMode {
    /// Trust arrival order; never detect loss.
    #[default]
    Trusting,
    /// Track sequence numbers and fragment offsets; drop broken frames.
    Strict,
}

/// Result of observing one sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    InOrder,
    Gap { expected: u16, received: u16 },
}

/// Pluggable sequence continuity check.
pub trait ContinuityCheck: Send {
    fn observe(&mut self, sequence: u16) -> Continuity;
}

/// Reports every packet as in order.
#[derive(Debug, Default)]
pub struct TrustOrder;

impl ContinuityCheck for TrustOrder {
    fn observe(&mut self, _sequence: u16) -> Continuity {
        Continuity::InOrder
    }
}

/// Expects each sequence number to follow the previous one (mod 2^16).
#[derive(Debug, Default)]
pub struct SequenceTracker {
    expected: Option<u16>,
}

impl ContinuityCheck for SequenceTracker {
    fn observe(&mut self, sequence: u16) -> Continuity {
        let result = match self.expected {
            Some(expected) if expected != sequence => Continuity::Gap {
                expected,
                received: sequence,
            },
            _ => Continuity::InOrder,
        };
        self.expected = Some(sequence.wrapping_add(1));
        result
    }
}

/// Counters kept by a reassembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Datagrams offered.
    pub packets: u64,
    /// Datagrams rejected by header parsing.
    pub dropped: u64,
    /// Fragments ignored in strict mode.
    pub discarded: u64,
    /// Frames emitted.
    pub frames: u64,
    /// Frames thrown away before their marker packet.
    pub abandoned: u64,
    /// Sequence gaps reported by the continuity check.
    pub gaps: u64,
}

/// Where the reassembler is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyState {
    /// Waiting for a frame start.
    Idle,
    /// A frame is in flight; fragments are appended to it.
    Accumulating,
}

/// Single-stream RTP/JPEG reassembler.
///
/// Exactly one frame is in flight at a time. Streams from different
/// sources must be demultiplexed (e.g. by SSRC) into separate instances.
pub struct FrameReassembler {
    mode: ContinuityMode,
    checker: Box<dyn ContinuityCheck>,
    state: ReassemblyState,
    buffer: Vec<u8>,
    /// Bytes of `buffer` taken by the synthesized JFIF header.
    header_len: usize,
    /// Set by a reported gap; fragments are discarded until the next frame start.
    resync: bool,
    /// In-band tables last seen for each Q in 128..=255.
    table_cache: HashMap<u8, Vec<u8>>,
    stats: ReassemblyStats,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new(ContinuityMode::default())
    }
}

impl FrameReassembler {
    pub fn new(mode: ContinuityMode) -> Self {
        let checker: Box<dyn ContinuityCheck> = match mode {
            ContinuityMode::Trusting => Box::new(TrustOrder),
            ContinuityMode::Strict => Box::new(SequenceTracker::default()),
        };
        Self {
            mode,
            checker,
            state: ReassemblyState::Idle,
            buffer: Vec::new(),
            header_len: 0,
            resync: false,
            table_cache: HashMap::new(),
            stats: ReassemblyStats::default(),
        }
    }

    /// Replace the continuity check. A reported gap abandons the frame in
    /// flight regardless of mode.
    pub fn with_checker(mut self, checker: Box<dyn ContinuityCheck>) -> Self {
        self.checker = checker;
        self
    }

    pub fn state(&self) -> ReassemblyState {
        self.state
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    /// Bytes accumulated for the frame in flight, header included.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Parse one datagram and feed it to the state machine.
    ///
    /// On a parse error the datagram is dropped and the state is untouched.
    pub fn push(&mut self, datagram: &[u8]) -> Result<Option<Vec<u8>>> {
        self.stats.packets += 1;

        let parsed = RtpHeader::parse(datagram, 0).and_then(|(rtp, rtp_len)| {
            JpegPayloadHeader::parse(datagram, rtp_len)
                .map(|(jpeg, jpeg_len)| (rtp, jpeg, rtp_len + jpeg_len))
        });

        match parsed {
            Ok((rtp, jpeg, payload_start)) => {
                Ok(self.process(&rtp, &jpeg, &datagram[payload_start..]))
            }
            Err(e) => {
                self.stats.dropped += 1;
                Err(e)
            }
        }
    }

    /// Advance the state machine with already-parsed headers and the scan
    /// payload that followed them.
    pub fn process(
        &mut self,
        rtp: &RtpHeader,
        jpeg: &JpegPayloadHeader,
        payload: &[u8],
    ) -> Option<Vec<u8>> {
        tracing::trace!(
            seq = rtp.sequence,
            ts = rtp.timestamp,
            marker = rtp.marker,
            offset = jpeg.fragment_offset,
            q = jpeg.q,
            payload_len = payload.len(),
            "fragment"
        );

        if let Continuity::Gap { expected, received } = self.checker.observe(rtp.sequence) {
            self.stats.gaps += 1;
            tracing::warn!(expected, received, ssrc = rtp.ssrc, "RTP sequence gap");
            self.abandon("sequence gap");
            self.resync = true;
        }

        if jpeg.fragment_offset == 0 {
            self.begin_frame(jpeg);
        } else if self.resync || self.mode == ContinuityMode::Strict {
            if self.state == ReassemblyState::Idle {
                self.stats.discarded += 1;
                return None;
            }
            let scan_len = self.buffer.len() - self.header_len;
            if jpeg.fragment_offset as usize != scan_len {
                tracing::warn!(
                    offset = jpeg.fragment_offset,
                    expected = scan_len,
                    "fragment offset mismatch"
                );
                self.abandon("fragment offset mismatch");
                self.stats.discarded += 1;
                return None;
            }
        } else if self.state == ReassemblyState::Idle {
            tracing::debug!(
                seq = rtp.sequence,
                offset = jpeg.fragment_offset,
                "fragment without frame start"
            );
            self.state = ReassemblyState::Accumulating;
        }

        self.buffer.extend_from_slice(payload);

        if !rtp.marker {
            return None;
        }

        jfif::put_marker(&mut self.buffer, Marker::Eoi);
        let frame = std::mem::take(&mut self.buffer);
        self.header_len = 0;
        self.state = ReassemblyState::Idle;
        self.stats.frames += 1;

        tracing::debug!(
            bytes = frame.len(),
            ts = rtp.timestamp,
            ssrc = rtp.ssrc,
            "frame complete"
        );

        Some(frame)
    }

    fn begin_frame(&mut self, jpeg: &JpegPayloadHeader) {
        if self.state == ReassemblyState::Accumulating {
            self.abandon("new frame started");
        }

        self.resync = false;
        let tables = self.resolve_tables(jpeg);
        self.buffer = jfif::build_header(
            jpeg.jpeg_type,
            jpeg.width_blocks,
            jpeg.height_blocks,
            &tables,
            0,
        );
        self.header_len = self.buffer.len();
        self.state = ReassemblyState::Accumulating;
    }

    /// Pick the quantization tables for a frame start: in-band tables when
    /// present and usable, else the last in-band tables for this Q, else
    /// tables derived from Q.
    fn resolve_tables(&mut self, jpeg: &JpegPayloadHeader) -> Vec<u8> {
        if let Some(qt) = &jpeg.quantization {
            if qt.precision == 0 && qt.table.len() >= QTABLE_LEN {
                let len = (qt.table.len() / QTABLE_LEN).min(2) * QTABLE_LEN;
                let tables = qt.table[..len].to_vec();
                self.table_cache.insert(jpeg.q, tables.clone());
                return tables;
            }
            if qt.precision != 0 {
                tracing::warn!(
                    precision = qt.precision,
                    "16-bit quantization tables not supported"
                );
            }
        }

        if jpeg.q >= Q_INBAND_MIN {
            if let Some(tables) = self.table_cache.get(&jpeg.q) {
                return tables.clone();
            }
            tracing::debug!(q = jpeg.q, "no in-band tables cached, deriving");
        }

        jfif::derive_default_tables(jpeg.q).to_vec()
    }

    fn abandon(&mut self, reason: &'static str) {
        if self.state == ReassemblyState::Accumulating {
            tracing::debug!(bytes = self.buffer.len(), reason, "frame abandoned");
            self.stats.abandoned += 1;
        }
        self.buffer.clear();
        self.header_len = 0;
        self.state = ReassemblyState::Idle;
    }
}

//! Error types for the RTP/JPEG receiver library.

use std::fmt;

/// Errors that can occur in the RTP/JPEG receiver library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Wire parsing**: [`Parse`](Self::Parse) — a malformed or unsupported
///   datagram. Always scoped to a single packet and never fatal.
/// - **Transport**: [`Io`](Self::Io) — socket/network failures.
/// - **Receiver**: [`NotStarted`](Self::NotStarted),
///   [`AlreadyRunning`](Self::AlreadyRunning).
#[derive(Debug, thiserror::Error)]
pub enum MjpegError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an RTP or RTP/JPEG header.
    #[error("RTP/JPEG parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// [`Receiver::start`](crate::Receiver::start) has not been called yet.
    #[error("receiver not started")]
    NotStarted,

    /// [`Receiver::start`](crate::Receiver::start) was called while already running.
    #[error("receiver already running")]
    AlreadyRunning,
}

impl MjpegError {
    /// The parse failure kind, if this is a [`Parse`](Self::Parse) error.
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Self::Parse { kind } => Some(*kind),
            _ => None,
        }
    }
}

impl From<ParseErrorKind> for MjpegError {
    fn from(kind: ParseErrorKind) -> Self {
        Self::Parse { kind }
    }
}

/// Specific kind of header parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Fewer bytes than a fixed header (12 for RTP, 8 for RTP/JPEG) remained.
    TruncatedHeader,
    /// The in-band quantization table header (4 bytes) was cut short.
    TruncatedQuantizationHeader,
    /// Fewer table bytes than the quantization header announced.
    TruncatedQuantizationTable,
    /// RTP/JPEG type-specific field was not 0 (interlaced/field video).
    UnsupportedTypeSpecifier,
    /// RTP/JPEG type in 64..=127 (restart markers present).
    UnsupportedRestartMarkers,
    /// RTP version field was not 2.
    UnsupportedVersion,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedHeader => write!(f, "truncated header"),
            Self::TruncatedQuantizationHeader => write!(f, "truncated quantization table header"),
            Self::TruncatedQuantizationTable => write!(f, "truncated quantization table"),
            Self::UnsupportedTypeSpecifier => write!(f, "unsupported type-specific value"),
            Self::UnsupportedRestartMarkers => write!(f, "restart markers not supported"),
            Self::UnsupportedVersion => write!(f, "unsupported RTP version"),
        }
    }
}

/// Convenience alias for `Result<T, MjpegError>`.
pub type Result<T> = std::result::Result<T, MjpegError>;

pub mod codec;
pub mod error;
pub mod media;
pub mod reassembly;
pub mod receiver;
pub mod transport;

pub use error::{MjpegError, ParseErrorKind, Result};
pub use media::jfif::{build_header, derive_default_tables};
pub use media::mjpeg::{JpegPacketizer, ScanFrame};
pub use media::{JpegPayloadHeader, RtpHeader};
pub use reassembly::{ContinuityMode, FrameReassembler, FrameSink, ReassemblyStats};
pub use receiver::{Receiver, ReceiverConfig};

//! Network transport for inbound RTP.
//!
//! RTP/JPEG arrives as plain UDP datagrams; each datagram is exactly one
//! RTP packet. [`udp::UdpSource`] wraps the socket and turns its read
//! timeout into an idle tick so the receive loop can observe shutdown.

pub mod udp;

pub use udp::UdpSource;

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::Result;

/// UDP socket delivering inbound RTP datagrams.
///
/// Reads block for at most the poll timeout given at bind time. A timeout
/// is reported as `Ok(None)` rather than an error.
pub struct UdpSource {
    socket: UdpSocket,
}

impl UdpSource {
    /// Bind to `addr` with `poll_timeout` as the read timeout.
    pub fn bind<A: ToSocketAddrs>(addr: A, poll_timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(poll_timeout))?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive one datagram into `buf`.
    ///
    /// Returns the datagram length and sender, or `None` if the poll
    /// timeout elapsed first.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

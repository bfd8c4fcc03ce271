use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{MjpegError, Result};
use crate::reassembly::{ContinuityMode, FrameReassembler, FrameSink, ReassemblyStats};
use crate::transport::UdpSource;

/// Listen address used when none is given.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:10100";

/// Upper bound on how long a stop request waits for the receive loop.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(70);

/// Large enough for any UDP datagram.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 65_536;

/// Receiver configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Local address to bind (host:port).
    pub bind_addr: String,
    /// Socket read timeout; the loop checks the stop flag at least this often.
    pub poll_timeout: Duration,
    /// Size of the datagram receive buffer. Longer datagrams are truncated.
    pub recv_buffer_size: usize,
    /// Ordering checks applied by the reassembler.
    pub continuity: ContinuityMode,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            continuity: ContinuityMode::default(),
        }
    }
}

type SharedSink = Arc<Mutex<Option<Box<dyn FrameSink>>>>;

/// RTP/JPEG receiver running on a dedicated thread.
///
/// Owns the UDP socket, a [`FrameReassembler`], and the registered
/// [`FrameSink`]. Every datagram is processed synchronously on the receive
/// thread; completed frames are handed to the sink from that thread.
pub struct Receiver {
    config: ReceiverConfig,
    running: Arc<AtomicBool>,
    sink: SharedSink,
    stats: Arc<Mutex<ReassemblyStats>>,
    handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl Receiver {
    pub fn new(bind_addr: &str) -> Self {
        Self::with_config(ReceiverConfig {
            bind_addr: bind_addr.to_string(),
            ..ReceiverConfig::default()
        })
    }

    pub fn with_config(config: ReceiverConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            sink: Arc::new(Mutex::new(None)),
            stats: Arc::new(Mutex::new(ReassemblyStats::default())),
            handle: None,
            local_addr: None,
        }
    }

    /// Register the frame consumer. May be called while running.
    pub fn set_frame_sink<S: FrameSink + 'static>(&self, sink: S) {
        *self.sink.lock() = Some(Box::new(sink));
    }

    /// Remove the frame consumer; completed frames are then discarded.
    pub fn clear_frame_sink(&self) {
        self.sink.lock().take();
    }

    /// Bind the socket and spawn the receive thread.
    ///
    /// Each start begins with a fresh reassembler and zeroed statistics.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(MjpegError::AlreadyRunning);
        }

        let source = UdpSource::bind(self.config.bind_addr.as_str(), self.config.poll_timeout)?;
        let local_addr = source.local_addr()?;

        let reassembler = FrameReassembler::new(self.config.continuity);
        *self.stats.lock() = ReassemblyStats::default();

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let sink = self.sink.clone();
        let stats = self.stats.clone();
        let buf_size = self.config.recv_buffer_size;
        let poll_timeout = self.config.poll_timeout;

        let spawned = thread::Builder::new()
            .name("rtp-receive".to_string())
            .spawn(move || {
                receive_loop(
                    source,
                    reassembler,
                    buf_size,
                    poll_timeout,
                    sink,
                    stats,
                    running,
                );
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                self.local_addr = Some(local_addr);
                tracing::info!(
                    addr = %local_addr,
                    mode = ?self.config.continuity,
                    "RTP/JPEG receiver listening"
                );
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Signal the receive thread and wait for it to exit.
    ///
    /// Returns within roughly one poll timeout. Calling `stop` on a stopped
    /// receiver does nothing.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("receive thread panicked");
            }
            self.local_addr = None;
            tracing::info!("receiver stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bound socket address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.local_addr.ok_or(MjpegError::NotStarted)
    }

    /// Snapshot of the reassembler counters.
    pub fn stats(&self) -> ReassemblyStats {
        *self.stats.lock()
    }

    /// Configuration used by the next [`start`](Self::start).
    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Blocking receive loop.
///
/// Checks the `running` flag after every datagram or poll timeout so that
/// [`Receiver::stop`] terminates it promptly. A socket error pauses the loop
/// for one poll timeout before the next attempt. The socket is closed when
/// the loop returns.
fn receive_loop(
    source: UdpSource,
    mut reassembler: FrameReassembler,
    buf_size: usize,
    poll_timeout: Duration,
    sink: SharedSink,
    stats: Arc<Mutex<ReassemblyStats>>,
    running: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; buf_size];

    while running.load(Ordering::SeqCst) {
        match source.recv(&mut buf) {
            Ok(None) => continue,
            Ok(Some((len, from))) => {
                match reassembler.push(&buf[..len]) {
                    Ok(Some(frame)) => match sink.lock().as_mut() {
                        Some(sink) => sink.on_frame(frame),
                        None => {
                            tracing::trace!(bytes = frame.len(), "no frame sink, frame discarded")
                        }
                    },
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(%from, len, error = %e, "datagram dropped");
                    }
                }
                *stats.lock() = reassembler.stats();
            }
            Err(e) => {
                tracing::warn!(error = %e, "UDP receive error");
                thread::sleep(poll_timeout);
            }
        }
    }

    tracing::debug!("receive loop exited");
}

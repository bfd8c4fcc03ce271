use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mjpeg::reassembly::ContinuityMode;
use mjpeg::receiver::{DEFAULT_BIND_ADDR, DEFAULT_POLL_TIMEOUT};
use mjpeg::{JpegPayloadHeader, Receiver, ReceiverConfig, RtpHeader};

#[derive(Parser)]
#[command(
    name = "mjpeg-receiver",
    about = "Receive RTP/JPEG (RFC 2435) streams and write JPEG frames"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for RTP/JPEG and write each frame as frame_<N>.jpeg
    Listen {
        /// Bind address (host:port)
        #[arg(long, short, default_value = DEFAULT_BIND_ADDR)]
        bind: String,

        /// Directory for the frame files
        #[arg(long, short, default_value = ".")]
        out_dir: PathBuf,

        /// Drop frames with sequence gaps or offset mismatches
        #[arg(long)]
        strict: bool,

        /// Socket poll timeout in milliseconds
        #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT.as_millis() as u64)]
        poll_ms: u64,
    },
    /// Decode and print the headers of one datagram given as hex
    Inspect {
        /// Datagram bytes as a hex string
        hex: String,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Command::Listen {
            bind,
            out_dir,
            strict,
            poll_ms,
        } => listen(bind, out_dir, strict, poll_ms),
        Command::Inspect { hex } => inspect(&hex),
    }
}

fn listen(bind: String, out_dir: PathBuf, strict: bool, poll_ms: u64) {
    if let Err(e) = fs::create_dir_all(&out_dir) {
        eprintln!("Failed to create {}: {}", out_dir.display(), e);
        return;
    }

    let config = ReceiverConfig {
        bind_addr: bind,
        poll_timeout: Duration::from_millis(poll_ms),
        continuity: if strict {
            ContinuityMode::Strict
        } else {
            ContinuityMode::Trusting
        },
        ..ReceiverConfig::default()
    };

    let mut receiver = Receiver::with_config(config);

    let mut count: u64 = 0;
    receiver.set_frame_sink(move |frame: Vec<u8>| {
        let path = out_dir.join(format!("frame_{count}.jpeg"));
        match fs::write(&path, &frame) {
            Ok(()) => tracing::info!(path = %path.display(), bytes = frame.len(), "frame written"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to write frame"),
        }
        count += 1;
    });

    if let Err(e) = receiver.start() {
        eprintln!("Failed to start receiver: {}", e);
        return;
    }

    match receiver.local_addr() {
        Ok(addr) => println!("RTP/JPEG receiver on {} — press Enter to stop", addr),
        Err(e) => eprintln!("Receiver address unavailable: {}", e),
    }

    let mut input = String::new();
    if let Err(e) = io::stdin().read_line(&mut input) {
        eprintln!("Failed to read stdin: {}", e);
    }

    receiver.stop();

    let stats = receiver.stats();
    println!(
        "packets {} frames {} dropped {} abandoned {} gaps {}",
        stats.packets, stats.frames, stats.dropped, stats.abandoned, stats.gaps
    );
}

fn inspect(hex_str: &str) {
    let datagram = match hex::decode(hex_str.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Invalid hex: {}", e);
            return;
        }
    };

    let (rtp, rtp_len) = match RtpHeader::parse(&datagram, 0) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("RTP header: {}", e);
            return;
        }
    };
    println!(
        "rtp version {}, marker {}, pt {}, ssrc {:#010x}, timestamp {}, seqnum {}, payload length {}",
        rtp.version,
        rtp.marker as u8,
        rtp.payload_type,
        rtp.ssrc,
        rtp.timestamp,
        rtp.sequence,
        datagram.len() - rtp_len
    );

    let (jpeg, jpeg_len) = match JpegPayloadHeader::parse(&datagram, rtp_len) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("JPEG header: {}", e);
            return;
        }
    };
    println!(
        "jpeg type specific {}, offset {}, type {}, Q {}, width {}, height {}, Q table length {}, scan bytes {}",
        jpeg.type_specific,
        jpeg.fragment_offset,
        jpeg.jpeg_type,
        jpeg.q,
        jpeg.width(),
        jpeg.height(),
        jpeg.table().map_or(0, <[u8]>::len),
        datagram.len() - rtp_len - jpeg_len
    );

    if let Some(table) = jpeg.table().filter(|t| !t.is_empty()) {
        println!("in-band quantization table {}", hex::encode(table));
    }
}

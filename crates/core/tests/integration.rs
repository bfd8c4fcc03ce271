//! Integration test: packetize frames, send them over loopback UDP to a
//! running receiver, and check the JFIF images delivered to the sink.

use std::net::UdpSocket;
use std::sync::mpsc;
use std::time::Duration;

use mjpeg::media::mjpeg::JPEG_PAYLOAD_TYPE;
use mjpeg::{
    JpegPacketizer, ParseErrorKind, Receiver, ReceiverConfig, ScanFrame, build_header,
    derive_default_tables,
};

/// Fixed port for the integration test.
const TEST_BIND: &str = "127.0.0.1:18600";

/// Sample datagram: RTP (seq 596, PT 26), RTP/JPEG type 1, Q 255,
/// 1280x720, followed by a 64-byte in-band luma table and no scan data.
const SAMPLE_HEX: &str = concat!(
    "801a02546364c3ce95e95fde0000000001ffa05a00000040",
    "080c0c0e0c0e1010101010101312131414141313131314141415151519191915",
    "151514141515181819191b1c1b1a1a191a1c1c1e1e1e242422222a2a2b33333e",
);

fn sample() -> Vec<u8> {
    hex::decode(SAMPLE_HEX).expect("sample hex")
}

fn expected_image(frame: &ScanFrame, tables: &[u8]) -> Vec<u8> {
    let mut image = build_header(
        frame.jpeg_type,
        frame.width_blocks,
        frame.height_blocks,
        tables,
        0,
    );
    image.extend_from_slice(&frame.scan);
    image.extend_from_slice(&[0xFF, 0xD9]);
    image
}

#[test]
fn sample_datagram_parses() {
    let datagram = sample();
    assert_eq!(datagram.len(), 88);

    let (rtp, n) = mjpeg::RtpHeader::parse(&datagram, 0).unwrap();
    assert_eq!(rtp.version, 2);
    assert_eq!(rtp.sequence, 596);
    assert_eq!(rtp.payload_type, 26);

    let (jpeg, m) = mjpeg::JpegPayloadHeader::parse(&datagram, n).unwrap();
    assert_eq!(jpeg.fragment_offset, 0);
    assert_eq!(jpeg.jpeg_type, 1);
    assert_eq!(jpeg.q, 255);
    assert_eq!(jpeg.width(), 1280);
    assert_eq!(jpeg.height(), 720);
    assert_eq!(jpeg.table().map(<[u8]>::len), Some(64));
    assert_eq!(n + m, datagram.len());
}

#[test]
fn receive_frames_over_udp() {
    let mut receiver = Receiver::with_config(ReceiverConfig {
        bind_addr: TEST_BIND.to_string(),
        poll_timeout: Duration::from_millis(20),
        ..ReceiverConfig::default()
    });

    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    receiver.set_frame_sink(move |frame: Vec<u8>| {
        let _ = tx.send(frame);
    });
    receiver.start().expect("receiver start");

    let target = receiver.local_addr().unwrap();
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

    // Frame 1: derived tables, fragmented.
    let mut packetizer = JpegPacketizer::with_random_ssrc(JPEG_PAYLOAD_TYPE).with_mtu(600);
    let derived = ScanFrame {
        jpeg_type: 0,
        q: 75,
        width_blocks: 40,
        height_blocks: 30,
        qtables: None,
        scan: (0..3000u32).map(|i| (i % 251) as u8).collect(),
    };
    let packets = packetizer.packetize(&derived, 3000);
    assert!(packets.len() > 1);
    for packet in &packets {
        sender.send_to(packet, target).unwrap();
    }

    let image = rx.recv_timeout(Duration::from_secs(2)).expect("first frame");
    assert_eq!(image, expected_image(&derived, &derive_default_tables(75)));

    // A bad datagram in between is dropped without disturbing the next frame.
    let mut bad = packets[0].clone();
    bad[12 + 4] = 70;
    sender.send_to(&bad, target).unwrap();

    // Frame 2: in-band tables.
    let mut tables = vec![5u8; 64];
    tables.extend(vec![6u8; 64]);
    let inband = ScanFrame {
        jpeg_type: 1,
        q: 255,
        width_blocks: 20,
        height_blocks: 15,
        qtables: Some(tables.clone()),
        scan: vec![0x11; 1500],
    };
    for packet in packetizer.packetize(&inband, 3000) {
        sender.send_to(&packet, target).unwrap();
    }

    let image = rx.recv_timeout(Duration::from_secs(2)).expect("second frame");
    assert_eq!(image, expected_image(&inband, &tables));

    // Frame 3: the sample datagram with its marker bit set.
    let mut marked = sample();
    marked[1] |= 0x80;
    sender.send_to(&marked, target).unwrap();

    let image = rx.recv_timeout(Duration::from_secs(2)).expect("marked frame");
    let expected = build_header(1, 0xa0, 0x5a, &marked[24..88], 0);
    assert_eq!(&image[..expected.len()], &expected[..]);
    assert_eq!(&image[expected.len()..], &[0xFF, 0xD9]);

    receiver.stop();
    assert!(!receiver.is_running());

    let stats = receiver.stats();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.dropped, 1);
}

#[test]
fn restart_marker_datagram_rejected() {
    let mut datagram = sample();
    datagram[16] = 70;
    let err = mjpeg::FrameReassembler::default()
        .push(&datagram)
        .unwrap_err();
    assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnsupportedRestartMarkers));
}

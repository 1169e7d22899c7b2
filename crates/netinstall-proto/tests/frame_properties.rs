//! Property-based tests for frame encoding/decoding.
//!
//! These verify the wire-layout invariants hold for ALL valid inputs, not
//! just hand-picked examples.

use netinstall_proto::{FrameHeader, decode, encode};
use proptest::prelude::*;

proptest! {
    /// `decode(encode(s, d, a, b, p)) == (s, d, a, b, p)`.
    #[test]
    fn prop_encode_decode_roundtrip(
        src in any::<[u8; 6]>(),
        dst in any::<[u8; 6]>(),
        counter_a in any::<u16>(),
        counter_b in any::<u16>(),
        payload in prop::collection::vec(any::<u8>(), 0..=1024),
    ) {
        let wire = encode(src, dst, counter_a, counter_b, &payload).expect("encode");
        let frame = decode(&wire).expect("decode");

        prop_assert_eq!(frame.src_mac(), src);
        prop_assert_eq!(frame.dst_mac(), dst);
        prop_assert_eq!(frame.counters(), (counter_a, counter_b));
        prop_assert_eq!(frame.payload(), payload.as_slice());
    }

    /// Invariant 1: every outbound frame is exactly `20 + len(payload)`
    /// bytes, bytes 12-13 are zero, and bytes 14-15 equal `len(payload)` as
    /// a little-endian u16.
    #[test]
    fn prop_outbound_layout(
        payload in prop::collection::vec(any::<u8>(), 0..=1024),
    ) {
        let wire = encode([0xAA; 6], [0xBB; 6], 1, 2, &payload).expect("encode");

        prop_assert_eq!(wire.len(), 20 + payload.len());
        prop_assert_eq!(&wire[12..14], &[0u8, 0u8]);
        #[allow(clippy::cast_possible_truncation)]
        let expected_len = (payload.len() as u16).to_le_bytes();
        prop_assert_eq!(&wire[14..16], expected_len.as_slice());
    }

    /// decode does not require the declared length to match the actual
    /// trailing bytes; real devices always agree, but the codec must not
    /// depend on that to parse.
    #[test]
    fn prop_decode_ignores_declared_length(
        payload in prop::collection::vec(any::<u8>(), 0..=1024),
        lying_length in any::<u16>(),
    ) {
        let mut wire = encode([0; 6], [0; 6], 0, 0, &payload).expect("encode");
        wire[14..16].copy_from_slice(&lying_length.to_le_bytes());

        let frame = decode(&wire).expect("decode");
        prop_assert_eq!(frame.payload(), payload.as_slice());
    }
}

#[test]
fn encode_rejects_payload_over_16_bit_length() {
    let payload = vec![0u8; usize::from(u16::MAX) + 1];
    let err = encode([0; 6], [0; 6], 0, 0, &payload).unwrap_err();
    assert_eq!(
        err,
        netinstall_proto::EncodeError::PayloadTooLong {
            len: usize::from(u16::MAX) + 1,
            max: usize::from(u16::MAX),
        }
    );
}

#[test]
fn decode_rejects_anything_shorter_than_a_header() {
    for len in 0..FrameHeader::SIZE {
        let bytes = vec![0u8; len];
        let err = decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            netinstall_proto::DecodeError::Short { expected: FrameHeader::SIZE, actual: len }
        );
    }
}

/// A discovery datagram's header, as a RouterBOARD in netinstall mode sends it.
#[test]
fn discovery_frame_header_layout() {
    let dev_mac = [0x00, 0x0C, 0x42, 0x01, 0x02, 0x03];
    let payload = b"ignored\nLIC1\nKEY1\nRB450G\nmipsbe\n6.45.9".to_vec();

    let wire = encode(dev_mac, [0; 6], 1, 0, &payload).expect("encode");
    let frame = decode(&wire).expect("decode");

    assert_eq!(frame.src_mac(), dev_mac);
    assert_eq!(frame.dst_mac(), [0; 6]);
    assert_eq!(frame.counters(), (1, 0));
}

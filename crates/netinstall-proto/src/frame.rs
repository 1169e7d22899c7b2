//! Complete frames: a [`FrameHeader`] plus its payload.

use crate::{
    errors::{DecodeError, EncodeError},
    header::FrameHeader,
};

/// Maximum payload length representable in the header's 16-bit length field.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// A decoded frame: header fields plus the payload bytes that followed them.
///
/// Holds an owned copy of the payload rather than borrowing from the
/// receive buffer, since callers (the session engine) need to inspect it
/// after the socket's receive buffer has been reused for the next `recv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Vec<u8>,
}

impl Frame {
    /// Sender's interface MAC address.
    #[must_use]
    pub fn src_mac(&self) -> [u8; 6] {
        self.header.src_mac()
    }

    /// Receiver's interface MAC address.
    #[must_use]
    pub fn dst_mac(&self) -> [u8; 6] {
        self.header.dst_mac()
    }

    /// First sequence counter.
    #[must_use]
    pub fn counter_a(&self) -> u16 {
        self.header.counter_a()
    }

    /// Second sequence counter.
    #[must_use]
    pub fn counter_b(&self) -> u16 {
        self.header.counter_b()
    }

    /// The two sequence counters as a tuple, in `(counter_a, counter_b)`
    /// order.
    #[must_use]
    pub fn counters(&self) -> (u16, u16) {
        (self.counter_a(), self.counter_b())
    }

    /// Declared payload length from the header. Advisory: may not equal
    /// `self.payload().len()` for a frame built by [`decode`] from untrusted
    /// bytes, since `decode` does not enforce the two agree.
    #[must_use]
    pub fn declared_length(&self) -> u16 {
        self.header.length()
    }

    /// The payload bytes that followed the 20-byte header.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Encode a frame's wire bytes: a 20-byte header followed by `payload`.
///
/// # Errors
///
/// Returns [`EncodeError::PayloadTooLong`] if `payload.len()` exceeds
/// [`MAX_PAYLOAD_LEN`] (65535 bytes, the largest value the header's 16-bit
/// length field can hold).
pub fn encode(
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    counter_a: u16,
    counter_b: u16,
    payload: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(EncodeError::PayloadTooLong { len: payload.len(), max: MAX_PAYLOAD_LEN });
    }

    #[allow(clippy::cast_possible_truncation)]
    let length = payload.len() as u16;
    let header = FrameHeader::new(src_mac, dst_mac, counter_a, counter_b, length);

    let mut wire = Vec::with_capacity(FrameHeader::SIZE + payload.len());
    wire.extend_from_slice(&header.to_bytes());
    wire.extend_from_slice(payload);
    Ok(wire)
}

/// Decode a frame from raw wire bytes.
///
/// Everything after the 20-byte header is taken as the payload verbatim;
/// the header's declared `length` is not checked against it (see
/// [`FrameHeader::length`]).
///
/// # Errors
///
/// Returns [`DecodeError::Short`] if `bytes` is shorter than the 20-byte
/// header.
pub fn decode(bytes: &[u8]) -> Result<Frame, DecodeError> {
    let header = *FrameHeader::from_bytes(bytes)?;
    let payload = bytes[FrameHeader::SIZE..].to_vec();
    Ok(Frame { header, payload })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let err = encode([0; 6], [0; 6], 0, 0, &payload).unwrap_err();
        assert_eq!(
            err,
            EncodeError::PayloadTooLong { len: MAX_PAYLOAD_LEN + 1, max: MAX_PAYLOAD_LEN }
        );
    }

    #[test]
    fn decode_rejects_short_frame() {
        let err = decode(&[0u8; 19]).unwrap_err();
        assert_eq!(err, DecodeError::Short { expected: 20, actual: 19 });
    }

    #[test]
    fn decode_ignores_declared_length_mismatch() {
        // A real device's declared length is always correct, but decode
        // must not depend on that: a wire buffer with a lying length field
        // still decodes using the actual trailing bytes.
        let mut wire = encode([1; 6], [2; 6], 5, 9, b"hello").expect("encode");
        wire[14] = 0xFF; // corrupt the declared length
        wire[15] = 0xFF;
        let frame = decode(&wire).expect("decode");
        assert_eq!(frame.payload(), b"hello");
    }

    proptest! {
        #[test]
        fn round_trip(
            src in any::<[u8; 6]>(),
            dst in any::<[u8; 6]>(),
            a in any::<u16>(),
            b in any::<u16>(),
            payload in prop::collection::vec(any::<u8>(), 0..=300),
        ) {
            let wire = encode(src, dst, a, b, &payload).expect("encode");
            let frame = decode(&wire).expect("decode");
            prop_assert_eq!(frame.src_mac(), src);
            prop_assert_eq!(frame.dst_mac(), dst);
            prop_assert_eq!(frame.counters(), (a, b));
            prop_assert_eq!(frame.payload(), payload.as_slice());
        }

        #[test]
        fn header_length_matches_payload_when_honest(
            payload in prop::collection::vec(any::<u8>(), 0..=300),
        ) {
            let wire = encode([0; 6], [0; 6], 0, 0, &payload).expect("encode");
            let frame = decode(&wire).expect("decode");
            prop_assert_eq!(frame.declared_length() as usize, payload.len());
        }
    }
}

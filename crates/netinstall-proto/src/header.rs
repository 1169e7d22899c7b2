//! The 20-byte frame header, little-endian throughout.
//!
//! ```text
//! offset  size  field
//!      0     6  src_mac
//!      6     6  dst_mac
//!     12     2  reserved (always 0)
//!     14     2  length (payload length, advisory only)
//!     16     2  counter_a
//!     18     2  counter_b
//! ```

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::DecodeError;

/// Fixed 20-byte frame header.
///
/// All multi-byte fields are little-endian. Stored as raw byte arrays so the
/// struct can be cast directly from wire bytes with no intermediate copy.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, PartialEq, Eq)]
pub struct FrameHeader {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    reserved: [u8; 2],
    length: [u8; 2],
    counter_a: [u8; 2],
    counter_b: [u8; 2],
}

impl FrameHeader {
    /// Size of the header on the wire.
    pub const SIZE: usize = 20;

    /// Build a header from its logical fields, computing `length` from
    /// `payload_len`.
    #[must_use]
    pub fn new(
        src_mac: [u8; 6],
        dst_mac: [u8; 6],
        counter_a: u16,
        counter_b: u16,
        payload_len: u16,
    ) -> Self {
        Self {
            src_mac,
            dst_mac,
            reserved: [0, 0],
            length: payload_len.to_le_bytes(),
            counter_a: counter_a.to_le_bytes(),
            counter_b: counter_b.to_le_bytes(),
        }
    }

    /// Parse a header from the first [`Self::SIZE`] bytes of `bytes`.
    ///
    /// Does not validate `reserved` or `length`; those are advisory fields a
    /// real RouterBOARD always sets correctly but callers must not rely on.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Short`] if `bytes` is shorter than
    /// [`Self::SIZE`].
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self, DecodeError> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _rest)| header)
            .map_err(|_| DecodeError::Short { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Serialize the header to its 20-byte wire form.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(&self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Sender's interface MAC address.
    #[must_use]
    pub fn src_mac(&self) -> [u8; 6] {
        self.src_mac
    }

    /// Receiver's interface MAC address (all-zero for discovery frames).
    #[must_use]
    pub fn dst_mac(&self) -> [u8; 6] {
        self.dst_mac
    }

    /// Declared payload length. Advisory only; not validated against the
    /// datagram's actual size by [`crate::Frame::decode`].
    #[must_use]
    pub fn length(&self) -> u16 {
        u16::from_le_bytes(self.length)
    }

    /// First sequence counter (`counter_a`). See the crate-level docs on the
    /// convention for inbound vs. outbound frames.
    #[must_use]
    pub fn counter_a(&self) -> u16 {
        u16::from_le_bytes(self.counter_a)
    }

    /// Second sequence counter (`counter_b`).
    #[must_use]
    pub fn counter_b(&self) -> u16 {
        u16::from_le_bytes(self.counter_b)
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("src_mac", &mac_string(self.src_mac))
            .field("dst_mac", &mac_string(self.dst_mac))
            .field("length", &self.length())
            .field("counter_a", &self.counter_a())
            .field("counter_b", &self.counter_b())
            .finish()
    }
}

fn mac_string(mac: [u8; 6]) -> String {
    mac.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

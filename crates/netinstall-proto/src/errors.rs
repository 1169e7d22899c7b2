//! Error types for frame encoding and decoding.

use thiserror::Error;

/// Errors that can occur while building the wire bytes of a frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The payload exceeds the 16-bit length field (65535 bytes).
    #[error("payload of {len} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLong {
        /// Length of the payload that was rejected.
        len: usize,
        /// Maximum payload length the header's length field can represent.
        max: usize,
    },
}

/// Errors that can occur while parsing a frame off the wire.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than [`crate::HEADER_LEN`] bytes were supplied; a header cannot
    /// be read at all.
    #[error("frame of {actual} bytes is shorter than the {expected}-byte header")]
    Short {
        /// Bytes required to hold a header.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },
}

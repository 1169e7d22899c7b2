//! Wire framing for the Etherboot netinstall session protocol.
//!
//! Every datagram exchanged with a RouterBOARD in netinstall mode is a
//! 20-byte little-endian header followed by an opaque payload (see
//! [`FrameHeader`]). This crate only knows that byte layout: addressing,
//! sequencing semantics, and the higher-level request/response state
//! machine live in `netinstall`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod errors;
mod frame;
mod header;

pub use errors::{DecodeError, EncodeError};
pub use frame::{MAX_PAYLOAD_LEN, Frame, decode, encode};
pub use header::FrameHeader;

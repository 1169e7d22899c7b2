//! The Offer-to-Reboot request/response state machine driven once per
//! discovered device.

use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::counters::SessionCounters;
use crate::device::DeviceInfo;
use crate::error::AbortFlashing;
use crate::transport::LinkTransport;

/// Size of every non-final `FileBody` chunk.
const MAX_BYTES: usize = 1024;

/// Magic bytes an NPK firmware package must begin with.
const NPK_MAGIC: [u8; 4] = [0x1E, 0xF1, 0xD0, 0xBA];

/// Tunables for one session: how many out-of-sync frames to tolerate before
/// giving up on a wait, and how long to pause between bulk chunks.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Number of out-of-sync or foreign datagrams tolerated per wait before
    /// the session aborts with [`AbortFlashing::MaxErrorsExceeded`].
    pub max_errors: u32,
    /// Pause after each non-final `FileBody` chunk. Load-bearing: too low
    /// desynchronizes the device's counter, too high slows flashing
    /// unacceptably. See the design notes for why this stays a tunable
    /// with this default rather than being hardcoded or removed.
    pub chunk_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_errors: 25, chunk_delay: Duration::from_millis(5) }
    }
}

/// One file to upload during `FileHeader`/`FileBody`/`PostFile`: its wire
/// name (which, for the initial configuration script, is always
/// `autorun.scr` regardless of the name on disk), its exact byte length,
/// and an open reader positioned at its first byte.
pub struct UploadItem {
    /// Name sent in the `FILE` header. Not necessarily the file's name on
    /// disk or in its source URL.
    pub wire_name: String,
    /// Exact byte length; drives chunk-count arithmetic, so it must be
    /// accurate before the upload starts (no streaming length discovery).
    pub size: u64,
    /// Open reader, positioned at offset 0.
    pub reader: Box<dyn Read>,
}

/// Drives one device through the full `Offer` -> `Reboot` protocol.
pub struct SessionEngine<'a, T: LinkTransport> {
    transport: &'a T,
    device: &'a DeviceInfo,
    counters: SessionCounters,
    config: SessionConfig,
    interrupted: &'a AtomicBool,
}

impl<'a, T: LinkTransport> SessionEngine<'a, T> {
    /// Start a fresh session (`ours = 0, theirs = 0`) for `device`.
    #[must_use]
    pub fn new(
        transport: &'a T,
        device: &'a DeviceInfo,
        config: SessionConfig,
        interrupted: &'a AtomicBool,
    ) -> Self {
        Self { transport, device, counters: SessionCounters::new(), config, interrupted }
    }

    /// Run the full protocol: `Offer`, a pre-flight NPK check on the first
    /// upload, `Format`, one `PreFile`/`FileHeader`/`FileBody`/`PostFile`
    /// cycle per upload in order, `Finalize`, then `Reboot`.
    ///
    /// `uploads` must be non-empty; its first element is the firmware
    /// package and is the one the NPK pre-flight check inspects.
    ///
    /// # Errors
    ///
    /// Returns [`AbortFlashing`] on any protocol mismatch, I/O error, or
    /// operator interruption. See the phase table in the module-level
    /// protocol documentation for what each phase requires of a reply.
    pub fn run(mut self, mut uploads: Vec<UploadItem>) -> Result<(), AbortFlashing> {
        debug!(variant = "OFFR\\n<key>\\n\\n\\n\\0", "sending Offer with the most-recent payload form");
        self.do_step("Offer", &offer_payload(&self.device.license_key), Some(b"YACK\n"))?;

        self.preflight_check(&mut uploads[0])?;

        self.do_step("Format", b"", Some(b"STRT"))?;

        for item in uploads {
            self.do_step("PreFile", b"", Some(b"RETR"))?;

            let header = format!("FILE\n{}\n{}\n", item.wire_name, item.size);
            self.do_step_tolerant("FileHeader", header.as_bytes(), b"RETR")?;

            let mut reader = item.reader;
            self.send_file_body(reader.as_mut(), item.size)?;

            self.do_step("PostFile", b"", Some(b"RETR"))?;
        }

        self.do_step("Finalize", b"FILE\n", Some(b"WTRM"))?;
        self.do_step("Reboot", b"TERM\n", None)?;

        Ok(())
    }

    /// Read the firmware's first four bytes and require the NPK magic
    /// number, without losing those bytes for the real upload later.
    fn preflight_check(&self, firmware: &mut UploadItem) -> Result<(), AbortFlashing> {
        let placeholder: Box<dyn Read> = Box::new(io::empty());
        let original = std::mem::replace(&mut firmware.reader, placeholder);
        let (magic, rest) = peek_magic(original)?;
        firmware.reader = rest;

        if magic != NPK_MAGIC {
            return Err(AbortFlashing::NotAnNpkPackage {
                path: PathBuf::from(&firmware.wire_name),
            });
        }
        Ok(())
    }

    /// `do(payload, expected)` from the protocol design: pre-increment
    /// `ours`, send, and — unless `expected` is `None` — block for one
    /// in-sync reply and require its payload match exactly.
    fn do_step(
        &mut self,
        phase: &'static str,
        payload: &[u8],
        expected: Option<&[u8]>,
    ) -> Result<(), AbortFlashing> {
        self.check_interrupted()?;
        let (counter_a, counter_b) = self.counters.prepare_send();
        self.transport.send(payload, counter_a, counter_b, self.device.mac)?;

        let Some(expected) = expected else { return Ok(()) };
        let frame = self.wait_in_sync()?;
        self.counters.observe(frame.counter_a());
        if frame.payload() != expected {
            return Err(AbortFlashing::UnexpectedReply {
                phase,
                expected: expected.to_vec(),
                actual: frame.payload().to_vec(),
            });
        }
        Ok(())
    }

    /// Like [`Self::do_step`], but a missing reply (timeout or exhausted
    /// retries) is tolerated and treated as success — the `FileHeader`
    /// carve-out some devices require.
    fn do_step_tolerant(
        &mut self,
        phase: &'static str,
        payload: &[u8],
        expected: &[u8],
    ) -> Result<(), AbortFlashing> {
        self.check_interrupted()?;
        let (counter_a, counter_b) = self.counters.prepare_send();
        self.transport.send(payload, counter_a, counter_b, self.device.mac)?;

        match self.wait_in_sync() {
            Ok(frame) => {
                self.counters.observe(frame.counter_a());
                if frame.payload() != expected {
                    return Err(AbortFlashing::UnexpectedReply {
                        phase,
                        expected: expected.to_vec(),
                        actual: frame.payload().to_vec(),
                    });
                }
                Ok(())
            }
            Err(AbortFlashing::Timeout | AbortFlashing::MaxErrorsExceeded) => {
                debug!(phase, "no reply to tolerate-missing phase; proceeding anyway");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Stream `size` bytes from `reader` in `MAX_BYTES`-sized chunks,
    /// micro-waiting and pacing between non-final chunks, and requiring
    /// `"RETR"` after the final one.
    fn send_file_body(&mut self, reader: &mut dyn Read, size: u64) -> Result<(), AbortFlashing> {
        let mut buf = vec![0u8; MAX_BYTES];
        let mut sent: u64 = 0;

        while sent < size {
            self.check_interrupted()?;
            let remaining = size - sent;
            let chunk_len = usize::try_from(remaining.min(MAX_BYTES as u64)).unwrap_or(MAX_BYTES);
            reader.read_exact(&mut buf[..chunk_len])?;

            let (counter_a, counter_b) = self.counters.prepare_send();
            self.transport.send(&buf[..chunk_len], counter_a, counter_b, self.device.mac)?;
            sent += chunk_len as u64;

            if sent == size {
                let frame = self.wait_in_sync()?;
                self.counters.observe(frame.counter_a());
                if frame.payload() != b"RETR" {
                    return Err(AbortFlashing::UnexpectedReply {
                        phase: "FileBody",
                        expected: b"RETR".to_vec(),
                        actual: frame.payload().to_vec(),
                    });
                }
            } else {
                self.recv_from_device()?;
                thread::sleep(self.config.chunk_delay);
            }
        }
        Ok(())
    }

    /// Block until a reply whose `counter_b` acknowledges our last send
    /// arrives from the device, retrying up to `max_errors` times against
    /// out-of-sync or foreign frames.
    ///
    /// A plain receive timeout aborts immediately rather than counting
    /// against the retry budget: the protocol distinguishes "nothing
    /// arrived" from "the wrong thing arrived".
    fn wait_in_sync(&mut self) -> Result<netinstall_proto::Frame, AbortFlashing> {
        for _ in 0..self.config.max_errors {
            self.check_interrupted()?;
            let (frame, src_ip) = self.transport.recv()?;
            if !self.transport.accept_peer(src_ip, &frame) {
                continue;
            }
            if self.counters.is_in_sync(frame.counter_b()) {
                return Ok(frame);
            }
        }
        Err(AbortFlashing::MaxErrorsExceeded)
    }

    /// One receive whose only requirement is that it came from the device,
    /// ignoring both its payload and its counters. Used for the `FileBody`
    /// micro-wait, where "content ignored" is the whole point.
    fn recv_from_device(&mut self) -> Result<netinstall_proto::Frame, AbortFlashing> {
        for _ in 0..self.config.max_errors {
            self.check_interrupted()?;
            let (frame, src_ip) = self.transport.recv()?;
            if self.transport.accept_peer(src_ip, &frame) {
                return Ok(frame);
            }
        }
        Err(AbortFlashing::MaxErrorsExceeded)
    }

    fn check_interrupted(&self) -> Result<(), AbortFlashing> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Err(AbortFlashing::Interrupted);
        }
        Ok(())
    }
}

/// Build the `Offer` phase payload: the most-recent on-wire form (see the
/// design notes on why the older, shorter variant is not used).
fn offer_payload(license_key: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(license_key.len() + 9);
    payload.extend_from_slice(b"OFFR\n");
    payload.extend_from_slice(license_key.as_bytes());
    payload.extend_from_slice(b"\n\n\n\0");
    payload
}

/// Read the first four bytes from `reader` and return them alongside a
/// reader that still yields them first, so the peek doesn't consume data
/// the caller needs to stream in full afterwards.
fn peek_magic(mut reader: Box<dyn Read>) -> Result<([u8; 4], Box<dyn Read>), AbortFlashing> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    let chained: Box<dyn Read> = Box::new(Cursor::new(magic).chain(reader));
    Ok((magic, chained))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_payload_uses_the_most_recent_form() {
        assert_eq!(offer_payload("KEY1"), b"OFFR\nKEY1\n\n\n\0");
    }

    #[test]
    fn peek_magic_does_not_lose_bytes() {
        let data: Vec<u8> = (0..16u8).collect();
        let (magic, mut rest) = peek_magic(Box::new(Cursor::new(data.clone()))).expect("peek");
        assert_eq!(magic, [0, 1, 2, 3]);
        let mut all = Vec::new();
        rest.read_to_end(&mut all).expect("read");
        assert_eq!(all, data);
    }

    #[test]
    fn npk_magic_matches_spec_constant() {
        assert_eq!(NPK_MAGIC, [0x1E, 0xF1, 0xD0, 0xBA]);
    }

    /// A 2500-byte firmware chunks as 1024, 1024, 452, with no
    /// trailing zero-length chunk.
    #[test]
    fn chunk_sizes_for_a_2500_byte_file() {
        let size: u64 = 2500;
        let mut sent: u64 = 0;
        let mut sizes = Vec::new();
        while sent < size {
            let remaining = size - sent;
            let chunk_len = remaining.min(MAX_BYTES as u64);
            sizes.push(chunk_len);
            sent += chunk_len;
        }
        assert_eq!(sizes, vec![1024, 1024, 452]);
    }

    /// A file whose size is an exact multiple of 1024 ends on a full chunk,
    /// never an empty trailing one.
    #[test]
    fn chunk_sizes_for_an_exact_multiple_of_1024() {
        let size: u64 = 2048;
        let mut sent: u64 = 0;
        let mut sizes = Vec::new();
        while sent < size {
            let remaining = size - sent;
            let chunk_len = remaining.min(MAX_BYTES as u64);
            sizes.push(chunk_len);
            sent += chunk_len;
        }
        assert_eq!(sizes, vec![1024, 1024]);
    }
}

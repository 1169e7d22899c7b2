//! Listening for a RouterBOARD's unsolicited discovery announcement.

use tracing::{debug, trace};

use crate::device::DeviceInfo;
use crate::error::AbortFlashing;
use crate::transport::LinkTransport;

/// A discovery announcement's counters: an unsolicited frame always arrives
/// as `(counter_a, counter_b) == (1, 0)`.
const ANNOUNCEMENT_COUNTERS: (u16, u16) = (1, 0);

/// Wait for one device to announce itself.
///
/// Blocks on the transport until either a genuine announcement arrives
/// (`Ok(Some(..))`), the receive times out (`Ok(None)`, telling the
/// supervisor to loop back), or the operator interrupts (propagated as
/// [`AbortFlashing::Interrupted`] by the caller's signal check — this
/// function itself only watches the socket).
///
/// Frames that don't look like a discovery announcement (our own echoed
/// broadcast, a stray host on the segment, a mid-session retransmit from a
/// device we're not tracking) are logged and skipped without consuming the
/// caller's timeout budget again.
///
/// # Errors
///
/// Propagates [`AbortFlashing::Io`] for socket errors other than a plain
/// timeout.
pub fn discover<T: LinkTransport>(transport: &T) -> Result<Option<DeviceInfo>, AbortFlashing> {
    loop {
        let (frame, src_ip) = match transport.recv() {
            Ok(pair) => pair,
            Err(AbortFlashing::Timeout) => return Ok(None),
            Err(err) => return Err(err),
        };

        if !transport.accept_peer(src_ip, &frame) {
            trace!(?src_ip, src_mac = ?frame.src_mac(), "ignoring frame from non-device peer during discovery");
            continue;
        }

        if frame.counters() != ANNOUNCEMENT_COUNTERS {
            debug!(counters = ?frame.counters(), "ignoring non-announcement frame during discovery");
            continue;
        }

        match DeviceInfo::from_frame(&frame) {
            Ok(device) => return Ok(Some(device)),
            Err(err) => {
                debug!(%err, "ignoring malformed announcement");
                continue;
            }
        }
    }
}

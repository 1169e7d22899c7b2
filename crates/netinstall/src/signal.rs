//! SIGTERM/SIGINT handling for the supervisor loop.

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Flags flipped by signal handlers, polled from the supervisor loop and
/// the session engine's wait points.
#[derive(Clone)]
pub struct Signals {
    /// Set on `SIGTERM`: the supervisor should finish or abandon the
    /// current session and exit cleanly (code 0).
    pub terminate: Arc<AtomicBool>,
    /// Set on `SIGINT` (Ctrl+C): the current session should abort
    /// immediately and the process should exit with code 130.
    pub interrupt: Arc<AtomicBool>,
}

impl Signals {
    /// Register handlers for `SIGTERM` and `SIGINT` that flip atomic flags;
    /// no other work happens on the signal thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `signal_hook` cannot register a handler.
    pub fn install() -> io::Result<Self> {
        let terminate = Arc::new(AtomicBool::new(false));
        let interrupt = Arc::new(AtomicBool::new(false));

        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&terminate))?;
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupt))?;

        Ok(Self { terminate, interrupt })
    }
}

//! The outer loop: discover a device, flash it, repeat.

use std::sync::atomic::Ordering;

use tracing::{info, warn};

use crate::discovery;
use crate::error::{AbortFlashing, InstallError};
use crate::provider::{self, FileProvider};
use crate::session::{SessionConfig, SessionEngine};
use crate::signal::Signals;
use crate::transport::LinkTransport;

/// Run the supervisor loop against `transport`, using `provider` to resolve
/// each discovered device's files.
///
/// Without `oneshot`, runs until `SIGTERM` or `Ctrl+C`; per-device aborts
/// are logged and the loop continues to the next device. With `oneshot`,
/// flashes exactly one device and returns its outcome.
///
/// # Errors
///
/// Returns [`InstallError::Fatal`] if the provider cannot be consulted,
/// [`InstallError::Abort`] if `oneshot` is set and the one session aborts,
/// and [`InstallError::Interrupted`] if `Ctrl+C` was pressed.
pub fn run<T: LinkTransport>(
    transport: &T,
    provider: &dyn FileProvider,
    signals: &Signals,
    session_config: SessionConfig,
    oneshot: bool,
) -> Result<(), InstallError> {
    loop {
        if signals.terminate.load(Ordering::Relaxed) {
            info!("SIGTERM received, exiting");
            return Ok(());
        }

        let device = match discovery::discover(transport) {
            Ok(Some(device)) => device,
            Ok(None) => continue,
            Err(err) => {
                warn!(%err, "discovery error, retrying");
                continue;
            }
        };
        info!(model = %device.model, architecture = %device.architecture, mac = ?device.mac, "device discovered");

        let outcome = flash_one(transport, provider, &device, signals, session_config);

        match outcome {
            Ok(()) => info!(model = %device.model, "flash complete, device rebooting"),
            Err(InstallError::Interrupted) => return Err(InstallError::Interrupted),
            Err(InstallError::Fatal(err)) => return Err(InstallError::Fatal(err)),
            Err(InstallError::Abort(err)) => {
                warn!(%err, "session aborted");
                if oneshot {
                    return Err(InstallError::Abort(err));
                }
            }
        }

        if oneshot {
            return Ok(());
        }
    }
}

fn flash_one<T: LinkTransport>(
    transport: &T,
    provider: &dyn FileProvider,
    device: &crate::device::DeviceInfo,
    signals: &Signals,
    session_config: SessionConfig,
) -> Result<(), InstallError> {
    let files = provider.get_files(device)?;
    let uploads = provider::build_uploads(files)?;

    let engine = SessionEngine::new(transport, device, session_config, &signals.interrupt);
    match engine.run(uploads) {
        Ok(()) => Ok(()),
        Err(AbortFlashing::Interrupted) => Err(InstallError::Interrupted),
        Err(err) => Err(InstallError::Abort(err)),
    }
}

//! The three-tier error model: [`FatalError`] aborts the process outright,
//! [`AbortFlashing`] aborts the current device's session only, and
//! [`InstallError`] is what the supervisor loop ultimately reports to `main`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that make the whole run unable to continue: bad configuration,
/// an unusable interface, a file the configuration names but that does not
/// exist. Maps to process exit code 2.
#[derive(Debug, Error)]
pub enum FatalError {
    /// The configuration file could not be read.
    #[error("configuration file {path:?} could not be read: {source}")]
    ConfigUnreadable {
        /// Path that was passed to `--config`.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration file parsed but is missing a required key.
    #[error("configuration file {path:?} has no `{key}` key in [{section}]")]
    MissingKey {
        /// Path that was passed to `--config`.
        path: PathBuf,
        /// INI section the key was expected in.
        section: &'static str,
        /// Key that was expected.
        key: &'static str,
    },

    /// The named network interface does not exist or has no MAC address.
    #[error("interface {name:?} has no usable MAC address")]
    InterfaceUnusable {
        /// Interface name passed to `--interface`.
        name: String,
    },

    /// A file the configuration or a provider named could not be opened.
    #[error("{path:?} could not be opened: {source}")]
    FileUnreadable {
        /// Path that was supposed to hold a file to upload.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The firmware provider failed to produce files for a device.
    #[error("file provider failed: {0}")]
    ProviderFailed(String),

    /// An HTTP(S) fetch of a remote file failed.
    #[error("could not fetch {url}: {source}")]
    FetchFailed {
        /// URL that was requested.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors that abort the in-progress session with one device but do not
/// affect the supervisor's ability to service the next one. Maps to process
/// exit code 1 when `--oneshot` turns it into a process outcome; otherwise
/// the supervisor logs it and loops back to discovery.
#[derive(Debug, Error)]
pub enum AbortFlashing {
    /// The firmware file's first four bytes are not the NPK magic number.
    #[error("{path:?} is not an NPK package (bad magic)")]
    NotAnNpkPackage {
        /// Path of the file that failed the pre-flight check.
        path: PathBuf,
    },

    /// A discovery announcement's payload did not have the rows the
    /// protocol requires (one ignored row, then license id, license key,
    /// model, architecture, minimum RouterOS version).
    #[error("malformed discovery announcement: {payload:?}")]
    MalformedAnnouncement {
        /// Raw payload bytes that failed to parse.
        payload: Vec<u8>,
    },

    /// A reply's payload did not match what the phase required.
    #[error("unexpected reply in {phase}: expected {expected:?}, got {actual:?}")]
    UnexpectedReply {
        /// Name of the phase that issued the request.
        phase: &'static str,
        /// Payload bytes the phase required.
        expected: Vec<u8>,
        /// Payload bytes actually received.
        actual: Vec<u8>,
    },

    /// No datagram arrived before the transport's receive timeout elapsed.
    #[error("timed out waiting for a reply")]
    Timeout,

    /// `MAX_ERRORS` consecutive out-of-sync or foreign datagrams were
    /// received without finding one that advanced the session.
    #[error("gave up after too many out-of-sync replies")]
    MaxErrorsExceeded,

    /// The operator requested shutdown (Ctrl+C) mid-session.
    #[error("interrupted by the operator")]
    Interrupted,

    /// Socket I/O failed outside of a plain receive timeout.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// A datagram could not be decoded as a frame.
    #[error("malformed frame: {0}")]
    Decode(#[from] netinstall_proto::DecodeError),

    /// A frame could not be encoded (payload too large).
    #[error("could not encode frame: {0}")]
    Encode(#[from] netinstall_proto::EncodeError),
}

/// The outcome the supervisor reports to `main`, which maps it to a process
/// exit code.
#[derive(Debug, Error)]
pub enum InstallError {
    /// See [`FatalError`]. Exit code 2.
    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// See [`AbortFlashing`]. Exit code 1; only surfaces here under
    /// `--oneshot`, since in service mode the supervisor swallows aborts and
    /// loops back to discovery instead.
    #[error(transparent)]
    Abort(#[from] AbortFlashing),

    /// The operator pressed Ctrl+C. Exit code 130.
    #[error("interrupted")]
    Interrupted,
}

impl InstallError {
    /// Process exit code this error should produce.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Fatal(_) => 2,
            Self::Abort(_) => 1,
            Self::Interrupted => 130,
        }
    }
}

//! The pluggable file provider: maps a discovered device to the firmware,
//! extra packages, and optional configuration script to upload.
//!
//! The upstream tool loads these dynamically as Python modules; here the
//! equivalent extension point is a static registry of built-in providers
//! (see [`simple`]) plus [`external`], which shells out to a user-supplied
//! executable instead of loading foreign code into the process.

pub mod external;
pub mod simple;

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use crate::config::Config;
use crate::device::DeviceInfo;
use crate::error::FatalError;
use crate::session::UploadItem;

/// Wire name the initial configuration script is always uploaded under,
/// regardless of its name on disk or at its source URL.
pub const CONFIG_WIRE_NAME: &str = "autorun.scr";

/// A file named by a provider: either a path on the local filesystem or an
/// HTTP(S) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A local filesystem path.
    Path(PathBuf),
    /// An HTTP or HTTPS URL, fetched with a blocking request when opened.
    Url(String),
}

impl FileSource {
    /// Parse a provider-supplied string as a URL if it has an `http(s)://`
    /// scheme, otherwise as a local path.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }

    /// The file's base name, used as the default wire name.
    #[must_use]
    pub fn default_name(&self) -> String {
        match self {
            Self::Path(path) => {
                path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
            }
            Self::Url(url) => url.rsplit('/').next().unwrap_or(url).to_string(),
        }
    }

    /// Open the source for reading, returning a reader and its exact byte
    /// length.
    ///
    /// A URL is fetched in full into memory up front: the protocol needs an
    /// exact length before the first chunk is sent, and an HTTP response
    /// doesn't reliably offer one without buffering anyway.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::FileUnreadable`] for local I/O failures or
    /// [`FatalError::FetchFailed`] for HTTP failures.
    pub fn open(&self) -> Result<(Box<dyn Read>, u64), FatalError> {
        match self {
            Self::Path(path) => {
                let metadata = fs::metadata(path).map_err(|source| FatalError::FileUnreadable {
                    path: path.clone(),
                    source,
                })?;
                let file = fs::File::open(path).map_err(|source| FatalError::FileUnreadable {
                    path: path.clone(),
                    source,
                })?;
                Ok((Box::new(file), metadata.len()))
            }
            Self::Url(url) => {
                let response = reqwest::blocking::get(url).map_err(|source| {
                    FatalError::FetchFailed { url: url.clone(), source }
                })?;
                let bytes = response
                    .bytes()
                    .map_err(|source| FatalError::FetchFailed { url: url.clone(), source })?;
                let len = bytes.len() as u64;
                Ok((Box::new(std::io::Cursor::new(bytes.to_vec())), len))
            }
        }
    }
}

/// What a provider resolves a device to: a required firmware package, zero
/// or more extra packages, and an optional initial configuration script.
pub struct ProvidedFiles {
    /// The `.npk` firmware package. Always uploaded first.
    pub firmware: FileSource,
    /// Additional `.npk` packages, uploaded after the firmware in order.
    pub extra_packages: Vec<FileSource>,
    /// An optional RouterOS configuration script, uploaded last under the
    /// fixed name [`CONFIG_WIRE_NAME`].
    pub config: Option<FileSource>,
}

/// A replaceable component that maps a discovered device to the files to
/// install on it.
pub trait FileProvider {
    /// Resolve `device` to the files to install.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError`] if the provider cannot determine what to
    /// install (missing configuration, unreachable external process, and
    /// so on).
    fn get_files(&self, device: &DeviceInfo) -> Result<ProvidedFiles, FatalError>;
}

/// Build the ordered list of uploads from a resolved [`ProvidedFiles`]:
/// firmware, then extra packages in order, then the optional configuration
/// script renamed to [`CONFIG_WIRE_NAME`].
///
/// # Errors
///
/// Returns [`FatalError`] if any named source cannot be opened.
pub fn build_uploads(files: ProvidedFiles) -> Result<Vec<UploadItem>, FatalError> {
    let mut uploads = Vec::with_capacity(2 + files.extra_packages.len());

    let (reader, size) = files.firmware.open()?;
    uploads.push(UploadItem { wire_name: files.firmware.default_name(), size, reader });

    for extra in files.extra_packages {
        let (reader, size) = extra.open()?;
        uploads.push(UploadItem { wire_name: extra.default_name(), size, reader });
    }

    if let Some(config) = files.config {
        let (reader, size) = config.open()?;
        uploads.push(UploadItem { wire_name: CONFIG_WIRE_NAME.to_string(), size, reader });
    }

    Ok(uploads)
}

/// Resolve the provider named by `config.plugin`: the built-in `"simple"`
/// provider if unset or explicitly named, otherwise an external process
/// provider that runs the named executable.
///
/// # Errors
///
/// Never fails itself; provider construction is infallible; failures surface
/// later from [`FileProvider::get_files`].
pub fn resolve(config: &Config) -> Box<dyn FileProvider> {
    match config.plugin.as_deref() {
        None | Some("simple") => Box::new(simple::SimpleProvider::from_config(config)),
        Some(command) => Box::new(external::ExternalProcessProvider::new(PathBuf::from(command))),
    }
}

//! The `[pynetinstall]` INI configuration file.

use std::path::{Path, PathBuf};

use crate::error::FatalError;

const SECTION: &str = "pynetinstall";

/// Parsed `[pynetinstall]` section of the configuration file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path or URL to the `.npk` firmware package. Required.
    pub firmware: String,
    /// Path or URL to an initial configuration script, uploaded as
    /// `autorun.scr`. Optional.
    pub config: Option<String>,
    /// Paths or URLs to additional `.npk` packages, uploaded after the
    /// firmware in listed order.
    pub additional_packages: Vec<String>,
    /// Selects a file provider: `None` or `"simple"` for the built-in
    /// provider, anything else is the path to an external provider
    /// executable.
    pub plugin: Option<String>,
}

impl Config {
    /// Load and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::ConfigUnreadable`] if the file cannot be read
    /// or parsed as INI, or [`FatalError::MissingKey`] if `firmware` is
    /// absent from `[pynetinstall]`.
    pub fn load(path: &Path) -> Result<Self, FatalError> {
        let ini = ini::Ini::load_from_file(path)
            .map_err(|err| FatalError::ConfigUnreadable { path: path.to_path_buf(), source: to_io_error(&err) })?;

        let section = ini.section(Some(SECTION));

        let firmware = section
            .and_then(|s| s.get("firmware"))
            .ok_or_else(|| FatalError::MissingKey {
                path: path.to_path_buf(),
                section: SECTION,
                key: "firmware",
            })?
            .to_string();

        let config = section.and_then(|s| s.get("config")).map(str::to_string);

        let additional_packages = section
            .and_then(|s| s.get("additional_packages"))
            .map(|raw| raw.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();

        let plugin = section.and_then(|s| s.get("plugin")).map(str::to_string);

        Ok(Self { firmware, config, additional_packages, plugin })
    }
}

fn to_io_error(err: &ini::Error) -> std::io::Error {
    std::io::Error::other(err.to_string())
}

/// Default path searched when `--config` is not given.
#[must_use]
pub fn default_path() -> PathBuf {
    PathBuf::from("/etc/pynetinstall.ini")
}

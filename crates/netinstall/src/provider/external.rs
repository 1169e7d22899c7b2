//! A provider that shells out to a user-supplied executable instead of
//! dynamically loading foreign code into the process.
//!
//! This replaces the upstream tool's `importlib`-based plugin loading
//! (`module:Class`, imported and instantiated at runtime) with a static
//! binary: Rust has no equivalent late-binding import mechanism, and
//! reaching for one (e.g. loading a `cdylib` with `libloading`) would trade
//! a memory-safety boundary for a convenience this system doesn't need.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::device::DeviceInfo;
use crate::error::FatalError;
use crate::provider::{FileProvider, FileSource, ProvidedFiles};

/// Runs `executable`, feeds it the device descriptor on stdin, and parses
/// its stdout as the files to install.
///
/// Stdin is five `\n`-terminated fields: model, architecture, minimum OS
/// version, license id, license key (MAC is not sent; the caller already
/// knows it and the executable has no use for it).
///
/// Stdout is line-oriented, one tagged entry per line:
/// `FIRMWARE <path-or-url>` (required, exactly one),
/// `EXTRA <path-or-url>` (zero or more, in order),
/// `CONFIG <path-or-url>` (zero or one).
pub struct ExternalProcessProvider {
    executable: PathBuf,
}

impl ExternalProcessProvider {
    /// Wrap `executable` as a file provider.
    #[must_use]
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }
}

impl FileProvider for ExternalProcessProvider {
    fn get_files(&self, device: &DeviceInfo) -> Result<ProvidedFiles, FatalError> {
        let mut child = Command::new(&self.executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| FatalError::FileUnreadable { path: self.executable.clone(), source })?;

        {
            let stdin = child.stdin.as_mut().ok_or_else(|| FatalError::ProviderFailed(
                "external provider closed stdin before input could be written".to_string(),
            ))?;
            let request = format!(
                "{}\n{}\n{}\n{}\n{}\n",
                device.model, device.architecture, device.min_os_version, device.license_id,
                device.license_key,
            );
            stdin
                .write_all(request.as_bytes())
                .map_err(|source| FatalError::FileUnreadable { path: self.executable.clone(), source })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|source| FatalError::FileUnreadable { path: self.executable.clone(), source })?;

        if !output.status.success() {
            return Err(FatalError::ProviderFailed(format!(
                "{:?} exited with {}",
                self.executable, output.status,
            )));
        }

        parse_provider_output(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_provider_output(stdout: &str) -> Result<ProvidedFiles, FatalError> {
    let mut firmware = None;
    let mut extra_packages = Vec::new();
    let mut config = None;

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((tag, value)) = line.split_once(' ') else {
            return Err(FatalError::ProviderFailed(format!("unparseable provider output line: {line:?}")));
        };
        match tag {
            "FIRMWARE" => firmware = Some(FileSource::parse(value)),
            "EXTRA" => extra_packages.push(FileSource::parse(value)),
            "CONFIG" => config = Some(FileSource::parse(value)),
            other => {
                return Err(FatalError::ProviderFailed(format!("unknown provider output tag: {other:?}")));
            }
        }
    }

    let firmware = firmware
        .ok_or_else(|| FatalError::ProviderFailed("provider produced no FIRMWARE line".to_string()))?;

    Ok(ProvidedFiles { firmware, extra_packages, config })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_firmware_extras_and_config() {
        let output = "FIRMWARE /tmp/routeros.npk\nEXTRA /tmp/wireless.npk\nCONFIG /tmp/autorun.rsc\n";
        let files = parse_provider_output(output).expect("should parse");
        assert_eq!(files.firmware, FileSource::Path("/tmp/routeros.npk".into()));
        assert_eq!(files.extra_packages, vec![FileSource::Path("/tmp/wireless.npk".into())]);
        assert_eq!(files.config, Some(FileSource::Path("/tmp/autorun.rsc".into())));
    }

    #[test]
    fn firmware_is_required() {
        let err = parse_provider_output("EXTRA /tmp/wireless.npk\n").unwrap_err();
        assert!(matches!(err, FatalError::ProviderFailed(_)));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let output = "FIRMWARE /tmp/routeros.npk\n\n\n";
        let files = parse_provider_output(output).expect("should parse");
        assert!(files.extra_packages.is_empty());
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let err = parse_provider_output("FIRMWARE /tmp/routeros.npk\nWAT nope\n").unwrap_err();
        assert!(matches!(err, FatalError::ProviderFailed(_)));
    }
}

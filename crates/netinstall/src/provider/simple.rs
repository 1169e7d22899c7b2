//! The built-in provider: reads `firmware`, `additional_packages`, and
//! `config` straight out of the INI configuration file, the same file for
//! every device. Grounded on the upstream tool's default `simple` plugin,
//! which does the same thing without per-device logic.

use crate::config::Config;
use crate::device::DeviceInfo;
use crate::error::FatalError;
use crate::provider::{FileProvider, FileSource, ProvidedFiles};

/// Every device gets the same firmware, extra packages, and configuration
/// script named in the configuration file.
pub struct SimpleProvider {
    firmware: FileSource,
    extra_packages: Vec<FileSource>,
    config: Option<FileSource>,
}

impl SimpleProvider {
    /// Build a provider from the already-parsed configuration file.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            firmware: FileSource::parse(&config.firmware),
            extra_packages: config.additional_packages.iter().map(|raw| FileSource::parse(raw)).collect(),
            config: config.config.as_deref().map(FileSource::parse),
        }
    }
}

impl FileProvider for SimpleProvider {
    fn get_files(&self, _device: &DeviceInfo) -> Result<ProvidedFiles, FatalError> {
        Ok(ProvidedFiles {
            firmware: self.firmware.clone(),
            extra_packages: self.extra_packages.clone(),
            config: self.config.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> DeviceInfo {
        DeviceInfo {
            mac: [0; 6],
            license_id: "LIC".into(),
            license_key: "KEY".into(),
            model: "RB450G".into(),
            architecture: "mipsbe".into(),
            min_os_version: "6.45.9".into(),
        }
    }

    #[test]
    fn every_device_gets_the_same_files() {
        let provider = SimpleProvider {
            firmware: FileSource::Path("/tmp/routeros.npk".into()),
            extra_packages: vec![FileSource::Path("/tmp/extra.npk".into())],
            config: Some(FileSource::Path("/tmp/autorun.rsc".into())),
        };

        let files_a = provider.get_files(&sample_device()).expect("should resolve");
        let mut other = sample_device();
        other.mac = [1; 6];
        let files_b = provider.get_files(&other).expect("should resolve");

        assert_eq!(files_a.firmware, files_b.firmware);
        assert_eq!(files_a.extra_packages, files_b.extra_packages);
        assert_eq!(files_a.config, files_b.config);
    }

    #[test]
    fn no_config_key_means_no_config_upload() {
        let provider = SimpleProvider {
            firmware: FileSource::Path("/tmp/routeros.npk".into()),
            extra_packages: vec![],
            config: None,
        };
        let files = provider.get_files(&sample_device()).expect("should resolve");
        assert!(files.config.is_none());
    }
}

//! Parsing a discovered device's self-announcement.

use netinstall_proto::Frame;

use crate::error::AbortFlashing;

/// What a RouterBOARD told us about itself in its discovery announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Interface MAC address the announcement arrived from; every frame we
    /// send for the rest of the session is addressed to this MAC.
    pub mac: [u8; 6],
    /// License identifier, row 1 of the announcement payload.
    pub license_id: String,
    /// License key, row 2.
    pub license_key: String,
    /// Board model string, row 3 (e.g. `"RB450G"`).
    pub model: String,
    /// RouterOS architecture string, row 4 (e.g. `"mipsbe"`).
    pub architecture: String,
    /// Minimum RouterOS version the board's bootloader requires, row 5.
    pub min_os_version: String,
}

impl DeviceInfo {
    /// Parse a device's self-announcement from a discovery frame.
    ///
    /// The payload is `\n`-separated rows: an opaque leading row whose
    /// meaning is not otherwise used, then license id, license key, model,
    /// architecture, and minimum OS version.
    ///
    /// # Errors
    ///
    /// Returns [`AbortFlashing::MalformedAnnouncement`] if the payload has
    /// fewer than six rows.
    pub fn from_frame(frame: &Frame) -> Result<Self, AbortFlashing> {
        let text = String::from_utf8_lossy(frame.payload());
        let rows: Vec<&str> = text.split('\n').collect();

        let Some([_ignored, license_id, license_key, model, architecture, min_os_version]) =
            rows.first_chunk::<6>()
        else {
            return Err(AbortFlashing::MalformedAnnouncement { payload: frame.payload().to_vec() });
        };

        Ok(Self {
            mac: frame.src_mac(),
            license_id: (*license_id).to_string(),
            license_key: (*license_key).to_string(),
            model: (*model).to_string(),
            architecture: (*architecture).to_string(),
            min_os_version: (*min_os_version).to_string(),
        })
    }
}

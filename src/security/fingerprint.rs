//! Login fingerprint comparison.
//!
//! The user-agent string is parsed upstream; what reaches this module is the
//! structured fingerprint. Comparison is two-tier: device-identity fields
//! first (a mismatch there is a new device and ends the check), then
//! browser/OS fields (a mismatch there is only a new browser).

use serde::{Deserialize, Serialize};

use crate::entities::login_logs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fingerprint {
    pub browser_family: String,
    pub browser_version: String,
    pub os_family: String,
    pub os_version: String,
    pub device_family: String,
    pub device_brand: String,
    pub device_model: String,
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub is_pc: bool,
    pub is_bot: bool,
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self {
            browser_family: "N/A".to_string(),
            browser_version: "N/A".to_string(),
            os_family: "N/A".to_string(),
            os_version: "N/A".to_string(),
            device_family: "N/A".to_string(),
            device_brand: "N/A".to_string(),
            device_model: "N/A".to_string(),
            is_mobile: false,
            is_tablet: false,
            is_pc: false,
            is_bot: false,
        }
    }
}

impl From<&login_logs::Model> for Fingerprint {
    fn from(log: &login_logs::Model) -> Self {
        Self {
            browser_family: log.browser_family.clone(),
            browser_version: log.browser_version.clone(),
            os_family: log.os_family.clone(),
            os_version: log.os_version.clone(),
            device_family: log.device_family.clone(),
            device_brand: log.device_brand.clone(),
            device_model: log.device_model.clone(),
            is_mobile: log.is_mobile,
            is_tablet: log.is_tablet,
            is_pc: log.is_pc,
            is_bot: log.is_bot,
        }
    }
}

/// What changed between two consecutive logins, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintDrift {
    NewDevice,
    NewBrowser,
}

/// Compares a login against the previous one from the same account.
///
/// Device-identity differences win over browser differences; identical
/// fingerprints yield `None`.
#[must_use]
pub fn compare(previous: &Fingerprint, current: &Fingerprint) -> Option<FingerprintDrift> {
    let device_changed = previous.device_family != current.device_family
        || previous.device_brand != current.device_brand
        || previous.device_model != current.device_model
        || previous.is_mobile != current.is_mobile
        || previous.is_tablet != current.is_tablet
        || previous.is_pc != current.is_pc
        || previous.is_bot != current.is_bot;

    if device_changed {
        return Some(FingerprintDrift::NewDevice);
    }

    let browser_changed = previous.browser_family != current.browser_family
        || previous.browser_version != current.browser_version
        || previous.os_family != current.os_family
        || previous.os_version != current.os_version;

    if browser_changed {
        return Some(FingerprintDrift::NewBrowser);
    }

    None
}

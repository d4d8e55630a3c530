//! Device type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse device classification derived from the user-agent's device
/// family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "device_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Desktop or anything that is not recognizably mobile.
    Desktop,
    /// Phone-class device.
    Mobile,
    /// Tablet-class device.
    Tablet,
}

impl DeviceType {
    /// Classify a parsed device family by keyword.
    ///
    /// Matching is case-insensitive. Unrecognized and empty families
    /// (including the parser's `"Other"`) classify as desktop.
    pub fn classify(device_family: &str) -> Self {
        let family = device_family.to_lowercase();
        if ["mobile", "phone", "iphone", "android"]
            .iter()
            .any(|kw| family.contains(kw))
        {
            Self::Mobile
        } else if ["tablet", "ipad"].iter().any(|kw| family.contains(kw)) {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }

    /// Return the device type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! User-agent fingerprinting for session rows.

use identhub_entity::session::DeviceType;

/// Device/browser/OS signature derived from a user-agent string.
///
/// Shown to users so they can recognize their own logins; never used for
/// authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFingerprint {
    /// Desktop, mobile, or tablet.
    pub device_type: DeviceType,
    /// Browser product name, when recognized.
    pub browser: Option<String>,
    /// Operating system name, when recognized.
    pub operating_system: Option<String>,
}

impl ClientFingerprint {
    /// Parses a raw user-agent header value.
    ///
    /// An absent or unrecognizable user agent yields a desktop fingerprint
    /// with no browser/OS, matching how unknown devices are displayed.
    pub fn parse(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent else {
            return Self::unknown();
        };
        let ua_lower = ua.to_lowercase();

        Self {
            device_type: DeviceType::classify(device_family(&ua_lower)),
            browser: browser_name(&ua_lower).map(str::to_string),
            operating_system: os_name(&ua_lower).map(str::to_string),
        }
    }

    fn unknown() -> Self {
        Self {
            device_type: DeviceType::Desktop,
            browser: None,
            operating_system: None,
        }
    }
}

/// Maps a lowercased user agent to the device family the classifier keys on.
fn device_family(ua: &str) -> &'static str {
    if ua.contains("ipad") {
        "iPad"
    } else if ua.contains("iphone") {
        "iPhone"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("windows") {
        "Windows"
    } else if ua.contains("macintosh") || ua.contains("mac os") {
        "Mac"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Other"
    }
}

/// Recognizes the browser product. Order matters: Chromium-family browsers
/// embed `chrome` in their user agents, and Chrome embeds `safari`.
fn browser_name(ua: &str) -> Option<&'static str> {
    if ua.contains("edg/") || ua.contains("edge/") {
        Some("Edge")
    } else if ua.contains("opr/") || ua.contains("opera") {
        Some("Opera")
    } else if ua.contains("firefox/") {
        Some("Firefox")
    } else if ua.contains("chrome/") {
        Some("Chrome")
    } else if ua.contains("safari/") {
        Some("Safari")
    } else {
        None
    }
}

fn os_name(ua: &str) -> Option<&'static str> {
    if ua.contains("windows") {
        Some("Windows")
    } else if ua.contains("iphone") || ua.contains("ipad") {
        Some("iOS")
    } else if ua.contains("android") {
        Some("Android")
    } else if ua.contains("macintosh") || ua.contains("mac os") {
        Some("macOS")
    } else if ua.contains("linux") {
        Some("Linux")
    } else {
        None
    }
}

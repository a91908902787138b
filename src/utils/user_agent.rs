// src/utils/user_agent.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
            DeviceType::Unknown => "unknown",
        }
    }

    /// Lenient parse for values read back from storage.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("mobile") => DeviceType::Mobile,
            Some("tablet") => DeviceType::Tablet,
            Some("desktop") => DeviceType::Desktop,
            _ => DeviceType::Unknown,
        }
    }
}

/// Result of classifying a user-agent string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub browser: String,
    pub os: String,
}

static TABLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tablet|ipad|playbook|silk").expect("valid tablet regex"));

static MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Mobile|Android|iP(hone|od)|IEMobile|BlackBerry|Kindle|Silk-Accelerated|(hpw|web)OS|Opera M(obi|ini)",
    )
    .expect("valid mobile regex")
});

/// Android without a "mobi" token after it is a tablet.
fn is_android_tablet(ua_lower: &str) -> bool {
    match ua_lower.find("android") {
        Some(idx) => !ua_lower[idx..].contains("mobi"),
        None => false,
    }
}

/// Heuristic classification; first match wins in each chain.
pub fn detect_device(user_agent: &str) -> DeviceInfo {
    let ua = user_agent.to_lowercase();

    let device_type = if TABLET.is_match(user_agent) || is_android_tablet(&ua) {
        DeviceType::Tablet
    } else if MOBILE.is_match(user_agent) {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    };

    let browser = if ua.contains("edge") || ua.contains("edg/") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("chrome") || ua.contains("crios") {
        "Chrome"
    } else if ua.contains("firefox") || ua.contains("fxios") {
        "Firefox"
    } else if ua.contains("safari") {
        "Safari"
    } else if ua.contains("trident") || ua.contains("msie") {
        "Internet Explorer"
    } else {
        "Unknown"
    };

    // iOS and Android before macOS and Linux: their UAs carry "like Mac OS X" and "Linux".
    let os = if ua.contains("windows") {
        "Windows"
    } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        "iOS"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("mac os") {
        "macOS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Unknown"
    };

    DeviceInfo {
        device_type,
        browser: browser.to_string(),
        os: os.to_string(),
    }
}

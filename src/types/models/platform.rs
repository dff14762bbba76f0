use std::{fmt::Display, str::FromStr};

use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Win,
    #[serde(rename = "mac-arm")]
    MacArm,
    #[serde(rename = "mac-intel")]
    MacIntel,
    Android32,
    Android64,
    Ios,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid platform {0}")]
pub struct PlatformParseError(pub String);

impl FromStr for Platform {
    type Err = PlatformParseError;
    fn from_str(s: &str) -> Result<Self, PlatformParseError> {
        match s {
            "win" | "windows" => Ok(Platform::Win),
            "mac-arm" => Ok(Platform::MacArm),
            "mac-intel" => Ok(Platform::MacIntel),
            "android32" => Ok(Platform::Android32),
            "android64" | "android" => Ok(Platform::Android64),
            "ios" => Ok(Platform::Ios),
            _ => Err(PlatformParseError(s.to_string())),
        }
    }
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Win => "win",
            Platform::MacArm => "mac-arm",
            Platform::MacIntel => "mac-intel",
            Platform::Android32 => "android32",
            Platform::Android64 => "android64",
            Platform::Ios => "ios",
        }
    }

    /// The platform this binary was built for.
    pub fn current() -> Platform {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(all(target_os = "android", target_pointer_width = "32")) {
            Platform::Android32
        } else if cfg!(target_os = "android") {
            Platform::Android64
        } else if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
            Platform::MacArm
        } else if cfg!(target_os = "macos") {
            Platform::MacIntel
        } else {
            Platform::Win
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Supported platforms and crawl target kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform a crawl runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Telegram,
    Tiktok,
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Telegram => "telegram",
            Self::Tiktok => "tiktok",
            Self::Facebook => "facebook",
        }
    }

    /// Target kinds this platform can crawl
    pub fn supported_kinds(&self) -> &'static [TargetKind] {
        match self {
            Self::Twitter => &[TargetKind::Profile, TargetKind::Hashtag],
            Self::Telegram => &[TargetKind::Channel],
            Self::Tiktok => &[TargetKind::Profile, TargetKind::Hashtag],
            Self::Facebook => &[TargetKind::Page],
        }
    }

    /// Default kind when the caller does not specify one
    pub fn default_kind(&self) -> TargetKind {
        match self {
            Self::Twitter | Self::Tiktok => TargetKind::Profile,
            Self::Telegram => TargetKind::Channel,
            Self::Facebook => TargetKind::Page,
        }
    }

    pub fn supports(&self, kind: TargetKind) -> bool {
        self.supported_kinds().contains(&kind)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitter" => Ok(Self::Twitter),
            "telegram" => Ok(Self::Telegram),
            "tiktok" => Ok(Self::Tiktok),
            "facebook" => Ok(Self::Facebook),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// What kind of thing the target name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Profile,
    Hashtag,
    Channel,
    Page,
}

impl TargetKind {
    /// Kind label used in progress file names and the `type` field of the
    /// progress contract
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Hashtag => "hashtag",
            Self::Channel => "channel",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "hashtag" => Ok(Self::Hashtag),
            "channel" => Ok(Self::Channel),
            "page" => Ok(Self::Page),
            other => Err(format!("Unknown target kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_platform_roundtrip() {
        for platform in [
            Platform::Twitter,
            Platform::Telegram,
            Platform::Tiktok,
            Platform::Facebook,
        ] {
            assert_eq!(Platform::from_str(platform.as_str()).unwrap(), platform);
        }
        assert!(Platform::from_str("myspace").is_err());
    }

    #[test]
    fn test_supported_kinds() {
        assert!(Platform::Twitter.supports(TargetKind::Hashtag));
        assert!(!Platform::Telegram.supports(TargetKind::Page));
        assert_eq!(Platform::Facebook.default_kind(), TargetKind::Page);
    }

    #[test]
    fn test_kind_labels_match_progress_contract() {
        assert_eq!(TargetKind::Profile.as_str(), "profile");
        assert_eq!(TargetKind::Channel.as_str(), "channel");
    }
}

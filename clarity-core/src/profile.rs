//! User quality preferences.
//!
//! A [`PreferenceProfile`] is read once per resolution pass and replaced
//! wholesale when settings change. Field names on the wire match the keys the
//! preference store has always used, so older documents keep loading.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Matches explicit resolution targets such as `1080`, `hd720`, `1080p`,
/// `720p60` and `hd1080p 60`.
static LEVEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:hd)?(?P<height>\d{3,4})(?:p(?:\s?(?P<fps>\d{2,3}))?)?$")
        .expect("level pattern is a valid regex")
});

/// Errors produced while interpreting stored preference values.
#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    /// The quality string names no known target.
    #[error("Invalid quality target: '{value}'")]
    InvalidQuality {
        /// The rejected value
        value: String,
    },
}

/// A concrete resolution, optionally combined with a frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QualityLevel {
    /// Vertical resolution in lines, e.g. 1080
    pub height: u32,
    /// Frame rate of a combined target such as `720p60`
    pub frame_rate: Option<u32>,
}

impl QualityLevel {
    /// Creates a plain resolution target.
    pub fn new(height: u32) -> Self {
        Self {
            height,
            frame_rate: None,
        }
    }

    /// Creates a combined resolution and frame-rate target.
    pub fn with_frame_rate(height: u32, frame_rate: u32) -> Self {
        Self {
            height,
            frame_rate: Some(frame_rate),
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame_rate {
            Some(fps) => write!(f, "{}p{}", self.height, fps),
            None => write!(f, "{}", self.height),
        }
    }
}

/// Abstract quality the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QualityTarget {
    /// Let the player pick adaptively
    Auto,
    /// First (best) option the environment offers
    Highest,
    /// Enhanced-bitrate tier, falling back to the best option
    Premium,
    /// A specific resolution family
    Specific(QualityLevel),
}

impl QualityTarget {
    /// Returns the level for specific targets.
    pub fn level(&self) -> Option<QualityLevel> {
        match self {
            Self::Specific(level) => Some(*level),
            _ => None,
        }
    }
}

impl Default for QualityTarget {
    fn default() -> Self {
        Self::Specific(QualityLevel::new(1080))
    }
}

impl fmt::Display for QualityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Highest => write!(f, "highest"),
            Self::Premium => write!(f, "premium"),
            Self::Specific(level) => write!(f, "{level}"),
        }
    }
}

impl FromStr for QualityTarget {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let target = match normalized.as_str() {
            "auto" => Self::Auto,
            "highest" => Self::Highest,
            "premium" => Self::Premium,
            "tiny" => Self::Specific(QualityLevel::new(144)),
            "small" => Self::Specific(QualityLevel::new(240)),
            "medium" => Self::Specific(QualityLevel::new(360)),
            "large" => Self::Specific(QualityLevel::new(480)),
            "4k" => Self::Specific(QualityLevel::new(2160)),
            "8k" | "highres" => Self::Specific(QualityLevel::new(4320)),
            other => Self::Specific(parse_level(other).ok_or_else(|| {
                ProfileError::InvalidQuality {
                    value: s.to_string(),
                }
            })?),
        };
        Ok(target)
    }
}

impl TryFrom<String> for QualityTarget {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualityTarget> for String {
    fn from(target: QualityTarget) -> Self {
        target.to_string()
    }
}

fn parse_level(value: &str) -> Option<QualityLevel> {
    let captures = LEVEL_PATTERN.captures(value)?;
    let height: u32 = captures.name("height")?.as_str().parse().ok()?;
    if height == 0 {
        return None;
    }
    let frame_rate = match captures.name("fps") {
        Some(fps) => Some(fps.as_str().parse().ok()?),
        None => None,
    };
    Some(QualityLevel { height, frame_rate })
}

/// The user's quality preference as held by the preference store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceProfile {
    /// Master switch; a disabled profile never resolves to an option
    pub enabled: bool,
    /// Requested quality
    pub quality: QualityTarget,
    /// Always take the best option, overriding `quality`
    #[serde(rename = "highestQuality")]
    pub highest_quality: bool,
    /// Pin the quality range to the chosen option when the surface allows it
    #[serde(rename = "premiumBitrate")]
    pub premium_bitrate: bool,
    /// Prefer high-frame-rate variants within the target family
    #[serde(rename = "prefer60fps", alias = "force60fps")]
    pub prefer_high_frame_rate: bool,
    /// Prefer HDR variants within the target family
    #[serde(rename = "preferHDR", alias = "forceHDR")]
    pub prefer_hdr: bool,
    /// Record the applied quality through the preference store
    #[serde(rename = "persistQuality")]
    pub persist: bool,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            enabled: true,
            quality: QualityTarget::default(),
            highest_quality: false,
            premium_bitrate: false,
            prefer_high_frame_rate: false,
            prefer_hdr: false,
            persist: true,
        }
    }
}

impl PreferenceProfile {
    /// Creates an enabled profile for the given target with no variant
    /// preferences.
    pub fn targeting(quality: QualityTarget) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    /// Creates a profile that never resolves.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns true if the best available option should be taken.
    pub fn wants_highest(&self) -> bool {
        self.highest_quality || self.quality == QualityTarget::Highest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_targets() {
        assert_eq!("auto".parse::<QualityTarget>(), Ok(QualityTarget::Auto));
        assert_eq!("Highest".parse::<QualityTarget>(), Ok(QualityTarget::Highest));
        assert_eq!("premium".parse::<QualityTarget>(), Ok(QualityTarget::Premium));
        assert_eq!(
            "large".parse::<QualityTarget>(),
            Ok(QualityTarget::Specific(QualityLevel::new(480)))
        );
        assert_eq!(
            "4k".parse::<QualityTarget>(),
            Ok(QualityTarget::Specific(QualityLevel::new(2160)))
        );
    }

    #[test]
    fn test_parse_resolution_forms() {
        let expected = QualityTarget::Specific(QualityLevel::new(1080));
        for value in ["1080", "1080p", "hd1080", "HD1080"] {
            assert_eq!(value.parse::<QualityTarget>(), Ok(expected), "{value}");
        }

        let combined = QualityTarget::Specific(QualityLevel::with_frame_rate(720, 60));
        for value in ["720p60", "hd720p60", "720p 60"] {
            assert_eq!(value.parse::<QualityTarget>(), Ok(combined), "{value}");
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "ultra".parse::<QualityTarget>(),
            Err(ProfileError::InvalidQuality { .. })
        ));
        assert!("".parse::<QualityTarget>().is_err());
        assert!("0".parse::<QualityTarget>().is_err());
        assert!("1080x".parse::<QualityTarget>().is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(QualityTarget::Auto.to_string(), "auto");
        assert_eq!(
            QualityTarget::Specific(QualityLevel::new(1080)).to_string(),
            "1080"
        );
        assert_eq!(
            QualityTarget::Specific(QualityLevel::with_frame_rate(720, 60)).to_string(),
            "720p60"
        );
    }

    #[test]
    fn test_profile_deserializes_stored_keys() {
        let json = r#"{
            "enabled": true,
            "quality": "hd720",
            "highestQuality": false,
            "premiumBitrate": true,
            "prefer60fps": true,
            "preferHDR": false
        }"#;

        let profile: PreferenceProfile = serde_json::from_str(json).unwrap();

        assert_eq!(
            profile.quality,
            QualityTarget::Specific(QualityLevel::new(720))
        );
        assert!(profile.premium_bitrate);
        assert!(profile.prefer_high_frame_rate);
        assert!(!profile.prefer_hdr);
        // Missing key falls back to its default
        assert!(profile.persist);
    }

    #[test]
    fn test_profile_accepts_legacy_aliases() {
        let json = r#"{"quality": "auto", "force60fps": true, "forceHDR": true}"#;

        let profile: PreferenceProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.quality, QualityTarget::Auto);
        assert!(profile.prefer_high_frame_rate);
        assert!(profile.prefer_hdr);
    }

    #[test]
    fn test_profile_rejects_invalid_quality() {
        let json = r#"{"quality": "sharp"}"#;
        assert!(serde_json::from_str::<PreferenceProfile>(json).is_err());
    }

    #[test]
    fn test_profile_serializes_quality_as_string() {
        let profile = PreferenceProfile::targeting(QualityTarget::Premium);
        let value = serde_json::to_value(&profile).unwrap();

        assert_eq!(value["quality"], "premium");
        assert_eq!(value["persistQuality"], true);
        assert_eq!(value["prefer60fps"], false);
    }

    #[test]
    fn test_wants_highest() {
        assert!(PreferenceProfile::targeting(QualityTarget::Highest).wants_highest());

        let mut profile = PreferenceProfile::targeting(QualityTarget::Auto);
        assert!(!profile.wants_highest());
        profile.highest_quality = true;
        assert!(profile.wants_highest());
    }
}

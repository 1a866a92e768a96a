//! Messages exchanged between the two execution contexts.
//!
//! Delivery is asynchronous, unordered and at-most-once. Receivers must treat
//! every profile they get as a wholesale replacement and must never wait for
//! a newer one.

use serde::{Deserialize, Serialize};

use crate::profile::PreferenceProfile;

/// A message on the inter-context channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContextMessage {
    /// The settings UI changed the profile
    UpdateSettings { profile: PreferenceProfile },
    /// The page context asks for the current profile
    RequestSettings,
    /// Current profile, addressed to the page context
    SettingsReply { profile: PreferenceProfile },
}

impl ContextMessage {
    /// Returns the profile carried by this message, if any.
    pub fn profile(&self) -> Option<&PreferenceProfile> {
        match self {
            Self::UpdateSettings { profile } | Self::SettingsReply { profile } => Some(profile),
            Self::RequestSettings => None,
        }
    }

    /// Encodes the message for a text channel.
    ///
    /// # Errors
    ///
    /// - `serde_json::Error` - If the message cannot be serialized
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a message from a text channel.
    ///
    /// # Errors
    ///
    /// - `serde_json::Error` - If the text is not a known message
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::QualityTarget;

    #[test]
    fn test_request_has_only_a_tag() {
        let json = ContextMessage::RequestSettings.to_json().unwrap();
        assert_eq!(json, r#"{"type":"RequestSettings"}"#);
    }

    #[test]
    fn test_reply_carries_stored_keys() {
        let message = ContextMessage::SettingsReply {
            profile: PreferenceProfile::targeting(QualityTarget::Auto),
        };

        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();

        assert_eq!(value["type"], "SettingsReply");
        assert_eq!(value["profile"]["quality"], "auto");
        assert_eq!(value["profile"]["highestQuality"], false);
    }

    #[test]
    fn test_decode_update_with_partial_profile() {
        let json = r#"{"type":"UpdateSettings","profile":{"quality":"720","prefer60fps":true}}"#;

        let message = ContextMessage::from_json(json).unwrap();
        let profile = message.profile().unwrap();

        assert_eq!(profile.quality.to_string(), "720");
        assert!(profile.prefer_high_frame_rate);
        assert!(profile.enabled);
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        assert!(ContextMessage::from_json(r#"{"type":"Reboot"}"#).is_err());
    }
}

//! Configurable match tables for option labels.
//!
//! Option labels come from an environment we do not control and their
//! vocabulary drifts between locales and player versions. Every heuristic
//! text match the resolver performs is driven by these tables so they can be
//! replaced without touching the algorithm.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::QualityLevel;

/// Lowercases and checks whether `label` contains any of `markers`.
///
/// Markers are expected to be lowercase already.
pub fn contains_any(label: &str, markers: &[String]) -> bool {
    let label = label.to_lowercase();
    markers.iter().any(|marker| label.contains(marker.as_str()))
}

/// Match tables used by resolution and menu navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelTables {
    /// Markers of the adaptive/automatic option
    pub auto_markers: Vec<String>,
    /// Markers of enhanced-bitrate options
    pub premium_markers: Vec<String>,
    /// Markers of HDR variants
    pub hdr_markers: Vec<String>,
    /// Markers of high-frame-rate variants
    pub high_frame_rate_markers: Vec<String>,
    /// Resolution height to the label tokens of that family
    pub families: BTreeMap<u32, Vec<String>>,
    /// Templates for combined targets; `{height}` and `{fps}` are substituted
    pub compound_patterns: Vec<String>,
    /// Labels of the quality entry in a settings menu
    pub quality_menu_labels: Vec<String>,
}

impl Default for LabelTables {
    fn default() -> Self {
        let families = [
            (144, &["small144", "tiny", "hd144", "144p"][..]),
            (240, &["small240", "small", "hd240", "240p"][..]),
            (360, &["medium360", "medium", "hd360", "360p"][..]),
            (480, &["large480", "large", "hd480", "480p"][..]),
            (720, &["hd720", "720p"][..]),
            (1080, &["hd1080", "1080p"][..]),
            (1440, &["hd1440", "1440p"][..]),
            (2160, &["hd2160", "2160p", "4k"][..]),
            (4320, &["highres", "hd4320", "4320p", "8k"][..]),
        ]
        .into_iter()
        .map(|(height, tokens)| (height, owned(tokens)))
        .collect();

        Self {
            auto_markers: owned(&["auto", "تلقائي"]),
            premium_markers: owned(&["premium", "enhanced"]),
            hdr_markers: owned(&["hdr"]),
            high_frame_rate_markers: owned(&["p60", "p50", "p48", "p 60", "60fps", "50fps"]),
            families,
            compound_patterns: owned(&["{height}p{fps}", "{height}p {fps}", "hd{height}p{fps}"]),
            quality_menu_labels: owned(&["quality", "جودة", "كيفية"]),
        }
    }
}

impl LabelTables {
    /// Loads tables from a JSON document. Absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// - `serde_json::Error` - If the document is not valid JSON for these tables
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tables: Self = serde_json::from_str(json)?;
        Ok(tables.normalized())
    }

    /// Lowercases every marker so matching only has to lowercase labels.
    pub fn normalized(mut self) -> Self {
        let lower = |values: &mut Vec<String>| {
            for value in values.iter_mut() {
                *value = value.to_lowercase();
            }
        };
        lower(&mut self.auto_markers);
        lower(&mut self.premium_markers);
        lower(&mut self.hdr_markers);
        lower(&mut self.high_frame_rate_markers);
        lower(&mut self.compound_patterns);
        lower(&mut self.quality_menu_labels);
        for tokens in self.families.values_mut() {
            lower(tokens);
        }
        self
    }

    /// Returns the family tokens for a resolution height.
    ///
    /// Heights without a table entry use `{height}p` and `hd{height}`.
    pub fn family_tokens(&self, height: u32) -> Vec<String> {
        match self.families.get(&height) {
            Some(tokens) => tokens.clone(),
            None => vec![format!("{height}p"), format!("hd{height}")],
        }
    }

    /// Returns true if `label` belongs to the `height` family.
    ///
    /// Tokens overlap as substrings (`small` sits inside `small144`, `hd144`
    /// inside `hd1440`), so a label belongs to the family of the longest
    /// token it contains. Ties go to `height`.
    pub fn belongs_to_family(&self, label: &str, height: u32) -> bool {
        let label = label.to_lowercase();
        let longest = |tokens: &[String]| {
            tokens
                .iter()
                .filter(|token| label.contains(token.as_str()))
                .map(String::len)
                .max()
        };

        let Some(own) = longest(&self.family_tokens(height)) else {
            return false;
        };
        !self
            .families
            .iter()
            .filter(|(other, _)| **other != height)
            .any(|(_, tokens)| longest(tokens).is_some_and(|len| len > own))
    }

    /// Builds the compound substrings for a combined resolution and
    /// frame-rate target. Returns nothing for plain targets.
    pub fn compound_tokens(&self, level: QualityLevel) -> Vec<String> {
        let Some(fps) = level.frame_rate else {
            return Vec::new();
        };
        self.compound_patterns
            .iter()
            .map(|pattern| {
                pattern
                    .replace("{height}", &level.height.to_string())
                    .replace("{fps}", &fps.to_string())
            })
            .collect()
    }

    /// Returns true if the label is the automatic option.
    pub fn is_auto(&self, label: &str) -> bool {
        contains_any(label, &self.auto_markers)
    }

    /// Returns true if the label is an enhanced-bitrate option.
    pub fn is_premium(&self, label: &str) -> bool {
        contains_any(label, &self.premium_markers)
    }

    /// Returns true if the label is an HDR variant.
    pub fn is_hdr(&self, label: &str) -> bool {
        contains_any(label, &self.hdr_markers)
    }

    /// Returns true if the label is a high-frame-rate variant.
    pub fn is_high_frame_rate(&self, label: &str) -> bool {
        contains_any(label, &self.high_frame_rate_markers)
    }

    /// Returns true if the label names the quality entry of a settings menu.
    pub fn is_quality_menu(&self, label: &str) -> bool {
        contains_any(label, &self.quality_menu_labels)
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers_match_case_insensitively() {
        let tables = LabelTables::default();

        assert!(tables.is_auto("Auto (1080p)"));
        assert!(tables.is_auto("تلقائي"));
        assert!(tables.is_premium("1080p Premium"));
        assert!(tables.is_premium("Enhanced bitrate"));
        assert!(tables.is_hdr("2160p60 HDR"));
        assert!(tables.is_high_frame_rate("hd1080p60"));
        assert!(tables.is_high_frame_rate("1080p60 HD"));
        assert!(tables.is_quality_menu("Quality"));
        assert!(!tables.is_premium("1080p"));
    }

    #[test]
    fn test_high_frame_rate_markers_ignore_height_digits() {
        let tables = LabelTables::default();

        assert!(!tables.is_high_frame_rate("hd2160"));
        assert!(!tables.is_high_frame_rate("1660p"));
        assert!(!tables.is_high_frame_rate("360p"));
    }

    #[test]
    fn test_family_tokens_fall_back_for_unknown_heights() {
        let tables = LabelTables::default();

        assert_eq!(tables.family_tokens(1080), vec!["hd1080", "1080p"]);
        assert_eq!(tables.family_tokens(900), vec!["900p", "hd900"]);
    }

    #[test]
    fn test_every_default_family_knows_its_hd_token() {
        let tables = LabelTables::default();

        for height in [144, 240, 360, 480, 720, 1080, 1440, 2160, 4320] {
            let label = format!("hd{height}");
            assert!(tables.belongs_to_family(&label, height), "{label}");
        }
    }

    #[test]
    fn test_longest_token_claims_overlapping_labels() {
        let tables = LabelTables::default();

        assert!(tables.belongs_to_family("small144", 144));
        assert!(!tables.belongs_to_family("small144", 240));
        assert!(tables.belongs_to_family("small240", 240));
        assert!(tables.belongs_to_family("small", 240));
        assert!(tables.belongs_to_family("large480", 480));
        assert!(tables.belongs_to_family("hd1440", 1440));
        assert!(!tables.belongs_to_family("hd1440", 144));
        assert!(tables.belongs_to_family("900p", 900));
        assert!(!tables.belongs_to_family("hd720", 1080));
    }

    #[test]
    fn test_compound_tokens() {
        let tables = LabelTables::default();

        assert!(tables.compound_tokens(QualityLevel::new(720)).is_empty());
        assert_eq!(
            tables.compound_tokens(QualityLevel::with_frame_rate(720, 60)),
            vec!["720p60", "720p 60", "hd720p60"]
        );
    }

    #[test]
    fn test_from_json_overrides_and_normalizes() {
        let json = r#"{
            "premium_markers": ["Premium", "Verbessert"],
            "families": {"1080": ["FHD"]}
        }"#;

        let tables = LabelTables::from_json(json).unwrap();

        assert_eq!(tables.premium_markers, vec!["premium", "verbessert"]);
        assert_eq!(tables.family_tokens(1080), vec!["fhd"]);
        // Untouched tables keep their defaults
        assert_eq!(tables.hdr_markers, vec!["hdr"]);
    }
}

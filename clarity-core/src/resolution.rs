//! Maps a preference profile onto one of the currently available options.
//!
//! Resolution is a pure function of the profile, the ordered option snapshot
//! and the label tables. It is evaluated afresh on every pass because the
//! options can change between passes.
//!
//! The environment is assumed to list options best-first, so "highest" means
//! the first option. This is not verified independently.

use std::fmt;

use crate::labels::{LabelTables, contains_any};
use crate::profile::{PreferenceProfile, QualityLevel, QualityTarget};
use crate::surface::OptionLabel;

/// Rule that selected an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionRule {
    /// First option, for highest-quality preferences
    HighestAvailable,
    /// Option carrying a premium marker
    PremiumTier,
    /// First option, because no premium option was offered
    PremiumFallback,
    /// Option carrying an auto marker
    Automatic,
    /// Combined resolution and frame-rate label
    CompoundMatch,
    /// Family match with a high-frame-rate marker
    PreferredFrameRate,
    /// Family match with an HDR marker
    PreferredHdr,
    /// First plain family match
    FamilyMatch,
}

impl fmt::Display for ResolutionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HighestAvailable => "highest available",
            Self::PremiumTier => "premium tier",
            Self::PremiumFallback => "premium fallback to highest",
            Self::Automatic => "automatic",
            Self::CompoundMatch => "compound resolution/frame-rate match",
            Self::PreferredFrameRate => "preferred high frame rate",
            Self::PreferredHdr => "preferred HDR",
            Self::FamilyMatch => "resolution family match",
        };
        f.write_str(name)
    }
}

/// Why nothing was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMatchReason {
    /// The profile is switched off
    Disabled,
    /// The environment offered no options at all
    NoOptions,
    /// No option carries an auto marker
    NoAutomaticOption,
    /// No option belongs to the requested resolution family
    NoFamilyMatch {
        /// Requested height
        height: u32,
    },
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "quality control is disabled"),
            Self::NoOptions => write!(f, "no options available"),
            Self::NoAutomaticOption => write!(f, "no automatic option offered"),
            Self::NoFamilyMatch { height } => write!(f, "no {height}p option offered"),
        }
    }
}

/// Outcome of one resolution pass, with the reasoning behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// An option was chosen
    Chosen {
        /// The chosen option, borrowed from the snapshot
        option: &'a OptionLabel,
        /// Rule that chose it
        rule: ResolutionRule,
    },
    /// Nothing should be applied
    NoMatch(NoMatchReason),
}

impl<'a> Resolution<'a> {
    /// Returns the chosen option, if any.
    pub fn option(&self) -> Option<&'a OptionLabel> {
        match self {
            Self::Chosen { option, .. } => Some(option),
            Self::NoMatch(_) => None,
        }
    }
}

/// Resolves the profile against the available options.
///
/// Returns `None` when the caller must not apply anything.
pub fn resolve<'a>(
    profile: &PreferenceProfile,
    options: &'a [OptionLabel],
    tables: &LabelTables,
) -> Option<&'a OptionLabel> {
    explain(profile, options, tables).option()
}

/// Resolves the profile and reports which rule decided.
pub fn explain<'a>(
    profile: &PreferenceProfile,
    options: &'a [OptionLabel],
    tables: &LabelTables,
) -> Resolution<'a> {
    if !profile.enabled {
        return Resolution::NoMatch(NoMatchReason::Disabled);
    }

    if profile.wants_highest() {
        return first_option(options, ResolutionRule::HighestAvailable);
    }

    match profile.quality {
        QualityTarget::Highest => first_option(options, ResolutionRule::HighestAvailable),
        QualityTarget::Premium => {
            match options.iter().find(|option| tables.is_premium(option.as_str())) {
                Some(option) => Resolution::Chosen {
                    option,
                    rule: ResolutionRule::PremiumTier,
                },
                None => first_option(options, ResolutionRule::PremiumFallback),
            }
        }
        QualityTarget::Auto => match options.iter().find(|option| tables.is_auto(option.as_str()))
        {
            Some(option) => Resolution::Chosen {
                option,
                rule: ResolutionRule::Automatic,
            },
            None => Resolution::NoMatch(NoMatchReason::NoAutomaticOption),
        },
        QualityTarget::Specific(level) => resolve_level(profile, level, options, tables),
    }
}

fn first_option(options: &[OptionLabel], rule: ResolutionRule) -> Resolution<'_> {
    match options.first() {
        Some(option) => Resolution::Chosen { option, rule },
        None => Resolution::NoMatch(NoMatchReason::NoOptions),
    }
}

fn resolve_level<'a>(
    profile: &PreferenceProfile,
    level: QualityLevel,
    options: &'a [OptionLabel],
    tables: &LabelTables,
) -> Resolution<'a> {
    let compound = tables.compound_tokens(level);
    if let Some(option) = options
        .iter()
        .find(|option| contains_any(option.as_str(), &compound))
    {
        return Resolution::Chosen {
            option,
            rule: ResolutionRule::CompoundMatch,
        };
    }

    let mut fallback = None;

    for option in options {
        let label = option.as_str();
        if !tables.belongs_to_family(label, level.height) {
            continue;
        }

        if profile.prefer_high_frame_rate && tables.is_high_frame_rate(label) {
            return Resolution::Chosen {
                option,
                rule: ResolutionRule::PreferredFrameRate,
            };
        }

        if profile.prefer_hdr && tables.is_hdr(label) {
            return Resolution::Chosen {
                option,
                rule: ResolutionRule::PreferredHdr,
            };
        }

        if fallback.is_none() {
            fallback = Some(option);
        }
    }

    match fallback {
        Some(option) => Resolution::Chosen {
            option,
            rule: ResolutionRule::FamilyMatch,
        },
        None => Resolution::NoMatch(NoMatchReason::NoFamilyMatch {
            height: level.height,
        }),
    }
}

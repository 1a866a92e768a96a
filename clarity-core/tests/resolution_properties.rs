//! Property tests for option resolution over arbitrary option snapshots.

use clarity_core::labels::LabelTables;
use clarity_core::surface::OptionLabel;
use clarity_core::{PreferenceProfile, QualityLevel, QualityTarget, explain, resolve};
use proptest::prelude::*;

const LABEL_POOL: &[&str] = &[
    "hd2160",
    "2160p60 HDR",
    "hd1440",
    "hd1080",
    "1080p60",
    "1080p Premium",
    "1080p HDR",
    "hd720",
    "720p60",
    "hd480",
    "large480",
    "small144",
    "large",
    "medium",
    "small",
    "tiny",
    "auto",
    "Auto (480p)",
    "تلقائي",
];

const HEIGHTS: &[u32] = &[144, 240, 360, 480, 720, 1080, 1440, 2160, 4320];

fn options_strategy() -> impl Strategy<Value = Vec<OptionLabel>> {
    prop::collection::vec(prop::sample::select(LABEL_POOL), 0..8)
        .prop_map(|labels| labels.into_iter().map(OptionLabel::new).collect())
}

fn target_strategy() -> impl Strategy<Value = QualityTarget> {
    prop_oneof![
        Just(QualityTarget::Auto),
        Just(QualityTarget::Highest),
        Just(QualityTarget::Premium),
        prop::sample::select(HEIGHTS).prop_map(|h| QualityTarget::Specific(QualityLevel::new(h))),
        (prop::sample::select(HEIGHTS), prop::sample::select(&[30u32, 50, 60][..]))
            .prop_map(|(h, fps)| QualityTarget::Specific(QualityLevel::with_frame_rate(h, fps))),
    ]
}

fn profile_strategy() -> impl Strategy<Value = PreferenceProfile> {
    (target_strategy(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(quality, enabled, highest, prefer_fps, prefer_hdr)| PreferenceProfile {
            enabled,
            quality,
            highest_quality: highest,
            prefer_high_frame_rate: prefer_fps,
            prefer_hdr,
            ..PreferenceProfile::default()
        },
    )
}

proptest! {
    #[test]
    fn chosen_option_comes_from_snapshot(
        profile in profile_strategy(),
        options in options_strategy(),
    ) {
        let tables = LabelTables::default();
        if let Some(choice) = resolve(&profile, &options, &tables) {
            prop_assert!(options.iter().any(|option| std::ptr::eq(option, choice)));
        }
    }

    #[test]
    fn resolution_is_deterministic(
        profile in profile_strategy(),
        options in options_strategy(),
    ) {
        let tables = LabelTables::default();
        prop_assert_eq!(
            explain(&profile, &options, &tables),
            explain(&profile, &options, &tables)
        );
    }

    #[test]
    fn disabled_profile_resolves_nothing(
        profile in profile_strategy(),
        options in options_strategy(),
    ) {
        let profile = PreferenceProfile { enabled: false, ..profile };
        prop_assert!(resolve(&profile, &options, &LabelTables::default()).is_none());
    }

    #[test]
    fn highest_preference_picks_first_option(
        profile in profile_strategy(),
        options in options_strategy(),
    ) {
        let profile = PreferenceProfile { enabled: true, highest_quality: true, ..profile };
        prop_assert_eq!(resolve(&profile, &options, &LabelTables::default()), options.first());
    }

    #[test]
    fn specific_height_stays_in_family(
        height in prop::sample::select(HEIGHTS),
        prefer_fps in any::<bool>(),
        prefer_hdr in any::<bool>(),
        options in options_strategy(),
    ) {
        let tables = LabelTables::default();
        let profile = PreferenceProfile {
            prefer_high_frame_rate: prefer_fps,
            prefer_hdr,
            ..PreferenceProfile::targeting(QualityTarget::Specific(QualityLevel::new(height)))
        };
        let any_in_family = options
            .iter()
            .any(|option| tables.belongs_to_family(option.as_str(), height));

        match resolve(&profile, &options, &tables) {
            Some(choice) => {
                prop_assert!(tables.belongs_to_family(choice.as_str(), height));
                for other in HEIGHTS.iter().filter(|other| **other != height) {
                    prop_assert!(!tables.belongs_to_family(choice.as_str(), *other));
                }
            }
            None => prop_assert!(!any_in_family),
        }
    }

    #[test]
    fn auto_target_requires_auto_marker(options in options_strategy()) {
        let tables = LabelTables::default();
        let profile = PreferenceProfile::targeting(QualityTarget::Auto);

        match resolve(&profile, &options, &tables) {
            Some(choice) => prop_assert!(tables.is_auto(choice.as_str())),
            None => prop_assert!(options.iter().all(|option| !tables.is_auto(option.as_str()))),
        }
    }
}

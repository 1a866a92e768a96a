//! Core scenario builder implementations.

use std::sync::Arc;
use std::time::Duration;

use clarity_core::config::ClarityConfig;
use clarity_core::state::EnginePhase;
use clarity_core::{PreferenceProfile, QualityLevel, QualityTarget};

use super::types::{Expectation, Scenario, ScenarioStep, StepAction};
use crate::deterministic::{DeterministicRng, SimulatedClock};
use crate::player::{SimulatedPlayer, SimulatedPlayerProbe, SurfaceKind};

/// Probability that a probe throws in the flaky scenario.
const FLAKY_PROBE_FAILURE_RATE: f64 = 0.35;

/// Everything needed to run one scenario.
pub struct ScenarioSetup {
    pub scenario: Scenario,
    pub seed: u64,
    pub config: ClarityConfig,
    pub clock: SimulatedClock,
    pub player: SimulatedPlayer,
    pub probe: SimulatedPlayerProbe,
    pub profile: PreferenceProfile,
    pub steps: Vec<ScenarioStep>,
    /// Simulation time the run covers
    pub run_for: Duration,
    pub expectation: Expectation,
}

/// Pre-built simulation scenarios. All use production timing.
pub struct SimulationScenarios;

impl SimulationScenarios {
    /// Builds `scenario` with `seed`.
    pub fn build(scenario: Scenario, seed: u64) -> ScenarioSetup {
        match scenario {
            Scenario::SlowPlayerLoad => Self::slow_player_load(seed),
            Scenario::NeverReadyPlayer => Self::never_ready_player(seed),
            Scenario::NewVideoMidSession => Self::new_video_mid_session(seed),
            Scenario::SettingsUpdate => Self::settings_update(seed),
            Scenario::FlakyProbe => Self::flaky_probe(seed),
            Scenario::MenuOnlyPlayer => Self::menu_only_player(seed),
        }
    }

    /// Player ready 1.5 s after the first probe.
    ///
    /// With the 500 ms retry interval the fourth probe finds it.
    pub fn slow_player_load(seed: u64) -> ScenarioSetup {
        let clock = SimulatedClock::new();
        let player = SimulatedPlayer::new(clock.clone(), ["hd1080", "hd720", "hd480", "auto"])
            .ready_after(Duration::from_millis(3500));

        setup(
            Scenario::SlowPlayerLoad,
            seed,
            clock,
            player,
            SurfaceKind::Api,
            targeting(720),
        )
        .run_for(Duration::from_secs(10))
        .expecting(Expectation {
            final_option: Some("hd720".to_string()),
            selections: Some(1),
            probe_calls: Some(4),
            final_phase: Some(EnginePhase::Idle),
        })
    }

    /// Player that never loads: the engine spends its budget and goes quiet.
    pub fn never_ready_player(seed: u64) -> ScenarioSetup {
        let clock = SimulatedClock::new();
        let player = SimulatedPlayer::new(clock.clone(), ["hd1080"]).never_ready();

        setup(
            Scenario::NeverReadyPlayer,
            seed,
            clock,
            player,
            SurfaceKind::Api,
            PreferenceProfile::default(),
        )
        .run_for(Duration::from_secs(60))
        .expecting(Expectation {
            final_option: None,
            selections: Some(0),
            probe_calls: Some(10),
            final_phase: Some(EnginePhase::Exhausted),
        })
    }

    /// In-page navigation to a second video whose player loads slowly.
    ///
    /// The navigation burst coalesces into one re-resolution.
    pub fn new_video_mid_session(seed: u64) -> ScenarioSetup {
        let clock = SimulatedClock::new();
        let player = SimulatedPlayer::new(clock.clone(), ["hd1080", "hd720", "auto"]);

        setup(
            Scenario::NewVideoMidSession,
            seed,
            clock,
            player,
            SurfaceKind::Api,
            targeting(1080),
        )
        .step(
            Duration::from_secs(10),
            StepAction::LoadVideo {
                video: 2,
                options: ["hd2160", "hd1440", "hd1080", "hd720", "auto"]
                    .map(String::from)
                    .to_vec(),
                ready_delay: Duration::from_millis(1500),
            },
        )
        .run_for(Duration::from_secs(30))
        .expecting(Expectation {
            final_option: Some("hd1080".to_string()),
            selections: Some(2),
            probe_calls: Some(3),
            final_phase: Some(EnginePhase::Idle),
        })
    }

    /// The user lowers the target quality while a video plays.
    pub fn settings_update(seed: u64) -> ScenarioSetup {
        let clock = SimulatedClock::new();
        let player = SimulatedPlayer::new(clock.clone(), ["hd1080", "hd720", "hd480", "auto"])
            .with_range_support();
        let lowered = PreferenceProfile {
            premium_bitrate: true,
            ..targeting(480)
        };

        setup(
            Scenario::SettingsUpdate,
            seed,
            clock,
            player,
            SurfaceKind::Api,
            targeting(1080),
        )
        .step(Duration::from_secs(10), StepAction::UpdateSettings(lowered))
        .run_for(Duration::from_secs(20))
        .expecting(Expectation {
            final_option: Some("hd480".to_string()),
            selections: Some(2),
            probe_calls: Some(2),
            final_phase: Some(EnginePhase::Idle),
        })
    }

    /// Probes throw at random while a slow player loads. Only
    /// reproducibility is expected: the same seed gives the same run.
    pub fn flaky_probe(seed: u64) -> ScenarioSetup {
        let clock = SimulatedClock::new();
        let player = SimulatedPlayer::new(clock.clone(), ["hd1080", "hd720", "auto"])
            .ready_after(Duration::from_millis(2500));

        let mut setup = setup(
            Scenario::FlakyProbe,
            seed,
            clock,
            player,
            SurfaceKind::Api,
            targeting(720),
        )
        .run_for(Duration::from_secs(20));
        setup.probe = setup
            .probe
            .with_failure_rate(DeterministicRng::from_seed(seed), FLAKY_PROBE_FAILURE_RATE);
        setup
    }

    /// Player without an API: quality is set through the settings menu,
    /// preferring the high-frame-rate 720p entry.
    pub fn menu_only_player(seed: u64) -> ScenarioSetup {
        let clock = SimulatedClock::new();
        let player = SimulatedPlayer::new(
            clock.clone(),
            ["1080p60 HD", "1080p HD", "720p60", "720p", "480p", "Auto"],
        );
        let profile = PreferenceProfile {
            prefer_high_frame_rate: true,
            ..targeting(720)
        };

        setup(
            Scenario::MenuOnlyPlayer,
            seed,
            clock,
            player,
            SurfaceKind::Menu,
            profile,
        )
        .run_for(Duration::from_secs(10))
        .expecting(Expectation {
            final_option: Some("720p60".to_string()),
            selections: Some(1),
            probe_calls: Some(1),
            final_phase: Some(EnginePhase::Idle),
        })
    }
}

impl ScenarioSetup {
    fn step(mut self, at: Duration, action: StepAction) -> Self {
        self.steps.push(ScenarioStep { at, action });
        self
    }

    fn run_for(mut self, duration: Duration) -> Self {
        self.run_for = duration;
        self
    }

    fn expecting(mut self, expectation: Expectation) -> Self {
        self.expectation = expectation;
        self
    }
}

fn setup(
    scenario: Scenario,
    seed: u64,
    clock: SimulatedClock,
    player: SimulatedPlayer,
    kind: SurfaceKind,
    profile: PreferenceProfile,
) -> ScenarioSetup {
    let config = ClarityConfig::default();
    let probe = SimulatedPlayerProbe::new(player.clone(), kind)
        .with_tables(Arc::new(config.labels.clone()))
        .with_settle_delay(config.apply.settle_delay);

    ScenarioSetup {
        scenario,
        seed,
        config,
        clock,
        player,
        probe,
        profile,
        steps: Vec::new(),
        run_for: Duration::from_secs(10),
        expectation: Expectation::default(),
    }
}

fn targeting(height: u32) -> PreferenceProfile {
    PreferenceProfile::targeting(QualityTarget::Specific(QualityLevel::new(height)))
}

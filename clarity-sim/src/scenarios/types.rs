//! Scenario definitions and reports.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clarity_core::PreferenceProfile;
use clarity_core::state::EnginePhase;
use serde::Serialize;

use crate::SimulationError;
use crate::player::Selection;

/// Pre-built simulation scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// The player finishes loading well after the first probe
    SlowPlayerLoad,
    /// The player never finishes loading
    NeverReadyPlayer,
    /// The page navigates to a new video mid-session
    NewVideoMidSession,
    /// The user changes settings while a video plays
    SettingsUpdate,
    /// Probes throw at random while the player loads
    FlakyProbe,
    /// The player can only be driven through its settings menu
    MenuOnlyPlayer,
}

impl Scenario {
    /// Every scenario, in run order.
    pub const ALL: [Scenario; 6] = [
        Scenario::SlowPlayerLoad,
        Scenario::NeverReadyPlayer,
        Scenario::NewVideoMidSession,
        Scenario::SettingsUpdate,
        Scenario::FlakyProbe,
        Scenario::MenuOnlyPlayer,
    ];

    /// Command-line name of the scenario.
    pub fn name(self) -> &'static str {
        match self {
            Scenario::SlowPlayerLoad => "slow-player-load",
            Scenario::NeverReadyPlayer => "never-ready-player",
            Scenario::NewVideoMidSession => "new-video-mid-session",
            Scenario::SettingsUpdate => "settings-update",
            Scenario::FlakyProbe => "flaky-probe",
            Scenario::MenuOnlyPlayer => "menu-only-player",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| SimulationError::UnknownScenario {
                name: s.to_string(),
            })
    }
}

/// Something that happens to the page at a point in simulation time.
#[derive(Debug, Clone)]
pub enum StepAction {
    /// Navigate to a new video that becomes ready after `ready_delay`
    LoadVideo {
        video: u64,
        options: Vec<String>,
        ready_delay: Duration,
    },
    /// The settings UI saves a new profile
    UpdateSettings(PreferenceProfile),
}

/// A scripted page action.
#[derive(Debug, Clone)]
pub struct ScenarioStep {
    /// Simulation time at which the action happens
    pub at: Duration,
    pub action: StepAction,
}

/// What a correct engine must have done by the end of a scenario.
///
/// `None` fields are not checked.
#[derive(Debug, Clone, Default)]
pub struct Expectation {
    pub final_option: Option<String>,
    pub selections: Option<usize>,
    pub probe_calls: Option<usize>,
    pub final_phase: Option<EnginePhase>,
}

/// Outcome of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub seed: u64,
    /// Simulation time covered by the run
    pub elapsed: Duration,
    pub probe_calls: usize,
    pub cycles: u64,
    pub selections: Vec<Selection>,
    pub final_option: Option<String>,
    pub final_phase: String,
    /// Expectations that did not hold
    pub failures: Vec<String>,
}

impl ScenarioReport {
    /// Returns true if every expectation held.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

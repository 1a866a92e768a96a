//! Scenario runner and expectation checking.

use clarity_core::engine::{EngineStatus, QualityEngineHandle};
use clarity_core::spawn_quality_engine;
use clarity_core::state::EnginePhase;
use clarity_core::store::MemoryPreferenceStore;

use super::builders::{ScenarioSetup, SimulationScenarios};
use super::types::{Expectation, Scenario, ScenarioReport, StepAction};
use crate::SimulationError;

/// Status polls allowed before a run counts as stuck.
const MAX_SETTLE_POLLS: usize = 10_000;

/// Runs scenarios against a real engine on simulated time.
///
/// Must run on a current-thread runtime so the engine actor and the runner
/// interleave deterministically.
pub struct ScenarioRunner {
    seed: u64,
}

impl ScenarioRunner {
    /// Creates a runner that seeds every scenario with `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Runs every scenario in order.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Unsettled` - If the engine never goes quiet
    /// - `SimulationError::Engine` - If the engine stops mid-run
    pub async fn run_all(&self) -> Result<Vec<ScenarioReport>, SimulationError> {
        let mut reports = Vec::with_capacity(Scenario::ALL.len());
        for scenario in Scenario::ALL {
            reports.push(self.run(scenario).await?);
        }
        Ok(reports)
    }

    /// Runs one scenario and checks its expectation.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Unsettled` - If the engine never goes quiet
    /// - `SimulationError::Engine` - If the engine stops mid-run
    pub async fn run(&self, scenario: Scenario) -> Result<ScenarioReport, SimulationError> {
        let setup = SimulationScenarios::build(scenario, self.seed);
        tracing::info!("Running scenario {scenario} with seed {}", self.seed);
        execute(setup).await
    }
}

async fn execute(setup: ScenarioSetup) -> Result<ScenarioReport, SimulationError> {
    let ScenarioSetup {
        scenario,
        seed,
        config,
        clock,
        player,
        probe,
        profile,
        steps,
        run_for,
        expectation,
    } = setup;

    let store = MemoryPreferenceStore::with_profile(profile);
    let handle = spawn_quality_engine(config, probe.clone(), store, clock.clone());
    settle(&handle).await?;

    for step in steps {
        clock.advance_to_elapsed(step.at);
        match step.action {
            StepAction::LoadVideo {
                video,
                options,
                ready_delay,
            } => {
                tracing::debug!("t={:?}: loading video {video}", clock.elapsed());
                for event in player.load_video(video, options, ready_delay) {
                    handle.notify(event).await?;
                }
            }
            StepAction::UpdateSettings(profile) => {
                tracing::debug!("t={:?}: updating settings", clock.elapsed());
                handle.update_settings(profile).await?;
            }
        }
        settle(&handle).await?;
    }

    clock.advance_to_elapsed(run_for);
    let status = settle(&handle).await?;
    handle.shutdown().await?;

    let mut report = ScenarioReport {
        scenario,
        seed,
        elapsed: clock.elapsed(),
        probe_calls: probe.calls(),
        cycles: status.cycles,
        selections: player.selections(),
        final_option: player.current(),
        final_phase: status.phase.to_string(),
        failures: Vec::new(),
    };
    report.failures = check(&expectation, &report, status.phase);

    if report.passed() {
        tracing::info!("Scenario {scenario} passed");
    } else {
        tracing::warn!("Scenario {scenario} failed: {}", report.failures.join("; "));
    }
    Ok(report)
}

/// Polls until the engine has nothing scheduled and sits between cycles.
async fn settle(handle: &QualityEngineHandle) -> Result<EngineStatus, SimulationError> {
    for _ in 0..MAX_SETTLE_POLLS {
        let status = handle.status().await?;
        if !status.scheduled && matches!(status.phase, EnginePhase::Idle | EnginePhase::Exhausted) {
            return Ok(status);
        }
        tokio::task::yield_now().await;
    }
    Err(SimulationError::Unsettled {
        polls: MAX_SETTLE_POLLS,
    })
}

fn check(expectation: &Expectation, report: &ScenarioReport, phase: EnginePhase) -> Vec<String> {
    let mut failures = Vec::new();

    if let Some(expected) = &expectation.final_option {
        if report.final_option.as_ref() != Some(expected) {
            failures.push(format!(
                "final option {:?}, expected {expected}",
                report.final_option
            ));
        }
    } else if expectation.selections == Some(0) && report.final_option.is_some() {
        failures.push(format!(
            "final option {:?}, expected none",
            report.final_option
        ));
    }

    if let Some(expected) = expectation.selections
        && report.selections.len() != expected
    {
        failures.push(format!(
            "{} selections, expected {expected}",
            report.selections.len()
        ));
    }

    if let Some(expected) = expectation.probe_calls
        && report.probe_calls != expected
    {
        failures.push(format!(
            "{} probe calls, expected {expected}",
            report.probe_calls
        ));
    }

    if let Some(expected) = expectation.final_phase
        && phase != expected
    {
        failures.push(format!("final phase {phase}, expected {expected}"));
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(scenario: Scenario, seed: u64) -> ScenarioReport {
        ScenarioRunner::new(seed).run(scenario).await.unwrap()
    }

    #[tokio::test]
    async fn test_slow_player_load() {
        let report = run(Scenario::SlowPlayerLoad, 1).await;

        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.selections[0].option, "hd720");
    }

    #[tokio::test]
    async fn test_never_ready_player_goes_quiet() {
        let report = run(Scenario::NeverReadyPlayer, 1).await;

        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.final_phase, "exhausted");
    }

    #[tokio::test]
    async fn test_new_video_mid_session() {
        let report = run(Scenario::NewVideoMidSession, 1).await;

        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.selections[1].video, 2);
    }

    #[tokio::test]
    async fn test_settings_update() {
        let report = run(Scenario::SettingsUpdate, 1).await;

        assert!(report.passed(), "{:?}", report.failures);
    }

    #[tokio::test]
    async fn test_menu_only_player() {
        let report = run(Scenario::MenuOnlyPlayer, 1).await;

        assert!(report.passed(), "{:?}", report.failures);
    }

    #[tokio::test]
    async fn test_flaky_probe_is_reproducible() {
        let first = run(Scenario::FlakyProbe, 1234).await;
        let second = run(Scenario::FlakyProbe, 1234).await;

        assert_eq!(first.probe_calls, second.probe_calls);
        assert_eq!(first.selections.len(), second.selections.len());
        assert_eq!(first.final_option, second.final_option);
    }

    #[test]
    fn test_check_reports_every_mismatch() {
        let expectation = Expectation {
            final_option: Some("hd720".to_string()),
            selections: Some(1),
            probe_calls: Some(4),
            final_phase: Some(EnginePhase::Idle),
        };
        let report = ScenarioReport {
            scenario: Scenario::SlowPlayerLoad,
            seed: 0,
            elapsed: std::time::Duration::ZERO,
            probe_calls: 10,
            cycles: 1,
            selections: Vec::new(),
            final_option: None,
            final_phase: "exhausted".to_string(),
            failures: Vec::new(),
        };

        let failures = check(&expectation, &report, EnginePhase::Exhausted);

        assert_eq!(failures.len(), 4);
    }
}

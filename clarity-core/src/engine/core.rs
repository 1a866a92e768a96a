//! Engine core: one discovery, resolution and application cycle at a time.

use std::time::{Duration, Instant};

use super::commands::{CycleOutcome, EngineStatus};
use crate::apply::{ApplyOutcome, apply};
use crate::clock::Clock;
use crate::config::ClarityConfig;
use crate::discovery::{DiscoveryLoop, DiscoveryOutcome};
use crate::profile::PreferenceProfile;
use crate::resolution::{Resolution, explain};
use crate::state::{EnginePhase, EngineState};
use crate::store::PreferenceStore;
use crate::surface::{OptionLabel, QualitySurface, SurfaceProbe};
use crate::watcher::{ChangeWatcher, EnvironmentEvent};

/// State and collaborators of one engine instance.
///
/// Owned by the actor task; nothing here is shared.
pub struct QualityEngine<P, S, C> {
    config: ClarityConfig,
    profile: PreferenceProfile,
    state: EngineState,
    watcher: ChangeWatcher,
    discovery: DiscoveryLoop<C>,
    probe: P,
    store: S,
    clock: C,
    startup_due: Option<Instant>,
    cycles: u64,
    applied_count: u64,
    last_applied: Option<OptionLabel>,
    last_outcome: Option<CycleOutcome>,
}

impl<P, S, C> QualityEngine<P, S, C>
where
    P: SurfaceProbe,
    S: PreferenceStore,
    C: Clock + Clone,
{
    /// Creates an idle engine with the default profile.
    pub fn new(config: ClarityConfig, probe: P, store: S, clock: C) -> Self {
        let state = EngineState::new(config.discovery.max_retries);
        let watcher = ChangeWatcher::new(config.watcher.clone());
        let discovery = DiscoveryLoop::new(config.discovery.retry_strategy.clone(), clock.clone());

        Self {
            config,
            profile: PreferenceProfile::default(),
            state,
            watcher,
            discovery,
            probe,
            store,
            clock,
            startup_due: None,
            cycles: 0,
            applied_count: 0,
            last_applied: None,
            last_outcome: None,
        }
    }

    /// Loads the stored profile and schedules the first cycle after the
    /// configured initial delay. A failing store leaves the defaults in place.
    pub async fn start(&mut self) {
        match self.store.load().await {
            Ok(profile) => self.profile = profile,
            Err(e) => tracing::warn!("Failed to load settings, using defaults: {e}"),
        }
        self.startup_due = Some(self.clock.now() + self.config.apply.initial_delay);
    }

    /// The profile currently in effect.
    pub fn profile(&self) -> &PreferenceProfile {
        &self.profile
    }

    /// The engine's clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Replaces the profile wholesale and grants a fresh retry budget.
    pub fn replace_profile(&mut self, profile: PreferenceProfile) {
        tracing::debug!("Settings updated: quality {}", profile.quality);
        self.profile = profile;
        self.state.reset_retries();
    }

    /// Feeds an environment event to the change watcher.
    pub fn observe(&mut self, event: EnvironmentEvent) -> bool {
        let now = self.clock.now();
        self.watcher.observe(event, now)
    }

    /// Time left until the next scheduled cycle, if one is scheduled.
    pub fn time_until_due(&self) -> Option<Duration> {
        let next = match (self.startup_due, self.watcher.pending_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }?;
        Some(next.saturating_duration_since(self.clock.now()))
    }

    /// Runs the startup cycle or the watcher's trigger if its deadline has
    /// passed. Watcher triggers grant a fresh retry budget.
    pub async fn run_due(&mut self) -> Option<CycleOutcome> {
        let now = self.clock.now();

        if self.startup_due.is_some_and(|due| due <= now) {
            self.startup_due = None;
            return Some(self.run_cycle().await);
        }

        let trigger = self.watcher.take_due(now)?;
        let reasons: Vec<String> = trigger.reasons.iter().map(ToString::to_string).collect();
        tracing::info!("Page changed ({}), re-applying quality", reasons.join(", "));
        self.state.reset_retries();
        Some(self.run_cycle().await)
    }

    /// Runs one cycle immediately with a fresh retry budget.
    pub async fn trigger(&mut self) -> CycleOutcome {
        self.state.reset_retries();
        self.run_cycle().await
    }

    /// Discovers a surface, resolves the profile against it and applies the
    /// result. Every failure degrades to a logged outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;
        let outcome = self.cycle().await;

        match &outcome {
            CycleOutcome::Applied { option, .. } => {
                self.applied_count += 1;
                self.last_applied = Some(option.clone());
            }
            CycleOutcome::Failed { reason } => tracing::warn!("Quality change failed: {reason}"),
            other => tracing::debug!("Cycle finished: {other}"),
        }

        if self.state.phase() != EnginePhase::Exhausted {
            self.state.transition(EnginePhase::Idle);
        }
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    async fn cycle(&mut self) -> CycleOutcome {
        if !self.profile.enabled {
            return CycleOutcome::Disabled;
        }

        let (surface, options) = match self
            .discovery
            .discover(&mut self.state, &mut self.probe)
            .await
        {
            DiscoveryOutcome::Found { surface, options } => (surface, options),
            DiscoveryOutcome::GiveUp => return CycleOutcome::GaveUp,
        };

        self.state.transition(EnginePhase::Resolving);
        let (choice, rule) = match explain(&self.profile, &options, &self.config.labels) {
            Resolution::Chosen { option, rule } => (option.clone(), rule),
            Resolution::NoMatch(reason) => {
                tracing::info!("Nothing to apply on {}: {reason}", surface.id());
                surface.release().await;
                return CycleOutcome::NoMatch(reason);
            }
        };
        tracing::debug!("Resolved {} to {choice} ({rule})", self.profile.quality);

        self.state.transition(EnginePhase::Applying);
        match apply(
            &surface,
            &choice,
            &self.profile,
            self.state.apply_flag(),
            &self.store,
        )
        .await
        {
            Ok(ApplyOutcome::Applied) => CycleOutcome::Applied {
                option: choice,
                rule,
            },
            Ok(ApplyOutcome::AlreadyActive) => CycleOutcome::AlreadyActive { option: choice },
            Ok(ApplyOutcome::Conflict) => CycleOutcome::Conflict,
            Err(e) => CycleOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Marks the engine stopped.
    pub fn stop(&mut self) {
        self.startup_due = None;
        self.state.transition(EnginePhase::Stopped);
    }

    /// Snapshot of the engine's state.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            phase: self.state.phase(),
            retry_count: self.state.retry_count(),
            max_retries: self.state.max_retries(),
            cycles: self.cycles,
            applied_count: self.applied_count,
            last_applied: self.last_applied.clone(),
            last_outcome: self.last_outcome.clone(),
            scheduled: self.time_until_due().is_some(),
            profile: self.profile.clone(),
        }
    }
}

//! Simulated video player and the probe that discovers it.
//!
//! The player lives on simulated time: it becomes ready at a configurable
//! instant, exposes its options best-first and records every selection. It
//! can be driven either through a structured API ([`PlayerApiSurface`]) or
//! only through its settings menu ([`SimulatedMenu`] wrapped in a
//! [`MenuSurface`]).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clarity_core::clock::Clock;
use clarity_core::labels::LabelTables;
use clarity_core::menu::{MenuDriver, MenuSurface};
use clarity_core::surface::{
    OptionLabel, ProbeError, QualitySurface, SurfaceError, SurfaceId, SurfaceProbe,
};
use clarity_core::watcher::{EnvironmentEvent, MediaId};
use parking_lot::Mutex;
use serde::Serialize;

use crate::deterministic::{DeterministicRng, SimulatedClock};

/// Top-level settings entries shown by the simulated menu.
const SETTINGS_ITEMS: &[&str] = &["Annotations", "Playback speed", "Quality"];

/// One option applied to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Video the selection was made on
    pub video: u64,
    /// Applied option label
    pub option: String,
    /// Simulation time of the selection
    pub at: Duration,
}

#[derive(Debug)]
struct PlayerState {
    video: u64,
    options: Vec<String>,
    current: Option<String>,
    ready_at: Option<Instant>,
    supports_range: bool,
    range: Option<(String, String)>,
    selections: Vec<Selection>,
    settings_open: bool,
    quality_open: bool,
}

/// Simulated player. Clones share the same player.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    clock: SimulatedClock,
    state: Arc<Mutex<PlayerState>>,
}

impl SimulatedPlayer {
    /// Creates a player showing video 1 with `options`, ready immediately.
    pub fn new<I, S>(clock: SimulatedClock, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = clock.now();
        Self {
            clock,
            state: Arc::new(Mutex::new(PlayerState {
                video: 1,
                options: options.into_iter().map(Into::into).collect(),
                current: None,
                ready_at: Some(now),
                supports_range: false,
                range: None,
                selections: Vec::new(),
                settings_open: false,
                quality_open: false,
            })),
        }
    }

    /// Delays readiness by `delay` of simulation time from now.
    pub fn ready_after(self, delay: Duration) -> Self {
        self.state.lock().ready_at = Some(self.clock.now() + delay);
        self
    }

    /// Makes the player never become ready.
    pub fn never_ready(self) -> Self {
        self.state.lock().ready_at = None;
        self
    }

    /// Enables the quality range API.
    pub fn with_range_support(self) -> Self {
        self.state.lock().supports_range = true;
        self
    }

    /// The simulation clock the player runs on.
    pub fn clock(&self) -> &SimulatedClock {
        &self.clock
    }

    /// Swaps in a new video, as an in-page navigation would, and returns
    /// the mutation notices the page emits for it.
    pub fn load_video<I, S>(
        &self,
        video: u64,
        options: I,
        ready_delay: Duration,
    ) -> Vec<EnvironmentEvent>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        state.video = video;
        state.options = options.into_iter().map(Into::into).collect();
        state.current = None;
        state.range = None;
        state.ready_at = Some(self.clock.now() + ready_delay);
        state.settings_open = false;
        state.quality_open = false;

        vec![
            EnvironmentEvent::MediaElementObserved { id: MediaId(video) },
            EnvironmentEvent::Navigated {
                url: watch_url(video),
            },
            EnvironmentEvent::NavigationFinished,
            EnvironmentEvent::PlayerUpdated,
        ]
    }

    /// Video currently shown.
    pub fn video(&self) -> u64 {
        self.state.lock().video
    }

    /// Returns true once the player has finished loading.
    pub fn is_ready(&self) -> bool {
        let ready_at = self.state.lock().ready_at;
        ready_at.is_some_and(|at| self.clock.now() >= at)
    }

    /// Option currently in effect.
    pub fn current(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    /// Every selection made so far.
    pub fn selections(&self) -> Vec<Selection> {
        self.state.lock().selections.clone()
    }

    /// Last pinned quality range.
    pub fn range(&self) -> Option<(String, String)> {
        self.state.lock().range.clone()
    }

    fn options(&self) -> Result<Vec<String>, SurfaceError> {
        self.ensure_ready()?;
        Ok(self.state.lock().options.clone())
    }

    fn select(&self, option: &str) -> Result<(), SurfaceError> {
        self.ensure_ready()?;
        let elapsed = self.clock.elapsed();
        let mut state = self.state.lock();
        if !state.options.iter().any(|o| o == option) {
            return Err(SurfaceError::OptionUnavailable {
                label: OptionLabel::new(option),
            });
        }
        state.current = Some(option.to_string());
        let video = state.video;
        state.selections.push(Selection {
            video,
            option: option.to_string(),
            at: elapsed,
        });
        tracing::trace!("Player switched video {video} to {option}");
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), SurfaceError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(SurfaceError::NotReady {
                reason: "player still loading".to_string(),
            })
        }
    }
}

/// Page URL of a video.
pub fn watch_url(video: u64) -> String {
    format!("https://video.example/watch?v={video}")
}

/// Structured player API.
#[derive(Debug, Clone)]
pub struct PlayerApiSurface {
    player: SimulatedPlayer,
}

impl PlayerApiSurface {
    /// Wraps `player`.
    pub fn new(player: SimulatedPlayer) -> Self {
        Self { player }
    }
}

#[async_trait]
impl QualitySurface for PlayerApiSurface {
    fn id(&self) -> SurfaceId {
        SurfaceId(self.player.video())
    }

    async fn list_available_options(&self) -> Result<Vec<OptionLabel>, SurfaceError> {
        Ok(self.player.options()?.into_iter().map(OptionLabel::from).collect())
    }

    async fn current_option(&self) -> Result<Option<OptionLabel>, SurfaceError> {
        Ok(self.player.current().map(OptionLabel::from))
    }

    async fn set_option(&self, label: &OptionLabel) -> Result<(), SurfaceError> {
        self.player.select(label.as_str())
    }

    fn supports_range(&self) -> bool {
        self.player.state.lock().supports_range
    }

    async fn set_option_range(
        &self,
        low: &OptionLabel,
        high: &OptionLabel,
    ) -> Result<(), SurfaceError> {
        if !self.supports_range() {
            return Err(SurfaceError::Unsupported {
                capability: "quality range",
            });
        }
        self.player.ensure_ready()?;
        self.player.state.lock().range = Some((low.to_string(), high.to_string()));
        Ok(())
    }
}

/// Settings menu of the simulated player.
#[derive(Debug, Clone)]
pub struct SimulatedMenu {
    player: SimulatedPlayer,
}

impl SimulatedMenu {
    /// Wraps `player`.
    pub fn new(player: SimulatedPlayer) -> Self {
        Self { player }
    }
}

fn menu_closed() -> SurfaceError {
    SurfaceError::Environment {
        reason: "menu is not open".to_string(),
    }
}

#[async_trait]
impl MenuDriver for SimulatedMenu {
    fn player_id(&self) -> SurfaceId {
        SurfaceId(self.player.video())
    }

    async fn open_settings(&self) -> Result<(), SurfaceError> {
        self.player.ensure_ready()?;
        self.player.state.lock().settings_open = true;
        Ok(())
    }

    async fn settings_items(&self) -> Result<Vec<String>, SurfaceError> {
        if !self.player.state.lock().settings_open {
            return Err(menu_closed());
        }
        Ok(SETTINGS_ITEMS.iter().map(|s| s.to_string()).collect())
    }

    async fn open_settings_item(&self, index: usize) -> Result<(), SurfaceError> {
        let mut state = self.player.state.lock();
        if !state.settings_open {
            return Err(menu_closed());
        }
        state.quality_open = SETTINGS_ITEMS.get(index) == Some(&"Quality");
        Ok(())
    }

    async fn quality_items(&self) -> Result<Vec<String>, SurfaceError> {
        if !self.player.state.lock().quality_open {
            return Err(menu_closed());
        }
        self.player.options()
    }

    async fn checked_quality_item(&self) -> Result<Option<String>, SurfaceError> {
        if !self.player.state.lock().quality_open {
            return Err(menu_closed());
        }
        Ok(self.player.current())
    }

    async fn click_quality_item(&self, index: usize) -> Result<(), SurfaceError> {
        let option = {
            let state = self.player.state.lock();
            if !state.quality_open {
                return Err(menu_closed());
            }
            state.options.get(index).cloned().ok_or_else(|| SurfaceError::Environment {
                reason: format!("no quality entry at {index}"),
            })?
        };
        self.player.select(&option)?;
        self.player.state.lock().quality_open = false;
        Ok(())
    }

    async fn close_settings(&self) -> Result<(), SurfaceError> {
        let mut state = self.player.state.lock();
        state.settings_open = false;
        state.quality_open = false;
        Ok(())
    }
}

/// How the probe exposes the player to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Structured player API
    Api,
    /// Settings menu clicks only
    Menu,
}

/// Surface handed out by [`SimulatedPlayerProbe`].
pub enum SimulatedSurface {
    Api(PlayerApiSurface),
    Menu(MenuSurface<SimulatedMenu, SimulatedClock>),
}

#[async_trait]
impl QualitySurface for SimulatedSurface {
    fn id(&self) -> SurfaceId {
        match self {
            Self::Api(surface) => surface.id(),
            Self::Menu(surface) => surface.id(),
        }
    }

    async fn list_available_options(&self) -> Result<Vec<OptionLabel>, SurfaceError> {
        match self {
            Self::Api(surface) => surface.list_available_options().await,
            Self::Menu(surface) => surface.list_available_options().await,
        }
    }

    async fn current_option(&self) -> Result<Option<OptionLabel>, SurfaceError> {
        match self {
            Self::Api(surface) => surface.current_option().await,
            Self::Menu(surface) => surface.current_option().await,
        }
    }

    async fn set_option(&self, label: &OptionLabel) -> Result<(), SurfaceError> {
        match self {
            Self::Api(surface) => surface.set_option(label).await,
            Self::Menu(surface) => surface.set_option(label).await,
        }
    }

    fn supports_range(&self) -> bool {
        match self {
            Self::Api(surface) => surface.supports_range(),
            Self::Menu(surface) => surface.supports_range(),
        }
    }

    async fn set_option_range(
        &self,
        low: &OptionLabel,
        high: &OptionLabel,
    ) -> Result<(), SurfaceError> {
        match self {
            Self::Api(surface) => surface.set_option_range(low, high).await,
            Self::Menu(surface) => surface.set_option_range(low, high).await,
        }
    }

    async fn release(&self) {
        match self {
            Self::Api(surface) => surface.release().await,
            Self::Menu(surface) => surface.release().await,
        }
    }
}

/// Probe that finds the simulated player once it is ready.
///
/// Optionally fails at random, the way a page script can throw while the
/// player is being rebuilt. Clones share the call counter.
#[derive(Debug, Clone)]
pub struct SimulatedPlayerProbe {
    player: SimulatedPlayer,
    kind: SurfaceKind,
    tables: Arc<LabelTables>,
    settle_delay: Duration,
    failures: Option<(DeterministicRng, f64)>,
    calls: Arc<AtomicUsize>,
}

impl SimulatedPlayerProbe {
    /// Creates a probe exposing `player` through `kind`.
    pub fn new(player: SimulatedPlayer, kind: SurfaceKind) -> Self {
        Self {
            player,
            kind,
            tables: Arc::new(LabelTables::default()),
            settle_delay: Duration::from_millis(100),
            failures: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Label tables used to find the quality entry in the settings menu.
    pub fn with_tables(mut self, tables: Arc<LabelTables>) -> Self {
        self.tables = tables;
        self
    }

    /// Settle delay after each menu click.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Fails each probe with probability `rate`, drawn from `rng`.
    pub fn with_failure_rate(mut self, rng: DeterministicRng, rate: f64) -> Self {
        self.failures = Some((rng, rate));
        self
    }

    /// Number of probe calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurfaceProbe for SimulatedPlayerProbe {
    type Surface = SimulatedSurface;

    async fn probe(&mut self) -> Result<Option<SimulatedSurface>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((rng, rate)) = &mut self.failures
            && rng.random_bool(*rate)
        {
            return Err(ProbeError::Environment {
                reason: "player script threw during inspection".to_string(),
            });
        }

        if !self.player.is_ready() {
            return Ok(None);
        }

        let surface = match self.kind {
            SurfaceKind::Api => SimulatedSurface::Api(PlayerApiSurface::new(self.player.clone())),
            SurfaceKind::Menu => SimulatedSurface::Menu(MenuSurface::new(
                SimulatedMenu::new(self.player.clone()),
                self.player.clock().clone(),
                Arc::clone(&self.tables),
                self.settle_delay,
            )),
        };
        Ok(Some(surface))
    }
}

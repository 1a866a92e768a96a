//! Per-context engine state.
//!
//! One [`EngineState`] exists per execution context. It is owned by the engine
//! actor and mutated only from there; the apply flag is atomic so overlapping
//! application futures still see a consistent guard.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::surface::SurfaceId;

/// Where the engine is in its discovery/application cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Waiting for a trigger
    Idle,
    /// Probing for a ready surface
    Discovering,
    /// A surface with options was found
    Found,
    /// Choosing an option
    Resolving,
    /// Applying the chosen option
    Applying,
    /// Discovery gave up; idle until the watcher fires
    Exhausted,
    /// Context torn down
    Stopped,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Found => "found",
            Self::Resolving => "resolving",
            Self::Applying => "applying",
            Self::Exhausted => "exhausted",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Mutual-exclusion flag for the application procedure.
///
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct ApplyFlag {
    in_flight: Arc<AtomicBool>,
}

impl ApplyFlag {
    /// Creates a released flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the flag, or returns `None` if an application is in flight.
    pub fn try_acquire(&self) -> Option<ApplyGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ApplyGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    /// Returns true while an application holds the flag.
    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Holds the apply flag; releasing happens on drop, on every exit path.
#[derive(Debug)]
pub struct ApplyGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for ApplyGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Discovery budget, apply guard and surface identity for one context.
#[derive(Debug, Clone)]
pub struct EngineState {
    retry_count: u32,
    max_retries: u32,
    applying: ApplyFlag,
    last_surface: Option<SurfaceId>,
    phase: EnginePhase,
}

impl EngineState {
    /// Creates an idle state with the given discovery budget.
    pub fn new(max_retries: u32) -> Self {
        Self {
            retry_count: 0,
            max_retries,
            applying: ApplyFlag::new(),
            last_surface: None,
            phase: EnginePhase::Idle,
        }
    }

    /// Failed discovery attempts since the last reset.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Discovery budget.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns true once the discovery budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Counts one failed discovery attempt. Saturates at the budget.
    pub fn record_failed_attempt(&mut self) {
        if self.retry_count < self.max_retries {
            self.retry_count += 1;
        }
    }

    /// Starts a fresh discovery budget.
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }

    /// Shared apply flag.
    pub fn apply_flag(&self) -> &ApplyFlag {
        &self.applying
    }

    /// Returns true while an application is in flight.
    pub fn is_applying(&self) -> bool {
        self.applying.is_held()
    }

    /// Identity of the last surface that was found.
    pub fn last_surface(&self) -> Option<SurfaceId> {
        self.last_surface
    }

    /// Records a discovered surface. A different identity resets the
    /// discovery budget; returns true in that case.
    pub fn observe_surface(&mut self, id: SurfaceId) -> bool {
        if self.last_surface == Some(id) {
            return false;
        }
        self.last_surface = Some(id);
        self.retry_count = 0;
        true
    }

    /// Current phase.
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Moves to `phase`.
    pub fn transition(&mut self, phase: EnginePhase) {
        if self.phase != phase {
            tracing::trace!("Engine phase {} -> {}", self.phase, phase);
            self.phase = phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_count_saturates_at_budget() {
        let mut state = EngineState::new(3);

        for _ in 0..10 {
            state.record_failed_attempt();
        }

        assert_eq!(state.retry_count(), 3);
        assert!(state.is_exhausted());

        state.reset_retries();
        assert_eq!(state.retry_count(), 0);
        assert!(!state.is_exhausted());
    }

    #[test]
    fn test_apply_flag_is_exclusive() {
        let flag = ApplyFlag::new();

        let guard = flag.try_acquire().expect("flag starts released");
        assert!(flag.is_held());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_held());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_apply_flag_released_on_panic() {
        let flag = ApplyFlag::new();
        let shared = flag.clone();

        let result = std::panic::catch_unwind(move || {
            let _guard = shared.try_acquire().unwrap();
            panic!("application failed");
        });

        assert!(result.is_err());
        assert!(!flag.is_held());
    }

    #[test]
    fn test_new_surface_resets_budget() {
        let mut state = EngineState::new(5);
        state.record_failed_attempt();
        state.record_failed_attempt();

        assert!(state.observe_surface(SurfaceId(1)));
        assert_eq!(state.retry_count(), 0);

        state.record_failed_attempt();
        assert!(!state.observe_surface(SurfaceId(1)));
        assert_eq!(state.retry_count(), 1);
    }

    #[test]
    fn test_zero_budget_is_immediately_exhausted() {
        let state = EngineState::new(0);
        assert!(state.is_exhausted());
    }
}

//! Bounded polling for a ready control surface.
//!
//! The page builds its player and controls asynchronously, so the engine
//! probes on an interval until a surface lists options or the retry budget
//! is spent. Exhaustion is silent: the environment may legitimately never
//! expose a surface, and the change watcher starts a new budget when a new
//! video appears.

use std::time::Duration;

use crate::clock::Clock;
use crate::state::{EnginePhase, EngineState};
use crate::surface::{OptionLabel, QualitySurface, SurfaceProbe};

/// Base delay between discovery attempts (in milliseconds)
const DEFAULT_RETRY_INTERVAL_MS: u64 = 500;

/// Delay policy between discovery attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Same delay before every retry
    FixedDelay { delay: Duration },
    /// Doubling delay, capped at `max_delay`
    ExponentialBackoff {
        base_delay: Duration,
        max_delay: Duration,
    },
    /// Retry without waiting
    Immediate,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::FixedDelay {
            delay: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
        }
    }
}

impl RetryStrategy {
    /// Calculate delay before retry number `attempt` (1-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::FixedDelay { delay } => *delay,
            Self::ExponentialBackoff {
                base_delay,
                max_delay,
            } => {
                let exponent = attempt.saturating_sub(1).min(31);
                let exponential = base_delay.saturating_mul(1_u32 << exponent);
                exponential.min(*max_delay)
            }
            Self::Immediate => Duration::ZERO,
        }
    }
}

/// Result of one discovery run.
#[derive(Debug)]
pub enum DiscoveryOutcome<S> {
    /// A surface with a non-empty option snapshot
    Found {
        /// The discovered surface
        surface: S,
        /// Options listed at discovery time, best first
        options: Vec<OptionLabel>,
    },
    /// Budget spent; nothing more happens until the state is reset
    GiveUp,
}

/// Probes for a surface with a bounded number of attempts.
#[derive(Debug, Clone)]
pub struct DiscoveryLoop<C> {
    strategy: RetryStrategy,
    clock: C,
}

impl<C: Clock> DiscoveryLoop<C> {
    /// Creates a loop that waits according to `strategy` on `clock`.
    pub fn new(strategy: RetryStrategy, clock: C) -> Self {
        Self { strategy, clock }
    }

    /// Runs discovery against `probe`, charging failed attempts to `state`.
    ///
    /// Calls the probe at most `state.max_retries() - state.retry_count()`
    /// times. Once the budget is spent every call returns `GiveUp` without
    /// probing until [`EngineState::reset_retries`] is called.
    pub async fn discover<P: SurfaceProbe>(
        &self,
        state: &mut EngineState,
        probe: &mut P,
    ) -> DiscoveryOutcome<P::Surface> {
        if state.is_exhausted() {
            state.transition(EnginePhase::Exhausted);
            return DiscoveryOutcome::GiveUp;
        }

        state.transition(EnginePhase::Discovering);

        loop {
            if let Some((surface, options)) = attempt(probe).await {
                if state.observe_surface(surface.id()) {
                    tracing::debug!("Discovered new {}", surface.id());
                }
                state.transition(EnginePhase::Found);
                return DiscoveryOutcome::Found { surface, options };
            }

            state.record_failed_attempt();
            if state.is_exhausted() {
                tracing::debug!(
                    "Surface not ready after {} attempts, giving up",
                    state.retry_count()
                );
                state.transition(EnginePhase::Exhausted);
                return DiscoveryOutcome::GiveUp;
            }

            let delay = self.strategy.calculate_delay(state.retry_count());
            tracing::trace!(
                "Surface not ready (attempt {}/{}), retrying in {:?}",
                state.retry_count(),
                state.max_retries(),
                delay
            );
            self.clock.sleep(delay).await;
        }
    }
}

/// One probe tick. Any failure counts as "not ready".
async fn attempt<P: SurfaceProbe>(probe: &mut P) -> Option<(P::Surface, Vec<OptionLabel>)> {
    let surface = match probe.probe().await {
        Ok(Some(surface)) => surface,
        Ok(None) => return None,
        Err(e) => {
            tracing::debug!("Probe failed, treating as not found: {e}");
            return None;
        }
    };

    match surface.list_available_options().await {
        Ok(options) if !options.is_empty() => Some((surface, options)),
        Ok(_) => {
            tracing::trace!("{} lists no options yet", surface.id());
            surface.release().await;
            None
        }
        Err(e) => {
            tracing::debug!("{} not ready: {e}", surface.id());
            surface.release().await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_mocks::{ManualClock, MockProbe, MockSurface};
    use crate::surface::SurfaceId;

    fn discovery(clock: &ManualClock) -> DiscoveryLoop<ManualClock> {
        DiscoveryLoop::new(RetryStrategy::default(), clock.clone())
    }

    #[test]
    fn test_fixed_delay() {
        let strategy = RetryStrategy::default();
        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(500));
        assert_eq!(strategy.calculate_delay(7), Duration::from_millis(500));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let strategy = RetryStrategy::ExponentialBackoff {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
        };

        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(strategy.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(strategy.calculate_delay(4), Duration::from_millis(800));
        assert_eq!(strategy.calculate_delay(5), Duration::from_millis(1000));
        assert_eq!(strategy.calculate_delay(64), Duration::from_millis(1000));
        assert_eq!(RetryStrategy::Immediate.calculate_delay(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_never_ready_probe_stops_after_budget() {
        let clock = ManualClock::new();
        let mut probe = MockProbe::never_ready();
        let mut state = EngineState::new(10);

        let outcome = discovery(&clock).discover(&mut state, &mut probe).await;

        assert!(matches!(outcome, DiscoveryOutcome::GiveUp));
        assert_eq!(probe.calls(), 10);
        assert_eq!(state.retry_count(), 10);
        assert_eq!(state.phase(), EnginePhase::Exhausted);
        assert_eq!(clock.sleeps().len(), 9);
        assert!(clock.sleeps().iter().all(|d| *d == Duration::from_millis(500)));

        // Exhausted state does not poll again
        let outcome = discovery(&clock).discover(&mut state, &mut probe).await;
        assert!(matches!(outcome, DiscoveryOutcome::GiveUp));
        assert_eq!(probe.calls(), 10);
    }

    #[tokio::test]
    async fn test_reset_grants_fresh_budget() {
        let clock = ManualClock::new();
        let mut probe = MockProbe::never_ready();
        let mut state = EngineState::new(3);

        discovery(&clock).discover(&mut state, &mut probe).await;
        state.reset_retries();
        discovery(&clock).discover(&mut state, &mut probe).await;

        assert_eq!(probe.calls(), 6);
    }

    #[tokio::test]
    async fn test_returns_as_soon_as_surface_is_ready() {
        let clock = ManualClock::new();
        let surface = MockSurface::new(SurfaceId(7), ["hd1080", "hd720"]);
        let mut probe = MockProbe::ready_after(3, surface);
        let mut state = EngineState::new(10);

        let outcome = discovery(&clock).discover(&mut state, &mut probe).await;

        match outcome {
            DiscoveryOutcome::Found { surface, options } => {
                assert_eq!(surface.id(), SurfaceId(7));
                assert_eq!(options.len(), 2);
            }
            DiscoveryOutcome::GiveUp => panic!("surface should have been found"),
        }
        assert_eq!(probe.calls(), 3);
        assert_eq!(clock.sleeps().len(), 2);
        assert_eq!(state.last_surface(), Some(SurfaceId(7)));
        assert_eq!(state.retry_count(), 0);
        assert_eq!(state.phase(), EnginePhase::Found);
    }

    #[tokio::test]
    async fn test_probe_errors_are_swallowed() {
        let clock = ManualClock::new();
        let surface = MockSurface::new(SurfaceId(1), ["hd720"]);
        let mut probe = MockProbe::failing_then_ready(2, surface);
        let mut state = EngineState::new(5);

        let outcome = discovery(&clock).discover(&mut state, &mut probe).await;

        assert!(matches!(outcome, DiscoveryOutcome::Found { .. }));
        assert_eq!(probe.calls(), 3);
    }

    #[tokio::test]
    async fn test_surface_without_options_is_not_ready() {
        let clock = ManualClock::new();
        let empty = MockSurface::new(SurfaceId(2), Vec::<&str>::new());
        let mut probe = MockProbe::always(empty.clone());
        let mut state = EngineState::new(4);

        let outcome = discovery(&clock).discover(&mut state, &mut probe).await;

        assert!(matches!(outcome, DiscoveryOutcome::GiveUp));
        assert_eq!(probe.calls(), 4);
        assert_eq!(empty.release_count(), 4);
    }
}

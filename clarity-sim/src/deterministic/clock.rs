//! Time control and random number generation for deterministic simulations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clarity_core::clock::Clock;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::SimulationError;

/// Maximum time that can be advanced in a single operation (24 hours).
const MAX_TIME_ADVANCE: Duration = Duration::from_secs(86400);

/// Deterministic clock for simulation time control.
///
/// Time only moves forward and is independent of wall-clock time.
#[derive(Debug, Clone)]
pub struct DeterministicClock {
    current_time: Instant,
    start_time: Instant,
}

impl Default for DeterministicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeterministicClock {
    /// Creates a clock at simulation time zero.
    pub fn new() -> Self {
        let start = Instant::now();
        Self {
            current_time: start,
            start_time: start,
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> Instant {
        self.current_time
    }

    /// Simulation time elapsed since start.
    pub fn elapsed(&self) -> Duration {
        self.current_time.duration_since(self.start_time)
    }

    /// Advances simulation time.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTimeAdvance` - If `duration` exceeds 24 hours
    pub fn advance(&mut self, duration: Duration) -> Result<(), SimulationError> {
        if duration > MAX_TIME_ADVANCE {
            return Err(SimulationError::InvalidTimeAdvance {
                reason: format!("{duration:?} exceeds the 24 hour step limit"),
            });
        }
        self.current_time += duration;
        Ok(())
    }

    /// Advances simulation time to `elapsed` after start. Targets already in
    /// the past are ignored.
    pub fn advance_to_elapsed(&mut self, elapsed: Duration) {
        let target = self.start_time + elapsed;
        if target > self.current_time {
            self.current_time = target;
        }
    }
}

/// Shared handle onto a [`DeterministicClock`], usable as the engine's
/// [`Clock`]. Sleeping advances simulation time instead of waiting.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    inner: Arc<Mutex<DeterministicClock>>,
}

impl SimulatedClock {
    /// Creates a clock at simulation time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulation time elapsed since start.
    pub fn elapsed(&self) -> Duration {
        self.inner.lock().elapsed()
    }

    /// Advances simulation time.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidTimeAdvance` - If `duration` exceeds 24 hours
    pub fn advance(&self, duration: Duration) -> Result<(), SimulationError> {
        self.inner.lock().advance(duration)
    }

    /// Advances simulation time to `elapsed` after start, if not already
    /// past it.
    pub fn advance_to_elapsed(&self, elapsed: Duration) {
        self.inner.lock().advance_to_elapsed(elapsed);
    }
}

#[async_trait]
impl Clock for SimulatedClock {
    fn now(&self) -> Instant {
        self.inner.lock().now()
    }

    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        if let Err(e) = self.advance(duration) {
            tracing::warn!("Simulated sleep clamped: {e}");
            let _ = self.advance(MAX_TIME_ADVANCE);
        }
        // Let other simulated tasks observe the new time
        tokio::task::yield_now().await;
    }
}

/// Deterministic random number generator for reproducible simulations.
///
/// Uses ChaCha8 so the same seed gives the same sequence on every platform.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DeterministicRng {
    /// Creates an RNG from a seed value.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this RNG was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random number in [0, 1).
    pub fn random_f64(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Random number in [min, max).
    pub fn random_range(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        min + (self.rng.next_u64() % (max - min))
    }

    /// Random boolean that is true with the given probability.
    pub fn random_bool(&mut self, probability: f64) -> bool {
        self.random_f64() < probability
    }
}

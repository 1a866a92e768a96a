//! Deterministic time and randomness for reproducible simulations.

pub mod clock;

pub use clock::{DeterministicClock, DeterministicRng, SimulatedClock};

//! Clarity Simulation Framework - deterministic testing for quality selection.
//!
//! Runs the real engine against a simulated player on virtual time, so a
//! slow page load or a navigation burst replays identically for a given
//! seed.
//!
//! # Example
//!
//! ```rust,no_run
//! use clarity_sim::{Scenario, ScenarioRunner};
//!
//! # async fn demo() -> Result<(), clarity_sim::SimulationError> {
//! let report = ScenarioRunner::new(42).run(Scenario::SlowPlayerLoad).await?;
//! assert!(report.passed());
//! # Ok(())
//! # }
//! ```

pub mod deterministic;
pub mod player;
pub mod scenarios;

use clarity_core::EngineError;
pub use deterministic::{DeterministicClock, DeterministicRng, SimulatedClock};
pub use player::{
    PlayerApiSurface, Selection, SimulatedMenu, SimulatedPlayer, SimulatedPlayerProbe,
    SimulatedSurface, SurfaceKind,
};
pub use scenarios::{Scenario, ScenarioReport, ScenarioRunner, SimulationScenarios};
use thiserror::Error;

/// Errors that can occur while running a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A single time step was too large
    #[error("Invalid time advance: {reason}")]
    InvalidTimeAdvance {
        /// What was wrong with the step
        reason: String,
    },

    /// No scenario has the requested name
    #[error("Unknown scenario: {name}")]
    UnknownScenario {
        /// Name that was requested
        name: String,
    },

    /// The engine stopped or rejected a command
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The engine kept working after the poll budget ran out
    #[error("Engine did not settle after {polls} status polls")]
    Unsettled {
        /// Polls made before giving up
        polls: usize,
    },
}

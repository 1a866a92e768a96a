//! Pre-built simulation scenarios for common page and player behaviors.
//!
//! Each scenario scripts a player and a sequence of page actions, runs the
//! real engine against them on simulated time and checks what it did.

pub mod builders;
pub mod runner;
pub mod types;

pub use builders::{ScenarioSetup, SimulationScenarios};
pub use runner::ScenarioRunner;
pub use types::{Expectation, Scenario, ScenarioReport, ScenarioStep, StepAction};

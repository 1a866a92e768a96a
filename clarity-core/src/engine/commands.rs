//! Command definitions for the quality engine actor.

use std::fmt;

use tokio::sync::oneshot;

use crate::profile::PreferenceProfile;
use crate::resolution::{NoMatchReason, ResolutionRule};
use crate::state::EnginePhase;
use crate::surface::OptionLabel;
use crate::watcher::EnvironmentEvent;

/// Commands that can be sent to the quality engine actor.
///
/// Fire-and-forget commands carry no responder. Everything the actor does in
/// response happens on its own task, in arrival order.
#[derive(Debug)]
pub enum EngineCommand {
    /// Replace the profile wholesale and re-run a cycle.
    UpdateSettings { profile: PreferenceProfile },
    /// Environment mutation notice for the change watcher.
    Environment { event: EnvironmentEvent },
    /// Run a cycle now with a fresh retry budget.
    Trigger,
    /// Snapshot of the engine's state.
    GetStatus {
        responder: oneshot::Sender<EngineStatus>,
    },
    /// Stop the actor after acknowledging.
    Shutdown { responder: oneshot::Sender<()> },
}

/// How one discovery/resolution/application cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The profile is switched off; nothing was probed
    Disabled,
    /// Discovery ran out of attempts
    GaveUp,
    /// A surface was found but nothing matched
    NoMatch(NoMatchReason),
    /// The surface was switched
    Applied {
        option: OptionLabel,
        rule: ResolutionRule,
    },
    /// The chosen option was already active
    AlreadyActive { option: OptionLabel },
    /// Another application held the apply flag
    Conflict,
    /// The surface rejected the selection
    Failed { reason: String },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::GaveUp => write!(f, "gave up waiting for the player"),
            Self::NoMatch(reason) => write!(f, "no match: {reason}"),
            Self::Applied { option, rule } => write!(f, "applied {option} ({rule})"),
            Self::AlreadyActive { option } => write!(f, "{option} already active"),
            Self::Conflict => write!(f, "dropped, application in flight"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Point-in-time view of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub phase: EnginePhase,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Cycles run since start
    pub cycles: u64,
    /// Cycles that switched the surface
    pub applied_count: u64,
    pub last_applied: Option<OptionLabel>,
    pub last_outcome: Option<CycleOutcome>,
    /// A startup or debounced cycle is waiting for its deadline
    pub scheduled: bool,
    pub profile: PreferenceProfile,
}

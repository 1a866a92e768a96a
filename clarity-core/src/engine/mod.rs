//! Quality engine actor.
//!
//! One engine runs per execution context. It owns the per-context state, the
//! change watcher and the current profile, and serializes every cycle and
//! every command through a single task.

pub mod actor;
pub mod commands;
pub mod core;
pub mod handle;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_mocks;

pub use actor::spawn_quality_engine;
pub use commands::{CycleOutcome, EngineCommand, EngineStatus};
pub use self::core::QualityEngine;
pub use handle::QualityEngineHandle;
use thiserror::Error;

use crate::store::StoreError;
use crate::surface::SurfaceError;

/// Errors surfaced by the engine and its handle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine has shut down")]
    EngineShutdown,
}

impl EngineError {
    /// Returns true if a later cycle may succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Surface(SurfaceError::NotReady { .. })
            | Self::Surface(SurfaceError::OptionUnavailable { .. })
            | Self::Surface(SurfaceError::Environment { .. }) => true,
            Self::Surface(SurfaceError::Unsupported { .. }) => false,
            Self::Store(StoreError::Unavailable { .. }) | Self::Store(StoreError::Io(_)) => true,
            Self::Store(StoreError::Serialization(_)) => false,
            Self::EngineShutdown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let not_ready = EngineError::from(SurfaceError::NotReady {
            reason: "menu closed".to_string(),
        });
        let unsupported = EngineError::from(SurfaceError::Unsupported {
            capability: "quality range",
        });

        assert!(not_ready.is_transient());
        assert!(!unsupported.is_transient());
        assert!(!EngineError::EngineShutdown.is_transient());
    }
}

//! Clarity Core - playback quality resolution and application
//!
//! This crate decides which of the quality options a video player currently
//! offers best matches a stored preference profile, applies it through
//! whatever control surface the player exposes, and re-applies it whenever
//! the page swaps in a new video.

pub mod apply;
pub mod bridge;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod labels;
pub mod menu;
pub mod messages;
pub mod profile;
pub mod resolution;
pub mod state;
pub mod store;
pub mod surface;
pub mod tracing_setup;
pub mod watcher;

// Re-export main types for convenient access
pub use config::ClarityConfig;
pub use engine::{EngineError, QualityEngineHandle, spawn_quality_engine};
pub use labels::LabelTables;
pub use profile::{PreferenceProfile, ProfileError, QualityLevel, QualityTarget};
pub use resolution::{Resolution, explain, resolve};
pub use store::{PreferenceStore, StoreError};
pub use surface::{OptionLabel, QualitySurface, SurfaceError, SurfaceProbe};

/// Errors that can bubble up from any Clarity subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ClarityError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl ClarityError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            ClarityError::Profile(ProfileError::InvalidQuality { value }) => {
                format!("Unknown quality '{value}', try 1080, 720p60, auto or highest")
            }
            ClarityError::Store(StoreError::Io(_)) => {
                "Settings file could not be accessed".to_string()
            }
            ClarityError::Store(StoreError::Serialization(_)) => {
                "Settings file is not valid JSON".to_string()
            }
            ClarityError::Store(StoreError::Unavailable { .. }) => {
                "Settings storage is unavailable".to_string()
            }
            ClarityError::Engine(EngineError::EngineShutdown) => "Engine has stopped".to_string(),
            ClarityError::Engine(_) | ClarityError::Surface(_) => {
                "The player rejected the quality change".to_string()
            }
            ClarityError::Configuration { reason } => format!("Configuration error: {reason}"),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ClarityError::Configuration { .. } | ClarityError::Profile(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClarityError>;

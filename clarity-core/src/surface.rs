//! Capability interface over whatever control surface the environment exposes.
//!
//! A surface may be a structured player object or a settings menu driven by
//! simulated clicks. The resolver never knows which; it only sees the ordered
//! option labels the surface lists.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One selectable quality level as currently offered by the environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionLabel(String);

impl OptionLabel {
    /// Wraps a raw label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OptionLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for OptionLabel {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// Builds an ordered option list from string slices.
pub fn option_labels<I, S>(labels: I) -> Vec<OptionLabel>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels.into_iter().map(OptionLabel::new).collect()
}

/// Identity of a discovered surface.
///
/// A changed identity means a new video element or player instance, which
/// starts a fresh discovery budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Errors reported by a control surface.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurfaceError {
    /// The surface exists but cannot list or accept options yet.
    #[error("Surface not ready: {reason}")]
    NotReady {
        /// Why the surface is unusable
        reason: String,
    },

    /// The chosen option disappeared before it could be applied.
    #[error("Option '{label}' is not offered by the surface")]
    OptionUnavailable {
        /// The missing option
        label: OptionLabel,
    },

    /// The surface does not provide the requested capability.
    #[error("Surface does not support {capability}")]
    Unsupported {
        /// Name of the missing capability
        capability: &'static str,
    },

    /// The environment rejected the call.
    #[error("Environment error: {reason}")]
    Environment {
        /// Failure description
        reason: String,
    },
}

/// Errors raised by a surface probe.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProbeError {
    /// The environment threw while being inspected.
    #[error("Probe failed: {reason}")]
    Environment {
        /// Failure description
        reason: String,
    },
}

/// Control surface through which quality can be listed and applied.
///
/// Methods take `&self` because a surface is a handle onto state owned by
/// the environment.
#[async_trait]
pub trait QualitySurface: Send + Sync {
    /// Identity of the underlying player or media element.
    fn id(&self) -> SurfaceId;

    /// Lists the options currently offered, best first.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::NotReady` - The option list cannot be read yet
    /// - `SurfaceError::Environment` - The environment rejected the call
    async fn list_available_options(&self) -> Result<Vec<OptionLabel>, SurfaceError>;

    /// Returns the option currently in effect, if the surface can tell.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Environment` - The environment rejected the call
    async fn current_option(&self) -> Result<Option<OptionLabel>, SurfaceError>;

    /// Makes `label` the active option.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::OptionUnavailable` - The option is no longer offered
    /// - `SurfaceError::Environment` - The environment rejected the call
    async fn set_option(&self, label: &OptionLabel) -> Result<(), SurfaceError>;

    /// Returns true if [`QualitySurface::set_option_range`] is available.
    fn supports_range(&self) -> bool {
        false
    }

    /// Pins the allowed quality range.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Unsupported` - The surface has no range control
    /// - `SurfaceError::Environment` - The environment rejected the call
    async fn set_option_range(
        &self,
        _low: &OptionLabel,
        _high: &OptionLabel,
    ) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported {
            capability: "quality range",
        })
    }

    /// Returns the surface to its resting state, e.g. closes open menus.
    async fn release(&self) {}
}

/// Inspects the environment for a usable surface.
#[async_trait]
pub trait SurfaceProbe: Send {
    /// The surface type this probe discovers.
    type Surface: QualitySurface;

    /// Looks for a surface once. `Ok(None)` means not present yet.
    ///
    /// # Errors
    ///
    /// - `ProbeError::Environment` - The environment threw during inspection
    async fn probe(&mut self) -> Result<Option<Self::Surface>, ProbeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_label_serializes_transparently() {
        let label = OptionLabel::new("hd1080");

        assert_eq!(serde_json::to_string(&label).unwrap(), "\"hd1080\"");
        assert_eq!(label.to_string(), "hd1080");
    }

    #[test]
    fn test_option_labels_preserves_order() {
        let labels = option_labels(["hd1080", "hd720", "auto"]);

        let texts: Vec<&str> = labels.iter().map(OptionLabel::as_str).collect();
        assert_eq!(texts, vec!["hd1080", "hd720", "auto"]);
    }

    #[test]
    fn test_surface_error_messages() {
        let error = SurfaceError::OptionUnavailable {
            label: OptionLabel::new("hd720"),
        };
        assert_eq!(error.to_string(), "Option 'hd720' is not offered by the surface");

        let error = SurfaceError::Unsupported {
            capability: "quality range",
        };
        assert_eq!(error.to_string(), "Surface does not support quality range");
    }
}

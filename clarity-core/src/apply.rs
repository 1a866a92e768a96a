//! Applies a resolved option through a discovered surface.
//!
//! Application is guarded by the per-context [`ApplyFlag`]: a call that finds
//! the flag held is dropped, not queued, since the next discovery cycle will
//! retry with fresh options anyway. The flag is released on every exit path
//! and the surface is always returned to its resting state.

use crate::profile::PreferenceProfile;
use crate::state::ApplyFlag;
use crate::store::{AppliedQuality, PreferenceStore};
use crate::surface::{OptionLabel, QualitySurface, SurfaceError};

/// What an application attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The surface was switched to the chosen option
    Applied,
    /// The chosen option was already active; nothing was changed
    AlreadyActive,
    /// Another application was in flight; this one was dropped
    Conflict,
}

impl ApplyOutcome {
    /// Returns true if the surface was mutated.
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Applies `choice` to `surface` under the apply flag.
///
/// The premium range pin and the persistence record are best effort: their
/// failures are logged and never undo the primary selection.
///
/// # Errors
///
/// - `SurfaceError` - The primary selection was rejected by the surface
pub async fn apply<S, St>(
    surface: &S,
    choice: &OptionLabel,
    profile: &PreferenceProfile,
    flag: &ApplyFlag,
    store: &St,
) -> Result<ApplyOutcome, SurfaceError>
where
    S: QualitySurface + ?Sized,
    St: PreferenceStore + ?Sized,
{
    let Some(_guard) = flag.try_acquire() else {
        tracing::debug!("Application already in flight, dropping request for {choice}");
        return Ok(ApplyOutcome::Conflict);
    };

    let result = apply_guarded(surface, choice, profile, store).await;
    surface.release().await;
    result
}

async fn apply_guarded<S, St>(
    surface: &S,
    choice: &OptionLabel,
    profile: &PreferenceProfile,
    store: &St,
) -> Result<ApplyOutcome, SurfaceError>
where
    S: QualitySurface + ?Sized,
    St: PreferenceStore + ?Sized,
{
    match surface.current_option().await {
        Ok(Some(current)) if current == *choice => {
            tracing::debug!("{} already at {choice}", surface.id());
            return Ok(ApplyOutcome::AlreadyActive);
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("Could not read current option of {}: {e}", surface.id()),
    }

    surface.set_option(choice).await?;
    tracing::info!("Quality set to {choice} ({})", profile.quality);

    if profile.premium_bitrate
        && surface.supports_range()
        && let Err(e) = surface.set_option_range(choice, choice).await
    {
        tracing::warn!("Failed to pin quality range to {choice}: {e}");
    }

    if profile.persist {
        let record = AppliedQuality::now(profile.quality, choice.clone());
        if let Err(e) = store.record_applied(&record).await {
            tracing::warn!("Failed to persist applied quality {choice}: {e}");
        }
    }

    Ok(ApplyOutcome::Applied)
}

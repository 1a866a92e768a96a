//! Change watcher: turns environment mutation notices into debounced
//! re-resolution triggers.
//!
//! The environment reports mutations in bursts (a navigation swaps the media
//! element, fires navigation events and updates the player within a few
//! hundred milliseconds). The watcher coalesces each burst into one trigger,
//! due a short delay after the first significant event so the new surface
//! has time to settle.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::WatcherConfig;

/// Identity of the page's primary media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub u64);

/// Mutation notices delivered by the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnvironmentEvent {
    /// The page's primary media element, as seen after a DOM mutation
    MediaElementObserved { id: MediaId },
    /// The page location changed without a reload
    Navigated { url: String },
    /// The site finished an in-page navigation
    NavigationFinished,
    /// The player reported a new video or configuration
    PlayerUpdated,
    /// The player started playing the given media element
    PlaybackStarted { id: MediaId },
}

/// Why a trigger fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerReason {
    /// A different media element appeared
    MediaChanged(MediaId),
    /// The location changed to this URL
    Navigated(String),
    /// In-page navigation finished
    NavigationFinished,
    /// Player update notice
    PlayerUpdated,
    /// Playback began on this media element
    PlaybackStarted(MediaId),
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MediaChanged(id) => write!(f, "media element #{} observed", id.0),
            Self::Navigated(url) => write!(f, "navigated to {url}"),
            Self::NavigationFinished => write!(f, "navigation finished"),
            Self::PlayerUpdated => write!(f, "player updated"),
            Self::PlaybackStarted(id) => write!(f, "playback started on media element #{}", id.0),
        }
    }
}

/// A coalesced re-resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Every significant event merged into this trigger, in arrival order
    pub reasons: Vec<TriggerReason>,
    /// When the trigger became due
    pub due: Instant,
}

/// Debouncing watcher over environment events.
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    config: WatcherConfig,
    last_media: Option<MediaId>,
    last_url: Option<String>,
    last_playing: Option<MediaId>,
    pending: Option<Trigger>,
}

impl ChangeWatcher {
    /// Creates a watcher with no observed media or location.
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            last_media: None,
            last_url: None,
            last_playing: None,
            pending: None,
        }
    }

    /// Records the current location without triggering.
    pub fn with_initial_url(mut self, url: impl Into<String>) -> Self {
        self.last_url = Some(url.into());
        self
    }

    /// Feeds one event. Returns true if it scheduled or joined a trigger.
    pub fn observe(&mut self, event: EnvironmentEvent, now: Instant) -> bool {
        let (reason, delay) = match event {
            EnvironmentEvent::MediaElementObserved { id } => {
                if self.last_media == Some(id) {
                    return false;
                }
                self.last_media = Some(id);
                (TriggerReason::MediaChanged(id), self.config.media_change_delay)
            }
            EnvironmentEvent::Navigated { url } => {
                if self.last_url.as_deref() == Some(url.as_str()) {
                    return false;
                }
                self.last_url = Some(url.clone());
                if !self.navigation_counts(&url) {
                    tracing::trace!("Ignoring navigation to {url}");
                    return false;
                }
                (TriggerReason::Navigated(url), self.config.navigation_delay)
            }
            EnvironmentEvent::NavigationFinished => (
                TriggerReason::NavigationFinished,
                self.config.navigation_finished_delay,
            ),
            EnvironmentEvent::PlayerUpdated => {
                (TriggerReason::PlayerUpdated, self.config.player_updated_delay)
            }
            // Only the first start of each media element counts
            EnvironmentEvent::PlaybackStarted { id } => {
                if self.last_playing == Some(id) {
                    return false;
                }
                self.last_playing = Some(id);
                (
                    TriggerReason::PlaybackStarted(id),
                    self.config.playback_started_delay,
                )
            }
        };

        match &mut self.pending {
            Some(pending) => {
                tracing::trace!("Merging {reason} into pending trigger");
                pending.reasons.push(reason);
            }
            None => {
                tracing::debug!("Scheduling re-resolution in {delay:?}: {reason}");
                self.pending = Some(Trigger {
                    reasons: vec![reason],
                    due: now + delay,
                });
            }
        }
        true
    }

    /// Deadline of the pending trigger, if any.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|trigger| trigger.due)
    }

    /// Returns the pending trigger once its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<Trigger> {
        match &self.pending {
            Some(trigger) if trigger.due <= now => self.pending.take(),
            _ => None,
        }
    }

    fn navigation_counts(&self, url: &str) -> bool {
        match &self.config.navigation_path_filter {
            Some(filter) => url.contains(filter.as_str()),
            None => true,
        }
    }
}

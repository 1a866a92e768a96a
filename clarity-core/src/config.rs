//! Centralized configuration for Clarity.
//!
//! All tunable delays, budgets and label tables are defined here to avoid
//! hard-coded values scattered throughout the engine.

use std::time::Duration;

use crate::discovery::RetryStrategy;
use crate::labels::LabelTables;

/// Central configuration for all engine components.
#[derive(Debug, Clone, Default)]
pub struct ClarityConfig {
    pub discovery: DiscoveryConfig,
    pub watcher: WatcherConfig,
    pub apply: ApplyConfig,
    pub labels: LabelTables,
}

/// Surface discovery budget and pacing.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Probe attempts before giving up silently
    pub max_retries: u32,
    /// Delay policy between attempts
    pub retry_strategy: RetryStrategy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_strategy: RetryStrategy::default(), // 500 ms fixed
        }
    }
}

/// Debounce delays for the change watcher.
///
/// Each delay gives the new surface time to settle before discovery starts.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Delay after a new media element appears
    pub media_change_delay: Duration,
    /// Delay after the location changes
    pub navigation_delay: Duration,
    /// Delay after the site reports a finished navigation
    pub navigation_finished_delay: Duration,
    /// Delay after the player reports an update
    pub player_updated_delay: Duration,
    /// Delay after the player starts playing a media element
    pub playback_started_delay: Duration,
    /// Only locations containing this fragment count as navigations
    pub navigation_path_filter: Option<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            media_change_delay: Duration::from_millis(1000),
            navigation_delay: Duration::from_millis(2000),
            navigation_finished_delay: Duration::from_millis(1500),
            player_updated_delay: Duration::from_millis(1000),
            playback_started_delay: Duration::ZERO,
            navigation_path_filter: Some("/watch".to_string()),
        }
    }
}

impl WatcherConfig {
    /// Uses `delay` for every kind of change.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            media_change_delay: delay,
            navigation_delay: delay,
            navigation_finished_delay: delay,
            player_updated_delay: delay,
            playback_started_delay: delay,
            ..Self::default()
        }
    }
}

/// Timing of the application procedure and engine start-up.
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    /// Wait for the page's own UI to respond after a simulated click
    pub settle_delay: Duration,
    /// Delay before the first cycle after the engine starts
    pub initial_delay: Duration,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            initial_delay: Duration::from_millis(2000),
        }
    }
}

impl ClarityConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and keep their defaults. A label table
    /// file that cannot be read is logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(retries) = env_parse::<u32>("CLARITY_MAX_RETRIES") {
            config.discovery.max_retries = retries;
        }

        if let Some(millis) = env_parse::<u64>("CLARITY_RETRY_INTERVAL_MS") {
            config.discovery.retry_strategy = RetryStrategy::FixedDelay {
                delay: Duration::from_millis(millis),
            };
        }

        if let Some(millis) = env_parse::<u64>("CLARITY_DEBOUNCE_MS") {
            let filter = config.watcher.navigation_path_filter.take();
            config.watcher = WatcherConfig {
                navigation_path_filter: filter,
                ..WatcherConfig::uniform(Duration::from_millis(millis))
            };
        }

        if let Some(millis) = env_parse::<u64>("CLARITY_SETTLE_DELAY_MS") {
            config.apply.settle_delay = Duration::from_millis(millis);
        }

        if let Ok(path) = std::env::var("CLARITY_LABELS_FILE") {
            match std::fs::read_to_string(&path) {
                Ok(json) => match LabelTables::from_json(&json) {
                    Ok(tables) => config.labels = tables,
                    Err(e) => tracing::warn!("Ignoring malformed label tables in {path}: {e}"),
                },
                Err(e) => tracing::warn!("Cannot read label tables from {path}: {e}"),
            }
        }

        config
    }

    /// Creates a configuration with short delays for fast tests.
    pub fn for_testing() -> Self {
        Self {
            discovery: DiscoveryConfig {
                max_retries: 5,
                retry_strategy: RetryStrategy::FixedDelay {
                    delay: Duration::from_millis(10),
                },
            },
            watcher: WatcherConfig::uniform(Duration::from_millis(20)),
            apply: ApplyConfig {
                settle_delay: Duration::ZERO,
                initial_delay: Duration::ZERO,
            },
            labels: LabelTables::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = ClarityConfig::default();

        assert_eq!(config.discovery.max_retries, 10);
        assert_eq!(
            config.discovery.retry_strategy.calculate_delay(1),
            Duration::from_millis(500)
        );
        assert_eq!(config.watcher.media_change_delay, Duration::from_millis(1000));
        assert_eq!(config.watcher.navigation_delay, Duration::from_millis(2000));
        assert_eq!(
            config.watcher.navigation_path_filter.as_deref(),
            Some("/watch")
        );
        assert_eq!(config.apply.settle_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_testing_preset_is_fast() {
        let config = ClarityConfig::for_testing();

        assert_eq!(config.apply.initial_delay, Duration::ZERO);
        assert!(config.watcher.navigation_delay < Duration::from_millis(100));
        assert_eq!(config.watcher.navigation_path_filter.as_deref(), Some("/watch"));
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let labels_path = dir.path().join("labels.json");
        std::fs::write(&labels_path, r#"{"hdr_markers": ["HDR10"]}"#).unwrap();

        unsafe {
            std::env::set_var("CLARITY_MAX_RETRIES", "3");
            std::env::set_var("CLARITY_RETRY_INTERVAL_MS", "250");
            std::env::set_var("CLARITY_DEBOUNCE_MS", "400");
            std::env::set_var("CLARITY_SETTLE_DELAY_MS", "not-a-number");
            std::env::set_var("CLARITY_LABELS_FILE", &labels_path);
        }

        let config = ClarityConfig::from_env();

        assert_eq!(config.discovery.max_retries, 3);
        assert_eq!(
            config.discovery.retry_strategy,
            RetryStrategy::FixedDelay {
                delay: Duration::from_millis(250)
            }
        );
        assert_eq!(config.watcher.navigation_delay, Duration::from_millis(400));
        assert_eq!(
            config.watcher.navigation_path_filter.as_deref(),
            Some("/watch")
        );
        assert_eq!(config.apply.settle_delay, Duration::from_millis(100));
        assert_eq!(config.labels.hdr_markers, vec!["hdr10"]);

        // Cleanup
        unsafe {
            std::env::remove_var("CLARITY_MAX_RETRIES");
            std::env::remove_var("CLARITY_RETRY_INTERVAL_MS");
            std::env::remove_var("CLARITY_DEBOUNCE_MS");
            std::env::remove_var("CLARITY_SETTLE_DELAY_MS");
            std::env::remove_var("CLARITY_LABELS_FILE");
        }
    }
}

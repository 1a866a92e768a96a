//! CLI command implementations

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use clarity_core::resolution::Resolution;
use clarity_core::store::JsonFilePreferenceStore;
use clarity_core::surface::option_labels;
use clarity_core::{ClarityConfig, PreferenceProfile, PreferenceStore, QualityTarget, explain};
use clarity_sim::{Scenario, ScenarioReport, ScenarioRunner};

/// Default location of the profile document.
const DEFAULT_PROFILE_FILE: &str = "clarity-profile.json";

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a preference against a list of options
    Resolve {
        /// Available options, best first, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        options: Vec<String>,
        /// Requested quality (auto, highest, premium, 1080, 720p60, ...)
        #[arg(short, long, default_value = "auto")]
        quality: QualityTarget,
        /// Prefer high-frame-rate variants
        #[arg(long = "prefer-60fps")]
        prefer_high_frame_rate: bool,
        /// Prefer HDR variants
        #[arg(long)]
        prefer_hdr: bool,
        /// Always take the best option
        #[arg(long)]
        highest: bool,
        /// Resolve with quality control switched off
        #[arg(long)]
        disabled: bool,
    },
    /// Show or edit the stored profile
    Profile {
        /// Profile document
        #[arg(short, long, default_value = DEFAULT_PROFILE_FILE)]
        file: PathBuf,
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Run simulation scenarios
    Simulate {
        /// Scenario name, or "all"
        #[arg(default_value = "all")]
        scenario: String,
        /// Seed for randomized scenarios
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

/// Profile subcommands
#[derive(Subcommand)]
pub enum ProfileAction {
    /// Print the profile and the last applied quality
    Show,
    /// Change profile fields; omitted fields keep their stored values
    Set {
        #[arg(short, long)]
        quality: Option<QualityTarget>,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        highest: Option<bool>,
        #[arg(long)]
        premium_bitrate: Option<bool>,
        #[arg(long = "prefer-60fps")]
        prefer_high_frame_rate: Option<bool>,
        #[arg(long)]
        prefer_hdr: Option<bool>,
        #[arg(long)]
        persist: Option<bool>,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the error of the command that failed
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Resolve {
            options,
            quality,
            prefer_high_frame_rate,
            prefer_hdr,
            highest,
            disabled,
        } => {
            let profile = PreferenceProfile {
                enabled: !disabled,
                quality,
                highest_quality: highest,
                prefer_high_frame_rate,
                prefer_hdr,
                ..PreferenceProfile::default()
            };
            resolve_options(&profile, &options);
            Ok(())
        }
        Commands::Profile { file, action } => {
            let store = JsonFilePreferenceStore::new(file);
            match action {
                ProfileAction::Show => show_profile(&store).await,
                ProfileAction::Set {
                    quality,
                    enabled,
                    highest,
                    premium_bitrate,
                    prefer_high_frame_rate,
                    prefer_hdr,
                    persist,
                } => {
                    let mut profile = store
                        .load()
                        .await
                        .with_context(|| format!("reading {}", store.path().display()))?;
                    profile.quality = quality.unwrap_or(profile.quality);
                    profile.enabled = enabled.unwrap_or(profile.enabled);
                    profile.highest_quality = highest.unwrap_or(profile.highest_quality);
                    profile.premium_bitrate = premium_bitrate.unwrap_or(profile.premium_bitrate);
                    profile.prefer_high_frame_rate =
                        prefer_high_frame_rate.unwrap_or(profile.prefer_high_frame_rate);
                    profile.prefer_hdr = prefer_hdr.unwrap_or(profile.prefer_hdr);
                    profile.persist = persist.unwrap_or(profile.persist);
                    save_profile(&store, &profile).await
                }
            }
        }
        Commands::Simulate { scenario, seed } => run_simulation(&scenario, seed).await,
    }
}

/// Print the option `profile` resolves to and the rule that chose it
pub fn resolve_options(profile: &PreferenceProfile, options: &[String]) {
    let config = ClarityConfig::from_env();
    let labels = option_labels(options.iter().map(|o| o.trim()));

    match explain(profile, &labels, &config.labels) {
        Resolution::Chosen { option, rule } => println!("{option} ({rule})"),
        Resolution::NoMatch(reason) => println!("no option chosen: {reason}"),
    }
}

/// Print the stored profile
///
/// # Errors
/// - `StoreError` - The profile document cannot be read
pub async fn show_profile(store: &JsonFilePreferenceStore) -> anyhow::Result<()> {
    let location = store.path().display().to_string();
    let profile = store
        .load()
        .await
        .with_context(|| format!("reading {location}"))?;

    println!("Profile ({location}):");
    println!("  enabled:         {}", profile.enabled);
    println!("  quality:         {}", profile.quality);
    println!("  highest:         {}", profile.highest_quality);
    println!("  premium bitrate: {}", profile.premium_bitrate);
    println!("  prefer 60fps:    {}", profile.prefer_high_frame_rate);
    println!("  prefer HDR:      {}", profile.prefer_hdr);
    println!("  persist:         {}", profile.persist);

    if let Some(record) = store.last_applied().await? {
        println!(
            "Last applied: {} for {} at {}",
            record.option,
            record.quality,
            record.applied_at.to_rfc3339()
        );
    }
    Ok(())
}

/// Write `profile` to the store
///
/// # Errors
/// - `StoreError` - The profile document cannot be written
pub async fn save_profile(
    store: &JsonFilePreferenceStore,
    profile: &PreferenceProfile,
) -> anyhow::Result<()> {
    store
        .save(profile)
        .await
        .with_context(|| format!("writing {}", store.path().display()))?;
    println!("Saved profile to {}", store.path().display());
    Ok(())
}

/// Run one scenario, or all of them, and print the JSON reports
///
/// # Errors
/// - `SimulationError::UnknownScenario` - No scenario has that name
/// - `SimulationError::Unsettled` - The engine never went quiet
/// - Fails when any scenario expectation did not hold
pub async fn run_simulation(scenario: &str, seed: u64) -> anyhow::Result<()> {
    let runner = ScenarioRunner::new(seed);
    let reports = if scenario == "all" {
        runner.run_all().await?
    } else {
        let scenario: Scenario = scenario.parse()?;
        vec![runner.run(scenario).await?]
    };

    println!("{}", serde_json::to_string_pretty(&reports)?);

    let failed: Vec<&ScenarioReport> = reports.iter().filter(|r| !r.passed()).collect();
    if failed.is_empty() {
        Ok(())
    } else {
        let names: Vec<String> = failed.iter().map(|r| r.scenario.to_string()).collect();
        anyhow::bail!("{} scenario(s) failed: {}", failed.len(), names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use clarity_core::QualityLevel;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_profile_set_keeps_unchanged_fields() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("profile.json");

        handle_command(Commands::Profile {
            file: file.clone(),
            action: ProfileAction::Set {
                quality: Some(QualityTarget::Specific(QualityLevel::new(720))),
                enabled: None,
                highest: None,
                premium_bitrate: None,
                prefer_high_frame_rate: Some(true),
                prefer_hdr: None,
                persist: None,
            },
        })
        .await
        .unwrap();

        let profile = JsonFilePreferenceStore::new(&file).load().await.unwrap();
        assert_eq!(profile.quality, QualityTarget::Specific(QualityLevel::new(720)));
        assert!(profile.prefer_high_frame_rate);
        assert!(profile.enabled);
        assert!(profile.persist);
    }

    #[tokio::test]
    async fn test_show_profile_on_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = JsonFilePreferenceStore::new(dir.path().join("absent.json"));

        assert!(show_profile(&store).await.is_ok());
    }

    #[tokio::test]
    async fn test_simulate_rejects_unknown_scenario() {
        assert!(run_simulation("packet-storm", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_simulate_single_scenario() {
        assert!(run_simulation("menu-only-player", 1).await.is_ok());
    }
}

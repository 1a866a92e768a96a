//! Integration tests for the quality engine.
//!
//! These drive a spawned engine through its public handle with mock probes
//! and surfaces. Time is paused, so debounce and retry delays elapse
//! instantly while keeping their ordering.

use std::time::Duration;

use clarity_core::bridge::{SettingsBridge, run_page_listener};
use clarity_core::clock::SystemClock;
use clarity_core::config::ClarityConfig;
use clarity_core::engine::test_mocks::{MockProbe, MockSurface};
use clarity_core::engine::{CycleOutcome, EngineError, EngineStatus, QualityEngineHandle};
use clarity_core::state::EnginePhase;
use clarity_core::store::{MemoryPreferenceStore, PreferenceStore};
use clarity_core::surface::{OptionLabel, SurfaceId};
use clarity_core::watcher::{EnvironmentEvent, MediaId};
use clarity_core::{PreferenceProfile, QualityLevel, QualityTarget, spawn_quality_engine};
use tokio::sync::mpsc;

/// Spawned engine plus the shared ends of its mocks.
struct EngineTestFixture {
    handle: QualityEngineHandle,
    probe: MockProbe,
    store: MemoryPreferenceStore,
}

impl EngineTestFixture {
    fn new(probe: MockProbe, profile: PreferenceProfile) -> Self {
        let store = MemoryPreferenceStore::with_profile(profile);
        let handle = spawn_quality_engine(
            ClarityConfig::for_testing(),
            probe.clone(),
            store.clone(),
            SystemClock,
        );

        Self {
            handle,
            probe,
            store,
        }
    }

    /// Polls the engine until `done` holds, failing after a generous bound.
    async fn wait_for(&self, done: impl Fn(&EngineStatus) -> bool) -> EngineStatus {
        for _ in 0..500 {
            let status = self.handle.status().await.unwrap();
            if done(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("engine did not reach the expected state");
    }
}

fn targeting(height: u32) -> PreferenceProfile {
    PreferenceProfile::targeting(QualityTarget::Specific(QualityLevel::new(height)))
}

#[tokio::test(start_paused = true)]
async fn test_initial_cycle_applies_stored_preference() {
    let surface = MockSurface::new(SurfaceId(1), ["hd1080", "hd720", "auto"]);
    let fixture = EngineTestFixture::new(MockProbe::always(surface.clone()), targeting(720));

    let status = fixture.wait_for(|s| s.applied_count == 1).await;

    assert_eq!(status.last_applied, Some(OptionLabel::new("hd720")));
    assert_eq!(surface.applied(), vec![OptionLabel::new("hd720")]);

    let record = fixture.store.last_applied().await.unwrap().unwrap();
    assert_eq!(record.option, OptionLabel::new("hd720"));
}

#[tokio::test(start_paused = true)]
async fn test_player_that_loads_late_is_still_configured() {
    let surface = MockSurface::new(SurfaceId(1), ["hd1080", "hd720"]);
    let fixture =
        EngineTestFixture::new(MockProbe::ready_after(4, surface.clone()), targeting(1080));

    let status = fixture.wait_for(|s| s.applied_count == 1).await;

    assert_eq!(fixture.probe.calls(), 4);
    assert_eq!(status.retry_count, 0);
    assert_eq!(surface.applied(), vec![OptionLabel::new("hd1080")]);
}

#[tokio::test(start_paused = true)]
async fn test_new_video_triggers_reapplication() {
    let first = MockSurface::new(SurfaceId(1), ["hd1080", "hd720"]);
    let fixture = EngineTestFixture::new(MockProbe::always(first.clone()), targeting(1080));
    fixture.wait_for(|s| s.applied_count == 1).await;

    let second = MockSurface::new(SurfaceId(2), ["hd2160", "hd1080", "hd720"]);
    fixture.probe.set_surface(Some(second.clone()));
    fixture
        .handle
        .notify(EnvironmentEvent::MediaElementObserved { id: MediaId(2) })
        .await
        .unwrap();

    fixture.wait_for(|s| s.applied_count == 2).await;

    assert_eq!(first.applied().len(), 1);
    assert_eq!(second.applied(), vec![OptionLabel::new("hd1080")]);
}

#[tokio::test(start_paused = true)]
async fn test_settings_update_replaces_profile() {
    let surface = MockSurface::new(SurfaceId(1), ["hd1080", "hd720", "auto"]);
    let fixture = EngineTestFixture::new(MockProbe::always(surface.clone()), targeting(1080));
    fixture.wait_for(|s| s.applied_count == 1).await;

    fixture
        .handle
        .update_settings(PreferenceProfile::targeting(QualityTarget::Auto))
        .await
        .unwrap();

    let status = fixture.wait_for(|s| s.applied_count == 2).await;
    assert_eq!(status.profile.quality, QualityTarget::Auto);
    assert_eq!(status.last_applied, Some(OptionLabel::new("auto")));
}

#[tokio::test(start_paused = true)]
async fn test_never_ready_player_gives_up_silently() {
    let fixture = EngineTestFixture::new(MockProbe::never_ready(), PreferenceProfile::default());

    let status = fixture.wait_for(|s| s.phase == EnginePhase::Exhausted).await;
    assert_eq!(status.last_outcome, Some(CycleOutcome::GaveUp));
    assert_eq!(fixture.probe.calls(), 5);

    // No further polling without a trigger
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fixture.probe.calls(), 5);

    fixture
        .handle
        .notify(EnvironmentEvent::PlayerUpdated)
        .await
        .unwrap();
    fixture.wait_for(|s| s.cycles == 2 && s.phase == EnginePhase::Exhausted).await;
    assert_eq!(fixture.probe.calls(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_playback_start_configures_player_after_give_up() {
    let fixture = EngineTestFixture::new(MockProbe::never_ready(), targeting(480));
    fixture.wait_for(|s| s.phase == EnginePhase::Exhausted).await;

    let surface = MockSurface::new(SurfaceId(3), ["hd1080", "hd720", "hd480", "auto"]);
    fixture.probe.set_surface(Some(surface.clone()));
    fixture
        .handle
        .notify(EnvironmentEvent::PlaybackStarted { id: MediaId(3) })
        .await
        .unwrap();

    let status = fixture.wait_for(|s| s.applied_count == 1).await;
    assert_eq!(status.last_applied, Some(OptionLabel::new("hd480")));
    assert_eq!(surface.applied(), vec![OptionLabel::new("hd480")]);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_profile_leaves_player_alone() {
    let surface = MockSurface::new(SurfaceId(1), ["hd1080"]);
    let fixture = EngineTestFixture::new(
        MockProbe::always(surface.clone()),
        PreferenceProfile::disabled(),
    );

    let status = fixture.wait_for(|s| s.cycles == 1).await;

    assert_eq!(status.last_outcome, Some(CycleOutcome::Disabled));
    assert_eq!(fixture.probe.calls(), 0);
    assert!(surface.applied().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_settings_reach_page_side_through_bridge() {
    let surface = MockSurface::new(SurfaceId(1), ["hd1080", "premium 1080p", "hd720"]);
    let fixture = EngineTestFixture::new(MockProbe::always(surface.clone()), targeting(720));
    fixture.wait_for(|s| s.applied_count == 1).await;

    let content_store =
        MemoryPreferenceStore::with_profile(PreferenceProfile::targeting(QualityTarget::Premium));
    let (to_content, content_inbox) = mpsc::channel(8);
    let (to_page, page_inbox) = mpsc::channel(8);
    tokio::spawn(SettingsBridge::new(content_store).run(content_inbox, to_page));
    tokio::spawn(run_page_listener(fixture.handle.clone(), to_content, page_inbox));

    let status = fixture.wait_for(|s| s.applied_count == 2).await;

    assert_eq!(status.profile.quality, QualityTarget::Premium);
    assert_eq!(status.last_applied, Some(OptionLabel::new("premium 1080p")));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_engine() {
    let fixture = EngineTestFixture::new(MockProbe::never_ready(), PreferenceProfile::default());

    fixture.handle.shutdown().await.unwrap();

    assert!(matches!(
        fixture.handle.status().await,
        Err(EngineError::EngineShutdown)
    ));
}

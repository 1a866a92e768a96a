//! Actor implementation for the quality engine.

use tokio::sync::mpsc;

use super::commands::EngineCommand;
use super::core::QualityEngine;
use super::handle::QualityEngineHandle;
use crate::clock::Clock;
use crate::config::ClarityConfig;
use crate::store::PreferenceStore;
use crate::surface::SurfaceProbe;

/// Capacity of the engine's command inbox.
const COMMAND_BUFFER: usize = 100;

/// Spawns the quality engine actor and returns its handle.
///
/// The actor loads the stored profile, runs its first cycle after the
/// configured initial delay, and from then on runs a cycle whenever the
/// change watcher's debounce deadline passes or a command asks for one.
/// Commands and cycles are processed one at a time.
///
/// # Examples
/// ```rust,no_run
/// use clarity_core::clock::SystemClock;
/// use clarity_core::config::ClarityConfig;
/// use clarity_core::engine::spawn_quality_engine;
/// use clarity_core::store::MemoryPreferenceStore;
/// use clarity_core::surface::SurfaceProbe;
///
/// async fn start<P: SurfaceProbe + 'static>(probe: P) {
///     let config = ClarityConfig::from_env();
///     let handle = spawn_quality_engine(config, probe, MemoryPreferenceStore::new(), SystemClock);
///     assert!(handle.is_running());
/// }
/// ```
pub fn spawn_quality_engine<P, S, C>(
    config: ClarityConfig,
    probe: P,
    store: S,
    clock: C,
) -> QualityEngineHandle
where
    P: SurfaceProbe + 'static,
    S: PreferenceStore + 'static,
    C: Clock + Clone + 'static,
{
    let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
    let engine = QualityEngine::new(config, probe, store, clock);

    tokio::spawn(async move {
        run_actor_loop(engine, receiver).await;
    });

    QualityEngineHandle::new(sender)
}

/// Runs the main actor loop.
///
/// Commands take priority over a due deadline so that a settings update
/// arriving together with a page change is applied before the cycle runs.
/// The loop ends on a shutdown command or when every handle is dropped.
async fn run_actor_loop<P, S, C>(
    mut engine: QualityEngine<P, S, C>,
    mut receiver: mpsc::Receiver<EngineCommand>,
) where
    P: SurfaceProbe + 'static,
    S: PreferenceStore + 'static,
    C: Clock + Clone + 'static,
{
    tracing::debug!("Quality engine actor started");
    engine.start().await;

    loop {
        let wait = engine.time_until_due();
        let clock = engine.clock().clone();

        tokio::select! {
            biased;

            command = receiver.recv() => match command {
                Some(command) => {
                    if !handle_command(&mut engine, command).await {
                        break;
                    }
                }
                None => break,
            },
            _ = clock.sleep(wait.unwrap_or_default()), if wait.is_some() => {
                engine.run_due().await;
            }
        }
    }

    engine.stop();
    tracing::debug!("Quality engine actor stopped");
}

/// Handles a single command.
/// Returns true to continue processing, false to shut down.
async fn handle_command<P, S, C>(
    engine: &mut QualityEngine<P, S, C>,
    command: EngineCommand,
) -> bool
where
    P: SurfaceProbe,
    S: PreferenceStore,
    C: Clock + Clone,
{
    match command {
        EngineCommand::UpdateSettings { profile } => {
            engine.replace_profile(profile);
            engine.run_cycle().await;
        }

        EngineCommand::Environment { event } => {
            engine.observe(event);
        }

        EngineCommand::Trigger => {
            engine.trigger().await;
        }

        EngineCommand::GetStatus { responder } => {
            let _ = responder.send(engine.status());
        }

        EngineCommand::Shutdown { responder } => {
            engine.stop();
            let _ = responder.send(());
            return false;
        }
    }

    true
}

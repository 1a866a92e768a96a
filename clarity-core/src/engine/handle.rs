//! Handle for communicating with the quality engine actor.

use tokio::sync::{mpsc, oneshot};

use super::EngineError;
use super::commands::{EngineCommand, EngineStatus};
use crate::profile::PreferenceProfile;
use crate::watcher::EnvironmentEvent;

/// Handle for communicating with the quality engine actor.
///
/// Cheap to clone. Every clone talks to the same actor.
#[derive(Debug, Clone)]
pub struct QualityEngineHandle {
    sender: mpsc::Sender<EngineCommand>,
}

impl QualityEngineHandle {
    /// Creates a new handle with the given command sender.
    pub fn new(sender: mpsc::Sender<EngineCommand>) -> Self {
        Self { sender }
    }

    /// Replaces the engine's profile and re-runs a cycle with a fresh retry
    /// budget. Returns once the command is queued.
    ///
    /// # Errors
    /// - `EngineError::EngineShutdown` - The actor has stopped
    pub async fn update_settings(&self, profile: PreferenceProfile) -> Result<(), EngineError> {
        self.send(EngineCommand::UpdateSettings { profile }).await
    }

    /// Forwards an environment mutation notice to the change watcher.
    ///
    /// # Errors
    /// - `EngineError::EngineShutdown` - The actor has stopped
    pub async fn notify(&self, event: EnvironmentEvent) -> Result<(), EngineError> {
        self.send(EngineCommand::Environment { event }).await
    }

    /// Requests an immediate cycle.
    ///
    /// # Errors
    /// - `EngineError::EngineShutdown` - The actor has stopped
    pub async fn trigger(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Trigger).await
    }

    /// Gets a snapshot of the engine's state. Answered after every command
    /// queued before it.
    ///
    /// # Errors
    /// - `EngineError::EngineShutdown` - The actor has stopped
    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        let (responder, rx) = oneshot::channel();
        self.send(EngineCommand::GetStatus { responder }).await?;
        rx.await.map_err(|_| EngineError::EngineShutdown)
    }

    /// Stops the actor and waits for it to acknowledge.
    ///
    /// # Errors
    /// - `EngineError::EngineShutdown` - The actor had already stopped
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (responder, rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown { responder }).await?;
        rx.await.map_err(|_| EngineError::EngineShutdown)
    }

    /// Returns true while the actor accepts commands.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| EngineError::EngineShutdown)
    }
}

//! Settings relay between the two execution contexts.
//!
//! The content side can reach the preference store but not the player; the
//! page side is the opposite. [`SettingsBridge`] answers the page side's
//! requests from the store and relays updates coming from the settings UI.
//! [`run_page_listener`] feeds whatever profile reaches the page side into
//! its engine.

use tokio::sync::mpsc;

use crate::engine::{EngineError, QualityEngineHandle};
use crate::messages::ContextMessage;
use crate::store::PreferenceStore;

/// Content-side responder for settings traffic.
#[derive(Debug, Clone)]
pub struct SettingsBridge<S> {
    store: S,
}

impl<S: PreferenceStore> SettingsBridge<S> {
    /// Creates a bridge answering from `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Handles one incoming message, returning the message to send to the
    /// page side, if any.
    pub async fn handle(&self, message: ContextMessage) -> Option<ContextMessage> {
        match message {
            ContextMessage::RequestSettings => {
                let profile = match self.store.load().await {
                    Ok(profile) => profile,
                    Err(e) => {
                        tracing::warn!("Failed to load settings, replying with defaults: {e}");
                        Default::default()
                    }
                };
                Some(ContextMessage::SettingsReply { profile })
            }
            // The settings UI has already saved the profile
            ContextMessage::UpdateSettings { profile } => {
                Some(ContextMessage::SettingsReply { profile })
            }
            ContextMessage::SettingsReply { .. } => None,
        }
    }

    /// Serves messages from `inbox` until it closes, sending replies to
    /// `outbox`. Replies to a closed outbox are dropped.
    pub async fn run(
        self,
        mut inbox: mpsc::Receiver<ContextMessage>,
        outbox: mpsc::Sender<ContextMessage>,
    ) {
        while let Some(message) = inbox.recv().await {
            if let Some(reply) = self.handle(message).await
                && outbox.send(reply).await.is_err()
            {
                tracing::debug!("Page context gone, dropping settings reply");
            }
        }
        tracing::debug!("Settings bridge stopped");
    }
}

/// Delivers a message received by the page side to its engine.
///
/// # Errors
///
/// - `EngineError::EngineShutdown` - The engine actor has stopped
pub async fn deliver_to_engine(
    handle: &QualityEngineHandle,
    message: ContextMessage,
) -> Result<(), EngineError> {
    match message {
        ContextMessage::SettingsReply { profile } | ContextMessage::UpdateSettings { profile } => {
            handle.update_settings(profile).await
        }
        ContextMessage::RequestSettings => Ok(()),
    }
}

/// Page-side loop: asks for settings once, then feeds every profile that
/// arrives into the engine until the channel or the engine closes.
pub async fn run_page_listener(
    handle: QualityEngineHandle,
    outbox: mpsc::Sender<ContextMessage>,
    mut inbox: mpsc::Receiver<ContextMessage>,
) {
    if outbox.send(ContextMessage::RequestSettings).await.is_err() {
        tracing::debug!("Content context gone, running with local settings");
    }

    while let Some(message) = inbox.recv().await {
        if let Err(e) = deliver_to_engine(&handle, message).await {
            tracing::debug!("Stopping page listener: {e}");
            break;
        }
    }
}

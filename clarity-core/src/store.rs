//! Preference store collaborators.
//!
//! The store holds the user's profile and, when persistence is enabled, the
//! last quality the engine applied. Reads use get-with-defaults semantics:
//! anything missing comes back as the default profile.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::{PreferenceProfile, QualityTarget};
use crate::surface::OptionLabel;

/// Errors from preference store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Record of a quality the engine applied, kept for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedQuality {
    /// Target the user asked for
    pub quality: QualityTarget,
    /// Option that was applied for it
    pub option: OptionLabel,
    /// When it was applied
    pub applied_at: DateTime<Utc>,
}

impl AppliedQuality {
    /// Creates a record stamped with the current time.
    pub fn now(quality: QualityTarget, option: OptionLabel) -> Self {
        Self {
            quality,
            option,
            applied_at: Utc::now(),
        }
    }
}

/// Durable storage for the preference profile.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Reads the profile, filling absent keys with defaults.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - The backing storage could not be read
    /// - `StoreError::Serialization` - The stored document is malformed
    /// - `StoreError::Unavailable` - The store cannot be reached
    async fn load(&self) -> Result<PreferenceProfile, StoreError>;

    /// Replaces the stored profile.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - The backing storage could not be written
    /// - `StoreError::Unavailable` - The store cannot be reached
    async fn save(&self, profile: &PreferenceProfile) -> Result<(), StoreError>;

    /// Records the quality the engine just applied.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - The backing storage could not be written
    /// - `StoreError::Unavailable` - The store cannot be reached
    async fn record_applied(&self, record: &AppliedQuality) -> Result<(), StoreError>;

    /// Returns the last recorded application, if any.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` - The backing storage could not be read
    /// - `StoreError::Serialization` - The stored document is malformed
    async fn last_applied(&self) -> Result<Option<AppliedQuality>, StoreError>;
}

#[async_trait]
impl<S: PreferenceStore + ?Sized> PreferenceStore for Arc<S> {
    async fn load(&self) -> Result<PreferenceProfile, StoreError> {
        (**self).load().await
    }

    async fn save(&self, profile: &PreferenceProfile) -> Result<(), StoreError> {
        (**self).save(profile).await
    }

    async fn record_applied(&self, record: &AppliedQuality) -> Result<(), StoreError> {
        (**self).record_applied(record).await
    }

    async fn last_applied(&self) -> Result<Option<AppliedQuality>, StoreError> {
        (**self).last_applied().await
    }
}

/// Stored document shared by the in-memory and file stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StoredDocument {
    settings: PreferenceProfile,
    last_applied: Option<AppliedQuality>,
}

/// In-memory store. Clones share contents.
///
/// Failure injection lets tests exercise the non-fatal persistence paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    document: Arc<RwLock<StoredDocument>>,
    fail_loads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryPreferenceStore {
    /// Creates a store holding the default profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `profile`.
    pub fn with_profile(profile: PreferenceProfile) -> Self {
        let store = Self::new();
        store.document.write().settings = profile;
        store
    }

    /// Makes subsequent loads fail.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent saves and records fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "writes disabled".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<PreferenceProfile, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "reads disabled".to_string(),
            });
        }
        Ok(self.document.read().settings.clone())
    }

    async fn save(&self, profile: &PreferenceProfile) -> Result<(), StoreError> {
        self.check_writable()?;
        self.document.write().settings = profile.clone();
        Ok(())
    }

    async fn record_applied(&self, record: &AppliedQuality) -> Result<(), StoreError> {
        self.check_writable()?;
        self.document.write().last_applied = Some(record.clone());
        Ok(())
    }

    async fn last_applied(&self) -> Result<Option<AppliedQuality>, StoreError> {
        Ok(self.document.read().last_applied.clone())
    }
}

/// Store backed by a single JSON document on disk.
///
/// A missing file reads as the default profile.
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    /// Creates a store for the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<StoredDocument, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &StoredDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn load(&self) -> Result<PreferenceProfile, StoreError> {
        Ok(self.read_document().await?.settings)
    }

    async fn save(&self, profile: &PreferenceProfile) -> Result<(), StoreError> {
        let mut document = self.read_document().await?;
        document.settings = profile.clone();
        self.write_document(&document).await
    }

    async fn record_applied(&self, record: &AppliedQuality) -> Result<(), StoreError> {
        let mut document = self.read_document().await?;
        document.last_applied = Some(record.clone());
        self.write_document(&document).await
    }

    async fn last_applied(&self) -> Result<Option<AppliedQuality>, StoreError> {
        Ok(self.read_document().await?.last_applied)
    }
}

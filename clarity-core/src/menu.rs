//! Surface adapter for players that can only be driven through their
//! settings menu.
//!
//! Where no structured player API is reachable, quality is changed the way a
//! user would: open the settings menu, enter the quality sub-menu and click an
//! entry. Each click is followed by a settle delay because the page updates
//! its menu asynchronously.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::clock::Clock;
use crate::labels::LabelTables;
use crate::surface::{OptionLabel, QualitySurface, SurfaceError, SurfaceId};

/// Low-level menu interactions offered by the environment.
#[async_trait]
pub trait MenuDriver: Send + Sync {
    /// Identity of the player the menu belongs to.
    fn player_id(&self) -> SurfaceId;

    /// Clicks the settings button.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::NotReady` - The settings button is not present
    async fn open_settings(&self) -> Result<(), SurfaceError>;

    /// Labels of the top-level settings entries.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Environment` - The menu could not be read
    async fn settings_items(&self) -> Result<Vec<String>, SurfaceError>;

    /// Opens the top-level entry at `index`.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Environment` - The entry could not be clicked
    async fn open_settings_item(&self, index: usize) -> Result<(), SurfaceError>;

    /// Labels of the quality sub-menu entries, best first.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Environment` - The sub-menu could not be read
    async fn quality_items(&self) -> Result<Vec<String>, SurfaceError>;

    /// Label of the checked quality entry, if the menu marks one.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Environment` - The sub-menu could not be read
    async fn checked_quality_item(&self) -> Result<Option<String>, SurfaceError>;

    /// Clicks the quality entry at `index`.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Environment` - The entry could not be clicked
    async fn click_quality_item(&self, index: usize) -> Result<(), SurfaceError>;

    /// Closes the settings menu.
    ///
    /// # Errors
    ///
    /// - `SurfaceError::Environment` - The menu could not be closed
    async fn close_settings(&self) -> Result<(), SurfaceError>;
}

/// [`QualitySurface`] implemented by clicking through a settings menu.
pub struct MenuSurface<D, C> {
    driver: D,
    clock: C,
    tables: Arc<LabelTables>,
    settle_delay: Duration,
    quality_menu_open: AtomicBool,
}

impl<D: MenuDriver, C: Clock> MenuSurface<D, C> {
    /// Wraps `driver`, waiting `settle_delay` on `clock` after each click.
    pub fn new(driver: D, clock: C, tables: Arc<LabelTables>, settle_delay: Duration) -> Self {
        Self {
            driver,
            clock,
            tables,
            settle_delay,
            quality_menu_open: AtomicBool::new(false),
        }
    }

    /// The wrapped driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    async fn open_quality_menu(&self) -> Result<(), SurfaceError> {
        if self.quality_menu_open.load(Ordering::Acquire) {
            return Ok(());
        }

        self.driver.open_settings().await?;
        self.clock.sleep(self.settle_delay).await;

        let items = self.driver.settings_items().await?;
        let Some(index) = items
            .iter()
            .position(|label| self.tables.is_quality_menu(label))
        else {
            if let Err(e) = self.driver.close_settings().await {
                tracing::debug!("Failed to close settings menu: {e}");
            }
            return Err(SurfaceError::NotReady {
                reason: "settings menu has no quality entry".to_string(),
            });
        };

        self.driver.open_settings_item(index).await?;
        self.clock.sleep(self.settle_delay).await;
        self.quality_menu_open.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl<D: MenuDriver, C: Clock> QualitySurface for MenuSurface<D, C> {
    fn id(&self) -> SurfaceId {
        self.driver.player_id()
    }

    async fn list_available_options(&self) -> Result<Vec<OptionLabel>, SurfaceError> {
        self.open_quality_menu().await?;
        let items = self.driver.quality_items().await?;
        Ok(items.into_iter().map(OptionLabel::from).collect())
    }

    async fn current_option(&self) -> Result<Option<OptionLabel>, SurfaceError> {
        self.open_quality_menu().await?;
        Ok(self
            .driver
            .checked_quality_item()
            .await?
            .map(OptionLabel::from))
    }

    async fn set_option(&self, label: &OptionLabel) -> Result<(), SurfaceError> {
        self.open_quality_menu().await?;
        let items = self.driver.quality_items().await?;
        let index = items
            .iter()
            .position(|item| item == label.as_str())
            .ok_or_else(|| SurfaceError::OptionUnavailable {
                label: label.clone(),
            })?;

        self.driver.click_quality_item(index).await?;
        // Selecting an entry closes the sub-menu on the page side
        self.quality_menu_open.store(false, Ordering::Release);
        Ok(())
    }

    async fn release(&self) {
        self.clock.sleep(self.settle_delay).await;
        self.quality_menu_open.store(false, Ordering::Release);
        if let Err(e) = self.driver.close_settings().await {
            tracing::debug!("Failed to close settings menu: {e}");
        }
    }
}

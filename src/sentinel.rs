//! The reload marker and the target folder.
//!
//! The marker is a one-page PDF inside the target folder. While it exists
//! the tablet has not picked up the last batch, so no new pass runs. Both
//! UUIDs live in the config file and are saved as soon as they change.

use std::path::Path;

use tracing::info;

use crate::app::Result;
use crate::config::Config;
use crate::domain::FileType;
use crate::render::reload_marker_pdf;
use crate::store::Store;

/// Visible name of the marker document.
pub const RELOAD_MARKER_NAME: &str = "remove to sync";

pub struct SentinelController<'a, S: Store> {
    store: &'a S,
    config: &'a mut Config,
    config_path: &'a Path,
}

impl<'a, S: Store> SentinelController<'a, S> {
    pub fn new(store: &'a S, config: &'a mut Config, config_path: &'a Path) -> Self {
        Self {
            store,
            config,
            config_path,
        }
    }

    /// True while the previous marker is still on the tablet.
    pub fn reload_pending(&self) -> Result<bool> {
        let uuid = self.config.reload_uuid()?;
        Ok(!uuid.is_empty() && self.store.document_exists(uuid))
    }

    /// Return the target folder UUID, creating the folder if it is gone.
    pub fn ensure_target_folder(&mut self) -> Result<String> {
        let current = self.config.target_folder_uuid()?;
        if !current.is_empty() && self.store.folder_exists(current) {
            return Ok(current.to_string());
        }

        let name = self.config.provider()?.name();
        let uuid = self.store.create_folder(name)?;
        info!("Created folder '{}' as {}", name, uuid);

        self.config.set_target_folder_uuid(uuid.clone())?;
        self.config.save_to(self.config_path)?;
        Ok(uuid)
    }

    /// Put a fresh marker into the target folder and record it.
    pub fn write_sentinel(&mut self) -> Result<String> {
        let pdf = reload_marker_pdf()?;
        let parent = self.config.target_folder_uuid()?.to_string();
        let uuid = self
            .store
            .create_document(RELOAD_MARKER_NAME, &parent, FileType::Pdf, &pdf)?;
        info!("Wrote reload marker {}", uuid);

        self.config.set_reload_uuid(uuid.clone())?;
        self.config.save_to(self.config_path)?;
        Ok(uuid)
    }
}

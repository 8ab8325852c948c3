//! Persisted application settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::projector::{GridStyle, GRID_SPACING};
use crate::store::StoreError;

/// Longest side, in world units, of a freshly imported image.
pub const DEFAULT_IMAGE_SIZE: f64 = 300.0;

/// File name of the settings document inside a data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// User settings, stored as one small JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Grid spacing in world units.
    pub grid_spacing: f64,
    /// Whether the grid background is drawn.
    pub show_grid: bool,
    /// Longest side of imported images.
    pub default_image_size: f64,
    /// The board opened last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_board_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_spacing: GRID_SPACING,
            show_grid: true,
            default_image_size: DEFAULT_IMAGE_SIZE,
            last_board_id: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// A missing file gives the defaults; so does an unreadable one, with a
    /// warning. Keys absent from the file take their default values.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read settings {}: {e}", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring corrupt settings {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Write settings to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Grid options for the projector.
    #[must_use]
    pub fn grid_style(&self) -> GridStyle {
        GridStyle {
            spacing: self.grid_spacing,
            visible: self.show_grid,
        }
    }
}

//! Settings management for Overlay Studio
//!
//! Handles loading/saving of user preferences as XML in the platform
//! config directory.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compositor::render::DEFAULT_JPEG_QUALITY;
use crate::compositor::stack::DEFAULT_DUPLICATE_OFFSET;
use crate::compositor::viewport::{MAX_ZOOM, MIN_ZOOM};

/// User preferences (stored in config directory)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "OverlayStudioPreferences")]
pub struct StudioPreferences {
    /// Lock the aspect ratio while resizing with corner handles
    #[serde(rename = "keepAspectRatio", default = "default_keep_aspect_ratio")]
    pub keep_aspect_ratio: bool,

    /// Draw a grid over the preview stage
    #[serde(rename = "showGrid", default)]
    pub show_grid: bool,

    /// Zoom applied when a base is loaded
    #[serde(rename = "defaultZoom", default = "default_zoom")]
    pub default_zoom: f32,

    /// Quality for JPEG composites (1-100)
    #[serde(rename = "jpegQuality", default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Shift of duplicated layers, in model pixels
    #[serde(rename = "duplicateOffset", default = "default_duplicate_offset")]
    pub duplicate_offset: f32,

    /// Folder the last export was written to
    #[serde(rename = "lastExportDir", default, skip_serializing_if = "Option::is_none")]
    pub last_export_dir: Option<String>,
}

fn default_keep_aspect_ratio() -> bool {
    true
}

fn default_zoom() -> f32 {
    1.0
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_duplicate_offset() -> f32 {
    DEFAULT_DUPLICATE_OFFSET
}

impl Default for StudioPreferences {
    fn default() -> Self {
        Self {
            keep_aspect_ratio: default_keep_aspect_ratio(),
            show_grid: false,
            default_zoom: default_zoom(),
            jpeg_quality: default_jpeg_quality(),
            duplicate_offset: default_duplicate_offset(),
            last_export_dir: None,
        }
    }
}

impl StudioPreferences {
    /// Bring every field back into its valid range
    pub fn clamp(&mut self) {
        self.default_zoom = if self.default_zoom.is_finite() {
            self.default_zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            default_zoom()
        };
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if !self.duplicate_offset.is_finite() {
            self.duplicate_offset = default_duplicate_offset();
        }
    }

    /// Get the preferences file path
    fn get_prefs_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("OverlayStudio");
            p.push("preferences.xml");
            p
        })
    }

    /// Load preferences from config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::get_prefs_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!("Ignoring unreadable preferences at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load preferences from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut prefs: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;
        prefs.clamp();
        Ok(prefs)
    }

    /// Save preferences to config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::get_prefs_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        self.save_to_file(&path)
    }

    /// Save preferences to an XML file, creating parent folders
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }

        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Remember the folder of the latest export
    pub fn set_last_export_dir(&mut self, path: &Path) {
        self.last_export_dir = Some(path.to_string_lossy().into_owned());
    }

    pub fn get_last_export_dir(&self) -> Option<PathBuf> {
        self.last_export_dir.as_ref().map(PathBuf::from)
    }
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    XmlParse(quick_xml::DeError),
    XmlWrite(quick_xml::SeError),
    NoConfigDir,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::XmlParse(e) => write!(f, "XML parse error: {}", e),
            SettingsError::XmlWrite(e) => write!(f, "XML write error: {}", e),
            SettingsError::NoConfigDir => write!(f, "Could not find config directory"),
        }
    }
}

impl std::error::Error for SettingsError {}

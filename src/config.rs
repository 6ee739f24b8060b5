//! Persistent settings.
//!
//! Settings are stored as versioned JSON. Missing fields take their
//! defaults, so older files keep loading as new settings are added.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HISTORY_DEPTH, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH, HANDLE_SIZE, MAX_ZOOM,
    MIN_BOX_SIZE, MIN_ZOOM,
};
use crate::geometry::ImageBounds;
use crate::undo::HistoryConfig;

/// Verbosity passed to `env_logger` at startup. `RUST_LOG` still wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Settings file version written by this build. Files with a higher
/// version are rejected.
pub const CONFIG_VERSION: u32 = 1;

/// Directory name under the platform config dir.
const APP_DIR: &str = "invoice-annotator";

/// Annotator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Undo steps kept
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Handle size in screen pixels
    #[serde(default = "default_handle_size")]
    pub handle_size: f64,

    /// Smallest box side (image pixels) that is committed
    #[serde(default = "default_min_box_size")]
    pub min_box_size: i32,

    /// Image size assumed before a page image is loaded
    #[serde(default = "default_image_width")]
    pub default_image_width: u32,
    #[serde(default = "default_image_height")]
    pub default_image_height: u32,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

fn default_handle_size() -> f64 {
    HANDLE_SIZE
}

fn default_min_box_size() -> i32 {
    MIN_BOX_SIZE
}

fn default_image_width() -> u32 {
    DEFAULT_IMAGE_WIDTH
}

fn default_image_height() -> u32 {
    DEFAULT_IMAGE_HEIGHT
}

fn default_min_zoom() -> f64 {
    MIN_ZOOM
}

fn default_max_zoom() -> f64 {
    MAX_ZOOM
}

impl AnnotatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            history_depth: default_history_depth(),
            handle_size: default_handle_size(),
            min_box_size: default_min_box_size(),
            default_image_width: default_image_width(),
            default_image_height: default_image_height(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
        }
    }

    /// Image bounds used when no image is loaded.
    pub fn default_bounds(&self) -> ImageBounds {
        ImageBounds::new(self.default_image_width, self.default_image_height)
    }

    /// History settings derived from this configuration.
    pub fn history(&self) -> HistoryConfig {
        HistoryConfig {
            max_history: self.history_depth,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse settings, refusing files written by a newer build.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }
        config.check_ranges()?;
        Ok(config)
    }

    /// Zoom limits and handle size must be positive and finite, with
    /// `max_zoom >= min_zoom`.
    pub fn check_ranges(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.min_zoom) {
            return Err(ConfigError::OutOfRange {
                field: "min_zoom",
                value: self.min_zoom,
            });
        }
        if !positive(self.max_zoom) || self.max_zoom < self.min_zoom {
            return Err(ConfigError::OutOfRange {
                field: "max_zoom",
                value: self.max_zoom,
            });
        }
        if !positive(self.handle_size) {
            return Err(ConfigError::OutOfRange {
                field: "handle_size",
                value: self.handle_size,
            });
        }
        Ok(())
    }

    pub fn default_filename() -> &'static str {
        "invoice-annotator.json"
    }

    /// `<config dir>/invoice-annotator/invoice-annotator.json`, with
    /// `~/.config` standing in on platforms without a config dir.
    pub fn default_path() -> Option<PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(base.join(APP_DIR).join(Self::default_filename()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("⚙️ Settings read from {:?}", path);
        Ok(config)
    }

    /// Settings from [`Self::default_path`]. A missing or broken file gives
    /// `None`; the latter is logged.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.is_file() {
            log::debug!("⚙️ No settings at {:?}", path);
            return None;
        }

        Self::load(&path)
            .inspect_err(|e| log::warn!("⚙️ Ignoring settings at {:?}: {}", path, e))
            .ok()
    }

    /// Write settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("⚙️ Settings written to {:?}", path);
        Ok(())
    }

    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save(&path)
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed settings file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Settings file has version {found}; this build reads up to {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("Setting '{field}' has unusable value {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("No platform config directory")]
    NoConfigDir,

    #[error("Settings file I/O: {0}")]
    IoError(#[from] std::io::Error),
}

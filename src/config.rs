//! Settings persistence for the hourglass overlay.
//!
//! This module provides functionality for managing the persisted overlay
//! record, including:
//! - The fixed-shape `Settings` record (position, glass size, duration)
//! - Range constants and clamping for size and duration
//! - Loading with all-or-nothing fallback to defaults
//! - Best-effort saving to a JSON sidecar file
//!
//! The record lives in a `settings.json` file located in the
//! platform-specific application data directory
//! (%APPDATA%/HourglassOverlay/ on Windows).
//!
//! # Example
//!
//! ```no_run
//! use hourglass_overlay::config::SettingsStore;
//!
//! let store = SettingsStore::locate().expect("no data directory");
//! let mut settings = store.load();
//! settings.size = 96;
//! store.save(&settings).expect("Failed to save settings");
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MIN_SIZE: u32 = 32;
pub const MAX_SIZE: u32 = 128;
pub const MIN_DURATION: u32 = 5;
pub const MAX_DURATION: u32 = 36_000;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to determine user data directory")]
    NoDataDirectory,
    #[error("settings I/O on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

/// Persisted overlay record
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Screen x of the window's top-left corner
    pub x: i32,
    /// Screen y of the window's top-left corner
    pub y: i32,
    /// Glass size in pixels, 32..=128
    pub size: u32,
    /// Countdown length in seconds, 5..=36000
    pub duration: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            x: 200,
            y: 200,
            size: 64,
            duration: 60,
        }
    }
}

impl Settings {
    /// Copy with size and duration forced into their ranges
    pub fn clamped(self) -> Self {
        Settings {
            size: clamp_size(self.size),
            duration: self.duration.clamp(MIN_DURATION, MAX_DURATION),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("size", self.size, MIN_SIZE, MAX_SIZE)?;
        check_range("duration", self.duration, MIN_DURATION, MAX_DURATION)
    }
}

pub fn clamp_size(size: u32) -> u32 {
    size.clamp(MIN_SIZE, MAX_SIZE)
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), SettingsError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Get the application's data directory
/// Creates directory if it doesn't exist
pub fn get_data_directory() -> Result<PathBuf, SettingsError> {
    let project_dirs =
        ProjectDirs::from("", "", "HourglassOverlay").ok_or(SettingsError::NoDataDirectory)?;

    let data_dir = project_dirs.data_dir();

    fs::create_dir_all(data_dir).map_err(|source| SettingsError::Io {
        path: data_dir.to_path_buf(),
        source,
    })?;

    Ok(data_dir.to_path_buf())
}

/// JSON sidecar file holding a single `Settings` record
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    /// Store at `<data dir>/settings.json`
    pub fn locate() -> Result<Self, SettingsError> {
        Ok(Self::new(get_data_directory()?.join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict load: every key must be present and in range
    pub fn try_load(&self) -> Result<Settings, SettingsError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings, returning defaults if the file is missing or unusable.
    /// A record is never partially merged with defaults.
    pub fn load(&self) -> Settings {
        if !self.path.exists() {
            tracing::info!("No settings at {:?}, using defaults", self.path);
            return Settings::default();
        }

        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings file: {}", e);
                Settings::default()
            }
        }
    }

    /// Overwrite the settings file
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;

        fs::write(&self.path, json).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tone::Waveform;

/// Default capacity ceiling (512 KiB)
pub const DEFAULT_MAX_CAPACITY: usize = 512 * 1024;

/// Returns the path to the settings file: `~/.config/audio-relay/settings.json`
pub fn settings_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("audio-relay");
    path.push("settings.json");
    path
}

/// Invalid combinations of settings
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("initial_capacity {initial} must be 1..={max} bytes")]
    Capacity { initial: usize, max: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Persisted relay and harness settings.
///
/// Serialized as JSON to the platform config directory.
/// Fields use `#[serde(default)]` so that adding new settings
/// won't break existing config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    // Buffer
    pub initial_capacity: usize,
    pub max_capacity: usize,

    // Tone
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f32,
    pub amplitude: f32,
    pub waveform: Waveform,

    // Harness timing
    pub chunk_bytes: usize,
    pub generator_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub run_seconds: u64,
    pub stats_interval_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_MAX_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,

            sample_rate: 44100,
            channels: 2,
            frequency: 440.0,
            amplitude: 1.0,
            waveform: Waveform::Sine,

            chunk_bytes: 4096,
            generator_interval_ms: 500,
            poll_timeout_ms: 100,
            run_seconds: 5,
            stats_interval_ms: 1000,
        }
    }
}

impl RelaySettings {
    /// Load settings from the default location, falling back to defaults on any error.
    ///
    /// On first run the defaults are written there so they can be edited.
    pub fn load() -> Self {
        Self::load_or_init(&settings_path())
    }

    /// Load settings from `path`, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings ({}), using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No settings file found ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Load settings from `path`, writing the defaults there if no file exists yet.
    pub fn load_or_init(path: &Path) -> Self {
        if path.exists() {
            return Self::load_from(path);
        }
        let settings = Self::default();
        settings.save_to(path);
        log::info!("Wrote default settings to {}", path.display());
        settings
    }

    /// Save settings to `path` as pretty JSON.
    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::warn!("Failed to create config directory: {}", e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to write settings: {}", e);
                }
            }
            Err(e) => {
                log::warn!("Failed to serialize settings: {}", e);
            }
        }
    }

    /// Check the values the relay and harness can't run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.initial_capacity == 0 || self.initial_capacity > self.max_capacity {
            return Err(SettingsError::Capacity {
                initial: self.initial_capacity,
                max: self.max_capacity,
            });
        }
        if self.sample_rate == 0 {
            return Err(SettingsError::Zero("sample_rate"));
        }
        if self.channels == 0 {
            return Err(SettingsError::Zero("channels"));
        }
        if self.chunk_bytes == 0 {
            return Err(SettingsError::Zero("chunk_bytes"));
        }
        Ok(())
    }
}

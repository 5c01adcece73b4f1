//! Persistent engine settings, stored as JSON in the user's config directory.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Serialize, Deserialize};
use crate::core::instrument::Patch;
use crate::core::synth::audio::{ClipMode, DEFAULT_AMPLITUDE, DEFAULT_HEADROOM_VOICES};
use crate::error::SynthError;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "SOUNDY_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output rate in Hz; the device must supply exactly this rate.
    pub sample_rate: u32,
    /// Requested frames per device buffer.
    pub buffer_size: u32,
    /// Full-scale output amplitude.
    pub amplitude: f32,
    /// The mix is divided by this many voices.
    pub headroom_voices: u32,
    pub clip: ClipMode,
    /// Control loop rate (note events and compaction).
    pub poll_rate_hz: u32,
    /// Instrument played at startup.
    pub instrument: String,
    /// User patches, added to (or overriding) the factory presets.
    pub patches: Vec<Patch>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            amplitude: DEFAULT_AMPLITUDE,
            headroom_voices: DEFAULT_HEADROOM_VOICES,
            clip: ClipMode::Hard,
            poll_rate_hz: 30,
            instrument: "bell".to_string(),
            patches: Vec::new(),
        }
    }
}

impl Settings {
    /// `$SOUNDY_CONFIG`, else `<config dir>/soundy/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("soundy").join("settings.json"))
    }

    /// Reads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path)
            .with_context(|| format!("Failed to open settings file {}", path.display()))?;
        let settings: Settings = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), SynthError> {
        let invalid = |reason: &str| Err(SynthError::InvalidSettings(reason.to_string()));
        if self.sample_rate == 0 {
            return invalid("sample_rate must be positive");
        }
        if self.buffer_size == 0 {
            return invalid("buffer_size must be positive");
        }
        if !self.amplitude.is_finite() || self.amplitude <= 0.0 {
            return invalid("amplitude must be a positive number");
        }
        if self.headroom_voices == 0 {
            return invalid("headroom_voices must be at least 1");
        }
        if self.poll_rate_hz == 0 {
            return invalid("poll_rate_hz must be positive");
        }
        Ok(())
    }
}

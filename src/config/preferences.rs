//! Durable player preferences
//!
//! Only the volume is persisted. Storage is best-effort: a missing or
//! corrupt file reads as "no preference" and write failures are reported to
//! the caller, who logs and moves on.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::Config;

/// Volume used when nothing usable is stored
pub const DEFAULT_VOLUME: f64 = 0.5;

/// Get/set access to the persisted volume
pub trait VolumeStore {
    /// Stored volume, `None` if absent or unparsable
    fn load_volume(&self) -> Option<f64>;

    /// Persist a volume
    fn save_volume(&mut self, volume: f64) -> Result<()>;
}

/// Preferences file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Kept as raw JSON so a hand-edited value cannot break the whole file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<serde_json::Value>,
}

impl Preferences {
    /// Volume as a number, accepting numeric strings
    pub fn volume(&self) -> Option<f64> {
        match self.volume.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Preferences stored as JSON in the data directory
#[derive(Debug, Clone)]
pub struct FileVolumeStore {
    path: PathBuf,
}

impl FileVolumeStore {
    /// Store at the default location
    pub fn open() -> Result<Self> {
        Ok(Self { path: Config::data_dir()?.join("preferences.json") })
    }

    /// Store at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences from {:?}", self.path))?;
        serde_json::from_str(&contents).with_context(|| "Failed to parse preferences.json")
    }
}

impl VolumeStore for FileVolumeStore {
    fn load_volume(&self) -> Option<f64> {
        match self.read() {
            Ok(preferences) => preferences.volume(),
            Err(e) => {
                tracing::warn!("Ignoring stored preferences: {:#}", e);
                None
            }
        }
    }

    fn save_volume(&mut self, volume: f64) -> Result<()> {
        let mut preferences = self.read().unwrap_or_default();
        preferences.volume = Some(serde_json::json!(volume));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(&preferences)
            .with_context(|| "Failed to serialize preferences")?;

        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write preferences to {:?}", self.path))?;

        Ok(())
    }
}

/// In-memory store; clones share the same value
#[derive(Debug, Clone, Default)]
pub struct MemoryVolumeStore {
    raw: Arc<Mutex<Option<String>>>,
    fail_writes: bool,
}

impl MemoryVolumeStore {
    /// Store holding an arbitrary raw value
    pub fn with_raw(raw: &str) -> Self {
        Self { raw: Arc::new(Mutex::new(Some(raw.to_string()))), fail_writes: false }
    }

    /// Store whose writes always fail
    pub fn failing() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }
}

impl VolumeStore for MemoryVolumeStore {
    fn load_volume(&self) -> Option<f64> {
        let raw = self.raw.lock().ok()?;
        raw.as_deref()?.trim().parse().ok()
    }

    fn save_volume(&mut self, volume: f64) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("storage unavailable"));
        }
        let mut raw = self.raw.lock().map_err(|_| anyhow!("volume store poisoned"))?;
        *raw = Some(volume.to_string());
        Ok(())
    }
}

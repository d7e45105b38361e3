//! Per-boulder persistence of the detection settings.

use std::{
    collections::{BTreeMap, HashMap},
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{boulder::BoulderId, Result, SettingsPatch, VisualizerSettings};

/// The subset of [`VisualizerSettings`] that shapes move detection, plus the
/// time it was saved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSettings {
    pub move_threshold: f64,
    pub min_move_duration: f64,
    /// Milliseconds since the unix epoch.
    pub saved_at: u64,
}

impl PersistedSettings {
    pub fn from_settings(settings: &VisualizerSettings, saved_at: u64) -> Self {
        Self {
            move_threshold: settings.move_threshold,
            min_move_duration: settings.min_move_duration,
            saved_at,
        }
    }

    /// Captures `settings` stamped with the current wall-clock time.
    pub fn capture(settings: &VisualizerSettings) -> Self {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Self::from_settings(settings, saved_at)
    }

    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            move_threshold: Some(self.move_threshold),
            min_move_duration: Some(self.min_move_duration),
            ..Default::default()
        }
    }
}

/// Key-value store for [`PersistedSettings`] keyed by boulder.
pub trait SettingsStore {
    fn load(&self, boulder: &BoulderId) -> Result<Option<PersistedSettings>>;
    fn save(&mut self, boulder: &BoulderId, settings: PersistedSettings) -> Result<()>;
    /// Returns whether a record was present.
    fn remove(&mut self, boulder: &BoulderId) -> Result<bool>;
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    records: HashMap<BoulderId, PersistedSettings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, boulder: &BoulderId) -> Result<Option<PersistedSettings>> {
        Ok(self.records.get(boulder).copied())
    }

    fn save(&mut self, boulder: &BoulderId, settings: PersistedSettings) -> Result<()> {
        self.records.insert(boulder.clone(), settings);
        Ok(())
    }

    fn remove(&mut self, boulder: &BoulderId) -> Result<bool> {
        Ok(self.records.remove(boulder).is_some())
    }
}

/// Stores every record in one JSON document mapping boulder id to record.
/// A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, PersistedSettings>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, records: &BTreeMap<String, PersistedSettings>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(records)?)?;
        debug!(path = ?self.path, records = records.len(), "wrote settings store");
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self, boulder: &BoulderId) -> Result<Option<PersistedSettings>> {
        Ok(self.read()?.get(&boulder.to_string()).copied())
    }

    fn save(&mut self, boulder: &BoulderId, settings: PersistedSettings) -> Result<()> {
        let mut records = self.read()?;
        records.insert(boulder.to_string(), settings);
        self.write(&records)
    }

    fn remove(&mut self, boulder: &BoulderId) -> Result<bool> {
        let mut records = self.read()?;
        let removed = records.remove(&boulder.to_string()).is_some();
        if removed {
            self.write(&records)?;
        }
        Ok(removed)
    }
}

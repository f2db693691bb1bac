// SPDX-License-Identifier: GPL-3.0-only

//! Persisted user settings port
//!
//! The controller reads these keys at construction and writes them after
//! every successful setter. Storage is injected so tests run without a
//! filesystem.

use crate::backends::camera::lock_unpoisoned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Keys understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKey {
    FlashMode,
    FocusMode,
    FocusLocked,
    ExposureValue,
    IsoValue,
    ShutterSpeed,
    WhiteBalanceMode,
    RatioMode,
}

impl SettingsKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingsKey::FlashMode => "flashMode",
            SettingsKey::FocusMode => "focusMode",
            SettingsKey::FocusLocked => "focusLocked",
            SettingsKey::ExposureValue => "exposureValue",
            SettingsKey::IsoValue => "isoValue",
            SettingsKey::ShutterSpeed => "shutterSpeed",
            SettingsKey::WhiteBalanceMode => "whiteBalanceMode",
            SettingsKey::RatioMode => "ratioMode",
        }
    }
}

/// A stored value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl SettingValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            SettingValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self {
            SettingValue::Int(value) => Some(value),
            _ => None,
        }
    }

    /// Integers widen to floats
    pub fn as_f64(self) -> Option<f64> {
        match self {
            SettingValue::Float(value) => Some(value),
            SettingValue::Int(value) => Some(value as f64),
            SettingValue::Bool(_) => None,
        }
    }
}

/// Simple get/set key-value service
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: SettingsKey) -> Option<SettingValue>;

    fn set(&self, key: SettingsKey, value: SettingValue);
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<SettingsKey, SettingValue>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key
    pub fn with(self, key: SettingsKey, value: SettingValue) -> Self {
        lock_unpoisoned(&self.values).insert(key, value);
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: SettingsKey) -> Option<SettingValue> {
        lock_unpoisoned(&self.values).get(&key).copied()
    }

    fn set(&self, key: SettingsKey, value: SettingValue) {
        lock_unpoisoned(&self.values).insert(key, value);
    }
}

/// JSON file store, written through on every `set`
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: Mutex<HashMap<String, SettingValue>>,
}

impl JsonFileSettings {
    /// Open (or start) a settings file; unreadable contents start empty
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring malformed settings file");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        debug!(path = %path.display(), count = values.len(), "Opened settings");
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    /// `<config dir>/camera-core/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("camera-core").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, SettingValue>) {
        let result = serde_json::to_string_pretty(values)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
                }
                std::fs::write(&self.path, json).map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to write settings");
        }
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: SettingsKey) -> Option<SettingValue> {
        lock_unpoisoned(&self.values).get(key.as_str()).copied()
    }

    fn set(&self, key: SettingsKey, value: SettingValue) {
        let mut values = lock_unpoisoned(&self.values);
        values.insert(key.as_str().to_string(), value);
        self.flush(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let settings = MemorySettings::new().with(SettingsKey::FocusLocked, SettingValue::Bool(true));
        assert_eq!(
            settings.get(SettingsKey::FocusLocked).and_then(SettingValue::as_bool),
            Some(true)
        );
        assert_eq!(settings.get(SettingsKey::IsoValue), None);
    }

    #[test]
    fn test_json_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        {
            let settings = JsonFileSettings::open(&path);
            settings.set(SettingsKey::FlashMode, SettingValue::Int(2));
            settings.set(SettingsKey::ShutterSpeed, SettingValue::Float(0.25));
        }
        let reopened = JsonFileSettings::open(&path);
        assert_eq!(reopened.get(SettingsKey::FlashMode), Some(SettingValue::Int(2)));
        assert_eq!(
            reopened.get(SettingsKey::ShutterSpeed).and_then(SettingValue::as_f64),
            Some(0.25)
        );
    }

    #[test]
    fn test_malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(JsonFileSettings::open(&path).get(SettingsKey::RatioMode), None);
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(SettingValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(SettingValue::Bool(true).as_f64(), None);
    }
}

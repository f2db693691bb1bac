// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::Resolution;
use crate::constants::{UI_MIN_ZOOM, focus, orientation, photo};
use crate::errors::{CaptureError, CaptureResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Controller tunables
///
/// Every field falls back to its default when absent from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Long edge of the corrected output image (pixels)
    pub long_edge_budget: u32,
    /// Continuous autofocus settle delay
    pub continuous_focus_settle_ms: u64,
    /// Single-shot autofocus settle delay
    pub single_shot_focus_settle_ms: u64,
    /// Motion sensor sampling interval
    pub orientation_sample_interval_ms: u64,
    /// Still size when neither the request nor the device gives one
    pub fallback_resolution: Resolution,
    /// Lower bound of the zoom envelope
    pub ui_min_zoom: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            long_edge_budget: photo::LONG_EDGE_BUDGET,
            continuous_focus_settle_ms: focus::CONTINUOUS_SETTLE.as_millis() as u64,
            single_shot_focus_settle_ms: focus::SINGLE_SHOT_SETTLE.as_millis() as u64,
            orientation_sample_interval_ms: orientation::SAMPLE_INTERVAL.as_millis() as u64,
            fallback_resolution: Resolution::FALLBACK,
            ui_min_zoom: UI_MIN_ZOOM,
        }
    }
}

impl Config {
    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> CaptureResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CaptureError::Processing(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            CaptureError::Processing(format!("Invalid config {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// `<config dir>/camera-core/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("camera-core").join("config.json"))
    }

    pub fn continuous_focus_settle(&self) -> Duration {
        Duration::from_millis(self.continuous_focus_settle_ms)
    }

    pub fn single_shot_focus_settle(&self) -> Duration {
        Duration::from_millis(self.single_shot_focus_settle_ms)
    }

    pub fn orientation_sample_interval(&self) -> Duration {
        Duration::from_millis(self.orientation_sample_interval_ms)
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! The single running capture pipeline
//!
//! [`DeviceSessionCore`] owns one pipeline with at most one active video
//! input and one photo output. All input replacement goes through a
//! [`SessionTransaction`]; all parameter changes through a
//! [`ConfigurationLock`].

use super::device_lock::ConfigurationLock;
use super::transaction::SessionTransaction;
use super::types::*;
use super::{CapturePipeline, CapturePlatform, DeviceControl, lock_unpoisoned};
use crate::constants::DEFAULT_ZOOM_FACTOR;
use crate::errors::{CaptureError, CaptureResult};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub active_device: Option<CaptureDevice>,
    /// Always within the active device's zoom range
    pub zoom_factor: f64,
    pub flash_mode: FlashMode,
    pub camera_position: CameraPosition,
    pub is_running: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_device: None,
            zoom_factor: DEFAULT_ZOOM_FACTOR,
            flash_mode: FlashMode::Off,
            camera_position: CameraPosition::Back,
            is_running: false,
        }
    }
}

/// Owner of the capture pipeline
///
/// Cheap to clone; clones share the same pipeline and state.
#[derive(Clone)]
pub struct DeviceSessionCore {
    pipeline: Arc<Mutex<Box<dyn CapturePipeline>>>,
    state: Arc<Mutex<SessionState>>,
    /// Zoom floor, capped by each device's own maximum
    min_zoom: f64,
}

impl DeviceSessionCore {
    /// Create the pipeline and attach its photo output
    ///
    /// Zoom is never applied below `min_zoom` unless the device's own
    /// maximum is lower.
    pub fn new(platform: &dyn CapturePlatform, min_zoom: f64) -> CaptureResult<Self> {
        let core = Self {
            pipeline: Arc::new(Mutex::new(platform.create_pipeline())),
            state: Arc::new(Mutex::new(SessionState::default())),
            min_zoom,
        };

        let mut transaction = core.begin_transaction();
        transaction.ensure_photo_output()?;
        transaction.commit();

        Ok(core)
    }

    /// Begin a transaction, waiting for any in-flight one to finish
    pub fn begin_transaction(&self) -> SessionTransaction<'_> {
        SessionTransaction::begin(lock_unpoisoned(&self.pipeline))
    }

    /// Replace the video input with `device` in a single transaction
    ///
    /// If the platform refuses the new input the previous input set is
    /// restored and `DeviceNotAddable` is returned.
    pub fn set_active_input(&self, device: &CaptureDevice) -> CaptureResult<()> {
        info!(device = %device, "Replacing active video input");

        let mut transaction = self.begin_transaction();
        let control = match transaction.replace_inputs(device) {
            Ok(control) => control,
            Err(e) => {
                warn!(device = %device.id, error = %e, "Platform refused input");
                // Dropping the transaction restores the previous inputs
                drop(transaction);
                self.sync_active_device();
                return Err(CaptureError::DeviceNotAddable(device.name.clone()));
            }
        };
        transaction.commit();

        let carried = {
            let mut state = lock_unpoisoned(&self.state);
            state.active_device = Some(device.clone());
            state.camera_position = device.position;
            self.zoom_bounds(device.capabilities.zoom_range)
                .clamp(state.zoom_factor)
        };

        let zoom = match ConfigurationLock::acquire(control.as_ref()) {
            Ok(guard) => {
                guard.set_zoom_factor(carried);
                carried
            }
            Err(e) => {
                warn!(error = %e, "Could not carry zoom over to new input");
                control.zoom_factor()
            }
        };
        lock_unpoisoned(&self.state).zoom_factor = zoom;

        Ok(())
    }

    /// `[max(device min, min_zoom), device max]`
    fn zoom_bounds(&self, range: ValueRange<f64>) -> ValueRange<f64> {
        ValueRange::new(range.min.max(self.min_zoom).min(range.max), range.max)
    }

    /// Refresh `active_device` from what the pipeline actually holds
    fn sync_active_device(&self) {
        let active = self
            .active_input()
            .map(|control| control.device().clone());
        let mut state = lock_unpoisoned(&self.state);
        if let Some(device) = &active {
            state.camera_position = device.position;
        }
        state.active_device = active;
    }

    /// Configurable handle of the active video input
    pub fn active_input(&self) -> Option<Arc<dyn DeviceControl>> {
        lock_unpoisoned(&self.pipeline).inputs().into_iter().next()
    }

    /// Start the pipeline; no-op if already running
    ///
    /// Blocks on hardware. Never call this from the UI context; use
    /// [`Self::start`] instead.
    pub fn start_blocking(&self) {
        let mut pipeline = lock_unpoisoned(&self.pipeline);
        if pipeline.is_running() {
            debug!("Session already running");
            return;
        }
        info!("Starting capture session");
        pipeline.start_running();
        let running = pipeline.is_running();
        drop(pipeline);
        lock_unpoisoned(&self.state).is_running = running;
    }

    /// Stop the pipeline; no-op if already stopped
    ///
    /// Blocks on hardware.
    pub fn stop_blocking(&self) {
        let mut pipeline = lock_unpoisoned(&self.pipeline);
        if !pipeline.is_running() {
            debug!("Session already stopped");
            return;
        }
        info!("Stopping capture session");
        pipeline.stop_running();
        let running = pipeline.is_running();
        drop(pipeline);
        lock_unpoisoned(&self.state).is_running = running;
    }

    /// Start the pipeline on a blocking worker
    pub async fn start(&self) -> CaptureResult<()> {
        let core = self.clone();
        tokio::task::spawn_blocking(move || core.start_blocking()).await?;
        Ok(())
    }

    /// Stop the pipeline on a blocking worker
    pub async fn stop(&self) -> CaptureResult<()> {
        let core = self.clone();
        tokio::task::spawn_blocking(move || core.stop_blocking()).await?;
        Ok(())
    }

    /// Set the zoom factor, clamped to `[max(device min, min_zoom), device max]`
    ///
    /// Returns the applied factor, or `None` when the request was dropped
    /// (no active device yet, or the device could not be locked).
    pub fn set_zoom(&self, factor: f64) -> Option<f64> {
        if !factor.is_finite() {
            return None;
        }
        let Some(control) = self.active_input() else {
            debug!(factor, "Zoom request dropped, no active device");
            return None;
        };

        let bounds = self.zoom_bounds(control.device().capabilities.zoom_range);
        let clamped = bounds.clamp(factor);
        if clamped != factor {
            debug!(requested = factor, clamped, "Zoom clamped");
        }

        let guard = match ConfigurationLock::acquire(control.as_ref()) {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "Zoom request dropped");
                return None;
            }
        };
        guard.set_zoom_factor(clamped);
        drop(guard);

        lock_unpoisoned(&self.state).zoom_factor = clamped;
        Some(clamped)
    }

    pub fn set_flash_mode(&self, mode: FlashMode) {
        lock_unpoisoned(&self.state).flash_mode = mode;
    }

    /// Snapshot of the session state
    pub fn state(&self) -> SessionState {
        lock_unpoisoned(&self.state).clone()
    }

    pub fn is_running(&self) -> bool {
        lock_unpoisoned(&self.pipeline).is_running()
    }

    pub fn preview_orientation(&self) -> Option<DeviceOrientation> {
        lock_unpoisoned(&self.pipeline).preview_orientation()
    }

    /// Issue a still capture on the photo output
    pub fn capture_photo(&self, settings: &PhotoSettings) -> CaptureResult<PhotoCompletion> {
        let mut pipeline = lock_unpoisoned(&self.pipeline);
        Ok(pipeline.capture_photo(settings)?)
    }
}

impl std::fmt::Debug for DeviceSessionCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSessionCore")
            .field("state", &self.state())
            .finish()
    }
}

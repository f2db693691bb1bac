// SPDX-License-Identifier: GPL-3.0-only

//! Simulated device control

use super::VirtualFaults;
use crate::backends::camera::types::*;
use crate::backends::camera::{DeviceControl, lock_unpoisoned};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Current simulated hardware parameters
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualDeviceState {
    pub zoom_factor: f64,
    pub focus_mode: DeviceFocusMode,
    pub focus_point: Option<PointOfInterest>,
    pub exposure_mode: ExposureMode,
    pub exposure_point: Option<PointOfInterest>,
    pub exposure_bias: f32,
    pub exposure_duration: Duration,
    pub iso: f32,
    pub white_balance_mode: WhiteBalanceMode,
    pub white_balance_gains: WhiteBalanceGains,
    pub flash_mode: FlashMode,
}

impl VirtualDeviceState {
    fn initial(capabilities: &DeviceCapabilities) -> Self {
        Self {
            zoom_factor: capabilities.zoom_range.min,
            focus_mode: DeviceFocusMode::ContinuousAutoFocus,
            focus_point: None,
            exposure_mode: ExposureMode::ContinuousAuto,
            exposure_point: None,
            exposure_bias: 0.0,
            exposure_duration: Duration::from_millis(16),
            iso: capabilities.iso_range.min,
            white_balance_mode: WhiteBalanceMode::ContinuousAuto,
            white_balance_gains: WhiteBalanceGains::UNITY,
            flash_mode: FlashMode::Off,
        }
    }
}

/// A simulated camera device
///
/// Records every parameter write and whether it happened under a
/// configuration lock, so tests can assert lock discipline.
pub struct VirtualDevice {
    device: CaptureDevice,
    faults: Arc<VirtualFaults>,
    state: Mutex<VirtualDeviceState>,
    locked: AtomicBool,
    lock_acquisitions: AtomicUsize,
    unlocked_writes: AtomicUsize,
}

impl VirtualDevice {
    pub fn new(device: CaptureDevice, faults: Arc<VirtualFaults>) -> Self {
        let state = VirtualDeviceState::initial(&device.capabilities);
        Self {
            device,
            faults,
            state: Mutex::new(state),
            locked: AtomicBool::new(false),
            lock_acquisitions: AtomicUsize::new(0),
            unlocked_writes: AtomicUsize::new(0),
        }
    }

    /// Snapshot of the simulated hardware parameters
    pub fn snapshot(&self) -> VirtualDeviceState {
        lock_unpoisoned(&self.state).clone()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn lock_acquisitions(&self) -> usize {
        self.lock_acquisitions.load(Ordering::SeqCst)
    }

    /// Parameter writes that happened outside a configuration lock
    pub fn unlocked_writes(&self) -> usize {
        self.unlocked_writes.load(Ordering::SeqCst)
    }

    fn write(&self, parameter: &str, apply: impl FnOnce(&mut VirtualDeviceState)) {
        if !self.is_locked() {
            warn!(device = %self.device.id, parameter, "Parameter written without configuration lock");
            self.unlocked_writes.fetch_add(1, Ordering::SeqCst);
        }
        apply(&mut lock_unpoisoned(&self.state));
    }
}

impl DeviceControl for VirtualDevice {
    fn device(&self) -> &CaptureDevice {
        &self.device
    }

    fn lock_for_configuration(&self) -> BackendResult<()> {
        if self.faults.lock_failures() {
            return Err(BackendError::LockFailed(self.device.name.clone()));
        }
        self.locked.store(true, Ordering::SeqCst);
        self.lock_acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    fn zoom_factor(&self) -> f64 {
        lock_unpoisoned(&self.state).zoom_factor
    }

    fn set_zoom_factor(&self, factor: f64) {
        let factor = self.device.capabilities.zoom_range.clamp(factor);
        self.write("zoom", |state| state.zoom_factor = factor);
    }

    fn focus_mode(&self) -> DeviceFocusMode {
        lock_unpoisoned(&self.state).focus_mode
    }

    fn set_focus_mode(&self, mode: DeviceFocusMode) {
        self.write("focus_mode", |state| state.focus_mode = mode);
    }

    fn set_focus_point_of_interest(&self, point: PointOfInterest) {
        self.write("focus_point", |state| state.focus_point = Some(point));
    }

    fn exposure_mode(&self) -> ExposureMode {
        lock_unpoisoned(&self.state).exposure_mode
    }

    fn set_exposure_mode(&self, mode: ExposureMode) {
        self.write("exposure_mode", |state| state.exposure_mode = mode);
    }

    fn set_exposure_point_of_interest(&self, point: PointOfInterest) {
        self.write("exposure_point", |state| state.exposure_point = Some(point));
    }

    fn exposure_target_bias(&self) -> f32 {
        lock_unpoisoned(&self.state).exposure_bias
    }

    fn set_exposure_target_bias(&self, bias: f32) {
        let bias = self.device.capabilities.exposure_bias_range.clamp(bias);
        self.write("exposure_bias", |state| state.exposure_bias = bias);
    }

    fn exposure_duration(&self) -> Duration {
        lock_unpoisoned(&self.state).exposure_duration
    }

    fn iso(&self) -> f32 {
        lock_unpoisoned(&self.state).iso
    }

    fn set_exposure_mode_custom(&self, duration: Duration, iso: f32) -> ExposureCompletion {
        let capabilities = &self.device.capabilities;
        let duration = capabilities.shutter_duration_range.clamp(duration);
        let iso = capabilities.iso_range.clamp(iso);
        self.write("custom_exposure", |state| {
            state.exposure_mode = ExposureMode::Custom;
            state.exposure_duration = duration;
            state.iso = iso;
        });

        let (tx, rx) = oneshot::channel();
        let delay = self.faults.exposure_ack_delay();
        let device_id = self.device.id.clone();
        std::thread::spawn(move || {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            debug!(device = %device_id, ?duration, iso, "Custom exposure applied");
            let _ = tx.send(ExposureAck { duration, iso });
        });
        rx
    }

    fn white_balance_mode(&self) -> WhiteBalanceMode {
        lock_unpoisoned(&self.state).white_balance_mode
    }

    fn set_white_balance_mode(&self, mode: WhiteBalanceMode) {
        self.write("white_balance_mode", |state| state.white_balance_mode = mode);
    }

    /// Simple daylight-referenced model: warmer scenes boost blue,
    /// positive tint boosts green
    fn device_white_balance_gains(&self, values: TemperatureAndTint) -> WhiteBalanceGains {
        if values.temperature <= 0.0 {
            return WhiteBalanceGains::UNITY;
        }
        let ratio = 5500.0 / values.temperature;
        WhiteBalanceGains {
            red: 2.0 / ratio.max(0.1),
            green: 1.0 + values.tint / 100.0,
            blue: 2.0 * ratio,
        }
    }

    fn set_white_balance_mode_locked(&self, gains: WhiteBalanceGains) {
        self.write("white_balance_gains", |state| {
            state.white_balance_mode = WhiteBalanceMode::Locked;
            state.white_balance_gains = gains;
        });
    }

    fn flash_mode(&self) -> FlashMode {
        lock_unpoisoned(&self.state).flash_mode
    }

    fn set_flash_mode(&self, mode: FlashMode) {
        self.write("flash_mode", |state| state.flash_mode = mode);
    }
}

impl std::fmt::Debug for VirtualDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDevice")
            .field("device", &self.device.id)
            .field("locked", &self.is_locked())
            .finish()
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Capture platform abstraction
//!
//! The host platform exposes capture devices, a capture pipeline with
//! input/output ports, and a way to lock a device for atomic parameter
//! changes. Everything above this layer talks to those three traits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  CaptureController   │
//! └──────────┬───────────┘
//!            │
//!   ┌────────┴─────────┐
//!   ▼                  ▼
//! ┌──────────────┐ ┌──────────────┐
//! │ LensSwitcher │ │ DeviceSession│  ← SessionTransaction / ConfigurationLock
//! └──────┬───────┘ └──────┬───────┘
//!        │                │
//!        ▼                ▼
//! ┌──────────────────────────────┐
//! │ CapturePlatform / Pipeline / │  ← host platform (or virtual camera)
//! │ DeviceControl traits         │
//! └──────────────────────────────┘
//! ```

pub mod device_lock;
pub mod lens;
pub mod registry;
pub mod session;
pub mod transaction;
pub mod types;

pub use device_lock::ConfigurationLock;
pub use lens::{LensModel, LensSwitcher, ZoomEnvelope};
pub use registry::CaptureDeviceRegistry;
pub use session::{DeviceSessionCore, SessionState};
pub use transaction::SessionTransaction;
pub use types::*;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Host platform entry point
pub trait CapturePlatform: Send + Sync {
    /// Discover devices of a media type, optionally restricted to a position
    ///
    /// May be slow; callers run it off the UI context.
    fn discover_devices(
        &self,
        media_type: MediaType,
        position: Option<CameraPosition>,
    ) -> Vec<CaptureDevice>;

    /// The wide-angle camera for a position, used for first-run bootstrap
    fn default_device(&self, position: CameraPosition) -> Option<CaptureDevice>;

    /// Create the (single) capture pipeline
    fn create_pipeline(&self) -> Box<dyn CapturePipeline>;
}

/// A capture pipeline with one video input, one photo output and a preview sink
///
/// Input/output changes between `begin_configuration` and
/// `commit_configuration` become visible to the video pipeline atomically
/// at commit.
pub trait CapturePipeline: Send {
    fn begin_configuration(&mut self);

    fn commit_configuration(&mut self);

    /// Inputs currently attached
    fn inputs(&self) -> Vec<Arc<dyn DeviceControl>>;

    fn can_add_input(&self, device: &CaptureDevice) -> bool;

    /// Attach a device input, returning its configurable handle
    fn add_input(&mut self, device: &CaptureDevice) -> BackendResult<Arc<dyn DeviceControl>>;

    fn remove_input(&mut self, id: &DeviceId);

    fn has_photo_output(&self) -> bool;

    fn add_photo_output(&mut self) -> BackendResult<()>;

    /// Blocks on hardware
    fn start_running(&mut self);

    /// Blocks on hardware
    fn stop_running(&mut self);

    fn is_running(&self) -> bool;

    /// Orientation of the live preview connection, if one is attached
    fn preview_orientation(&self) -> Option<DeviceOrientation>;

    /// Issue a still capture; the returned receiver resolves when the
    /// hardware finishes processing the photo
    fn capture_photo(&mut self, settings: &PhotoSettings) -> BackendResult<PhotoCompletion>;
}

/// Configurable handle to an attached device
///
/// Parameter setters must only be called while the device is locked via
/// [`ConfigurationLock`]. Capability queries have default implementations
/// derived from the static [`DeviceCapabilities`].
pub trait DeviceControl: Send + Sync {
    fn device(&self) -> &CaptureDevice;

    // ===== Locking =====

    fn lock_for_configuration(&self) -> BackendResult<()>;

    fn unlock_for_configuration(&self);

    // ===== Zoom =====

    fn zoom_factor(&self) -> f64;

    fn set_zoom_factor(&self, factor: f64);

    // ===== Focus =====

    fn is_focus_point_of_interest_supported(&self) -> bool {
        self.device().capabilities.supports_focus_point_of_interest
    }

    fn is_focus_mode_supported(&self, mode: DeviceFocusMode) -> bool {
        self.device().capabilities.focus_modes.contains(&mode)
    }

    fn focus_mode(&self) -> DeviceFocusMode;

    fn set_focus_mode(&self, mode: DeviceFocusMode);

    fn set_focus_point_of_interest(&self, point: PointOfInterest);

    // ===== Exposure =====

    fn is_exposure_mode_supported(&self, mode: ExposureMode) -> bool {
        self.device().capabilities.exposure_modes.contains(&mode)
    }

    fn is_exposure_point_of_interest_supported(&self) -> bool {
        self.device().capabilities.supports_exposure_point_of_interest
    }

    fn exposure_mode(&self) -> ExposureMode;

    fn set_exposure_mode(&self, mode: ExposureMode);

    fn set_exposure_point_of_interest(&self, point: PointOfInterest);

    fn exposure_target_bias(&self) -> f32;

    fn set_exposure_target_bias(&self, bias: f32);

    fn exposure_duration(&self) -> Duration;

    fn iso(&self) -> f32;

    /// Switch to custom exposure; resolves once the sensor applies it
    fn set_exposure_mode_custom(&self, duration: Duration, iso: f32) -> ExposureCompletion;

    // ===== White balance =====

    fn is_white_balance_mode_supported(&self, mode: WhiteBalanceMode) -> bool {
        self.device().capabilities.white_balance_modes.contains(&mode)
    }

    fn max_white_balance_gain(&self) -> f32 {
        self.device().capabilities.max_white_balance_gain
    }

    fn white_balance_mode(&self) -> WhiteBalanceMode;

    fn set_white_balance_mode(&self, mode: WhiteBalanceMode);

    /// Convert a temperature/tint pair into device gains
    fn device_white_balance_gains(&self, values: TemperatureAndTint) -> WhiteBalanceGains;

    fn set_white_balance_mode_locked(&self, gains: WhiteBalanceGains);

    // ===== Flash =====

    fn is_flash_available(&self) -> bool {
        self.device().capabilities.has_flash
    }

    fn flash_mode(&self) -> FlashMode;

    fn set_flash_mode(&self, mode: FlashMode);
}

/// Lock a std mutex, recovering the data if a previous holder panicked
pub(crate) fn lock_unpoisoned<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

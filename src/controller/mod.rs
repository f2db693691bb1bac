// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! [`CaptureController`] is the façade the UI talks to. It composes the
//! [`DeviceSessionCore`] and [`LensSwitcher`], owns the focus and exposure
//! state, tracks device orientation and runs the capture flow.
//!
//! # Architecture
//!
//! ```text
//!            UI intents
//!                │
//!                ▼
//! ┌──────────────────────────────┐      ┌─────────────┐
//! │      CaptureController       │ ───▶ │  EventBus   │ zoom / focusState / focusMode
//! │  focus · exposure · capture  │      └─────────────┘
//! └───────┬──────────────┬───────┘
//!         │ queue        │
//!         ▼              ▼
//!   LensSwitcher   DeviceSessionCore ──▶ CapturePlatform
//! ```
//!
//! Lens switches and exposure-mode changes are serialised through one FIFO
//! configuration queue; zoom and focus changes only take the device lock.

pub mod capture;
pub mod events;
pub mod exposure;
pub mod focus;
pub mod orientation;

pub use capture::{CaptureRequest, CapturedPhoto};
pub use events::{EventBus, SessionEvent};
pub use exposure::{ExposureSettings, WhiteBalancePreset, map_exposure_bias};
pub use focus::{FocusMachine, FocusMode, FocusState};
pub use orientation::{OrientationTracker, classify};

use crate::backends::camera::{
    CameraPosition, CaptureDeviceRegistry, CapturePlatform, DeviceOrientation, DeviceSessionCore,
    FlashMode, LensModel, LensSwitcher, PointOfInterest, SessionState, ZoomEnvelope,
    lock_unpoisoned,
};
use crate::backends::motion::MotionSource;
use crate::config::Config;
use crate::errors::{CaptureError, CaptureResult};
use crate::pipelines::photo::AspectRatio;
use crate::settings::{SettingValue, SettingsKey, SettingsStore};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

pub(crate) struct Inner {
    pub(crate) config: Config,
    pub(crate) registry: CaptureDeviceRegistry,
    pub(crate) core: DeviceSessionCore,
    pub(crate) lenses: LensSwitcher,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) events: EventBus,
    pub(crate) focus: Mutex<FocusMachine>,
    pub(crate) exposure: Mutex<ExposureSettings>,
    pub(crate) white_balance: Mutex<WhiteBalancePreset>,
    pub(crate) aspect_ratio: Mutex<AspectRatio>,
    /// FIFO configuration queue
    pub(crate) queue: tokio::sync::Mutex<()>,
    /// Shared with the task that awaits the hardware capture
    pub(crate) capture_in_flight: Arc<AtomicBool>,
    pub(crate) orientation: OrientationTracker,
}

/// Principal façade over the capture session
///
/// Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct CaptureController {
    pub(crate) inner: Arc<Inner>,
}

/// Settings read at construction, applied by [`CaptureController::setup`]
#[derive(Debug, Clone, Copy, PartialEq)]
struct PersistedSettings {
    flash_mode: FlashMode,
    focus_mode: FocusMode,
    exposure: ExposureSettings,
    white_balance: WhiteBalancePreset,
    aspect_ratio: AspectRatio,
}

impl PersistedSettings {
    fn read(settings: &dyn SettingsStore) -> Self {
        let int = |key| settings.get(key).and_then(SettingValue::as_i64);
        let float = |key| settings.get(key).and_then(SettingValue::as_f64);

        let locked = settings
            .get(SettingsKey::FocusLocked)
            .and_then(SettingValue::as_bool)
            .unwrap_or(false);
        let focus_mode = if locked {
            FocusMode::Locked
        } else {
            match int(SettingsKey::FocusMode).map(FocusMode::from_index) {
                // A stale locked mode without the lock flag means unlocked
                Some(FocusMode::Locked) | None => FocusMode::Continuous,
                Some(mode) => mode,
            }
        };

        Self {
            flash_mode: int(SettingsKey::FlashMode)
                .map(FlashMode::from_index)
                .unwrap_or_default(),
            focus_mode,
            exposure: ExposureSettings {
                exposure_bias: float(SettingsKey::ExposureValue).unwrap_or(0.0) as f32,
                iso: float(SettingsKey::IsoValue).unwrap_or(0.0) as f32,
                shutter_speed: float(SettingsKey::ShutterSpeed).unwrap_or(0.0),
            },
            white_balance: int(SettingsKey::WhiteBalanceMode)
                .map(WhiteBalancePreset::from_index)
                .unwrap_or_default(),
            aspect_ratio: int(SettingsKey::RatioMode)
                .map(AspectRatio::from_index)
                .unwrap_or_default(),
        }
    }
}

impl CaptureController {
    /// Create the controller and its (not yet configured) session
    pub fn new(
        platform: Arc<dyn CapturePlatform>,
        motion: Arc<dyn MotionSource>,
        settings: Arc<dyn SettingsStore>,
        config: Config,
    ) -> CaptureResult<Self> {
        let persisted = PersistedSettings::read(settings.as_ref());
        debug!(?persisted, "Restored settings");

        let core = DeviceSessionCore::new(platform.as_ref(), config.ui_min_zoom)?;
        core.set_flash_mode(persisted.flash_mode);
        let registry = CaptureDeviceRegistry::new(platform);
        let orientation =
            OrientationTracker::new(motion, config.orientation_sample_interval());

        let inner = Inner {
            lenses: LensSwitcher::new(registry.clone(), config.ui_min_zoom),
            registry,
            core,
            settings,
            events: EventBus::new(),
            focus: Mutex::new(FocusMachine::new(persisted.focus_mode)),
            exposure: Mutex::new(persisted.exposure),
            white_balance: Mutex::new(persisted.white_balance),
            aspect_ratio: Mutex::new(persisted.aspect_ratio),
            queue: tokio::sync::Mutex::new(()),
            capture_in_flight: Arc::new(AtomicBool::new(false)),
            orientation,
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bootstrap the default back camera and re-apply persisted settings
    ///
    /// Does not start the session.
    pub async fn setup(&self) -> CaptureResult<()> {
        let Some(device) = self.inner.registry.default_device(CameraPosition::Back) else {
            return Err(CaptureError::DeviceNotFound(
                "no default back camera".to_string(),
            ));
        };

        {
            let _queue = self.inner.queue.lock().await;
            let inner = Arc::clone(&self.inner);
            let lens = tokio::task::spawn_blocking(move || {
                inner.lenses.activate_device(&inner.core, &device)
            })
            .await??;
            info!(lens = %lens.name, "Capture session configured");
        }

        self.restore_settings().await;
        Ok(())
    }

    async fn restore_settings(&self) {
        let persisted = PersistedSettings::read(self.inner.settings.as_ref());

        match persisted.focus_mode {
            FocusMode::Locked => {
                if let Err(e) = self.lock_focus().await {
                    warn!(error = %e, "Could not restore focus lock");
                }
            }
            FocusMode::Auto | FocusMode::Continuous => {
                if let Err(e) = self.focus_at(PointOfInterest::CENTER).await {
                    warn!(error = %e, "Could not restore focus mode");
                }
            }
            FocusMode::Manual => {}
        }

        if persisted.flash_mode != FlashMode::Off
            && let Err(e) = self.set_flash_mode(persisted.flash_mode).await
        {
            warn!(error = %e, "Could not restore flash mode");
            self.inner.core.set_flash_mode(FlashMode::Off);
        }
        if persisted.white_balance != WhiteBalancePreset::Auto
            && let Err(e) = self.set_white_balance(persisted.white_balance).await
        {
            warn!(error = %e, "Could not restore white balance");
        }

        // Shutter before ISO: a custom shutter runs at baseline ISO, and a
        // custom ISO keeps the current duration
        let exposure = persisted.exposure;
        if exposure.exposure_bias != 0.0
            && let Err(e) = self.set_exposure_bias(exposure.exposure_bias).await
        {
            warn!(error = %e, "Could not restore exposure bias");
        }
        if exposure.shutter_speed > 0.0
            && let Err(e) = self.set_shutter_speed(exposure.shutter_speed).await
        {
            warn!(error = %e, "Could not restore shutter speed");
        }
        if exposure.iso > 0.0
            && let Err(e) = self.set_iso(exposure.iso).await
        {
            warn!(error = %e, "Could not restore ISO");
        }
    }

    /// Start the session on a background worker; no-op if running
    pub async fn start(&self) -> CaptureResult<()> {
        self.inner.core.start().await
    }

    /// Stop the session on a background worker; no-op if stopped
    pub async fn stop(&self) -> CaptureResult<()> {
        self.inner.core.stop().await
    }

    /// Stop orientation updates and the session
    pub async fn shutdown(&self) -> CaptureResult<()> {
        self.inner.orientation.stop();
        self.stop().await
    }

    // =========================================================================
    // Lenses
    // =========================================================================

    /// Lenses offered for a position, discovered on a background worker
    pub async fn available_lenses(&self, position: CameraPosition) -> Vec<LensModel> {
        let lenses = LensSwitcher::available_lenses(&self.inner.registry, position).await;
        self.inner.lenses.set_offered(lenses)
    }

    /// Switch to `lens`, returning a human-readable confirmation
    pub async fn switch_lens(&self, lens: LensModel) -> CaptureResult<String> {
        let _queue = self.inner.queue.lock().await;
        let inner = Arc::clone(&self.inner);
        let result =
            tokio::task::spawn_blocking(move || inner.lenses.switch_to(&inner.core, &lens)).await?;

        match &result {
            Ok(message) => {
                info!(%message, "Lens switch complete");
                self.inner
                    .events
                    .publish(SessionEvent::Zoom(self.inner.core.state().zoom_factor));
            }
            Err(e) => warn!(error = %e, "Lens switch failed"),
        }
        result
    }

    /// Move to `position`, restoring the remembered back lens
    pub async fn switch_position(&self, position: CameraPosition) -> CaptureResult<String> {
        let lens = self.inner.lenses.lens_for_position(position);
        self.switch_lens(lens).await
    }

    /// Flip between front and back cameras
    pub async fn toggle_position(&self) -> CaptureResult<String> {
        let position = self.inner.core.state().camera_position.opposite();
        self.switch_position(position).await
    }

    pub fn current_lens(&self) -> Option<LensModel> {
        self.inner.lenses.current()
    }

    pub fn last_selected_lens(&self) -> Option<LensModel> {
        self.inner.lenses.last_selected_lens()
    }

    /// UI zoom range for the active lens
    pub fn zoom_envelope(&self) -> ZoomEnvelope {
        self.inner.lenses.envelope()
    }

    // =========================================================================
    // Zoom
    // =========================================================================

    /// Set zoom, clamped to `[max(device min, ui min), device max]`
    ///
    /// Returns the applied factor, or `None` when dropped because no device
    /// is active yet or the device could not be locked.
    pub fn set_zoom(&self, factor: f64) -> Option<f64> {
        let applied = self.inner.core.set_zoom(factor)?;
        self.inner.lenses.record_zoom(applied);
        self.inner.events.publish(SessionEvent::Zoom(applied));
        Some(applied)
    }

    pub fn zoom_factor(&self) -> f64 {
        self.inner.core.state().zoom_factor
    }

    // =========================================================================
    // Aspect ratio and orientation
    // =========================================================================

    pub fn aspect_ratio(&self) -> AspectRatio {
        *lock_unpoisoned(&self.inner.aspect_ratio)
    }

    pub fn set_aspect_ratio(&self, ratio: AspectRatio) {
        *lock_unpoisoned(&self.inner.aspect_ratio) = ratio;
        self.inner
            .settings
            .set(SettingsKey::RatioMode, SettingValue::Int(ratio.index()));
        info!(%ratio, "Aspect ratio set");
    }

    /// Begin classifying motion samples; must run inside a tokio runtime
    pub fn start_orientation_updates(&self) {
        self.inner.orientation.start();
    }

    pub fn stop_orientation_updates(&self) {
        self.inner.orientation.stop();
    }

    pub fn is_tracking_orientation(&self) -> bool {
        self.inner.orientation.is_running()
    }

    pub fn device_orientation(&self) -> DeviceOrientation {
        self.inner.orientation.current()
    }

    pub fn subscribe_orientation(&self) -> watch::Receiver<DeviceOrientation> {
        self.inner.orientation.subscribe()
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Change notifications for `zoom`, `focusState` and `focusMode`
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.core.state()
    }

    pub fn flash_mode(&self) -> FlashMode {
        self.inner.core.state().flash_mode
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("core", &self.inner.core)
            .field("focus", &*lock_unpoisoned(&self.inner.focus))
            .finish_non_exhaustive()
    }
}

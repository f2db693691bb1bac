// SPDX-License-Identifier: GPL-3.0-only

//! Exposure, ISO, shutter, white balance and flash controls
//!
//! Every setter takes the configuration queue first, so exposure-mode
//! changes apply strictly in call order and the most recent call wins.
//! A setter that fails leaves hardware and stored values untouched; its
//! [`CaptureError`] carries the reason for the UI.

use super::CaptureController;
use crate::backends::camera::{
    ConfigurationLock, DeviceControl, ExposureMode, FlashMode, PointOfInterest,
    TemperatureAndTint, ValueRange, WhiteBalanceMode, lock_unpoisoned,
};
use crate::constants::exposure::{MIN_WHITE_BALANCE_GAIN, UI_BIAS_MAX, UI_BIAS_MIN};
use crate::errors::{CaptureError, CaptureResult};
use crate::settings::{SettingValue, SettingsKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// User-facing exposure values
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExposureSettings {
    /// UI bias in stops, `[-2, 2]`
    pub exposure_bias: f32,
    /// 0 = auto
    pub iso: f32,
    /// Seconds, 0 = auto
    pub shutter_speed: f64,
}

/// White balance presets offered by the tool bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WhiteBalancePreset {
    #[default]
    Auto,
    Sunny,
    Cloudy,
    Fluorescent,
    Incandescent,
}

impl WhiteBalancePreset {
    pub const ALL: [WhiteBalancePreset; 5] = [
        WhiteBalancePreset::Auto,
        WhiteBalancePreset::Sunny,
        WhiteBalancePreset::Cloudy,
        WhiteBalancePreset::Fluorescent,
        WhiteBalancePreset::Incandescent,
    ];

    /// Target temperature (Kelvin) and tint, `None` for auto
    pub fn temperature_and_tint(self) -> Option<TemperatureAndTint> {
        let (temperature, tint) = match self {
            WhiteBalancePreset::Auto => return None,
            WhiteBalancePreset::Sunny => (5500.0, 0.0),
            WhiteBalancePreset::Cloudy => (6500.0, 10.0),
            WhiteBalancePreset::Fluorescent => (4000.0, -10.0),
            WhiteBalancePreset::Incandescent => (2700.0, 5.0),
        };
        Some(TemperatureAndTint { temperature, tint })
    }

    pub fn index(self) -> i64 {
        match self {
            WhiteBalancePreset::Auto => 0,
            WhiteBalancePreset::Sunny => 1,
            WhiteBalancePreset::Cloudy => 2,
            WhiteBalancePreset::Fluorescent => 3,
            WhiteBalancePreset::Incandescent => 4,
        }
    }

    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }
}

/// Map a UI bias in `[-2, 2]` linearly onto the device's native range
pub fn map_exposure_bias(value: f32, native: ValueRange<f32>) -> f32 {
    let value = value.clamp(UI_BIAS_MIN, UI_BIAS_MAX);
    let t = (value - UI_BIAS_MIN) / (UI_BIAS_MAX - UI_BIAS_MIN);
    native.clamp(native.min + (native.max - native.min) * t)
}

impl CaptureController {
    // =========================================================================
    // Exposure Control
    // =========================================================================

    pub fn exposure_settings(&self) -> ExposureSettings {
        *lock_unpoisoned(&self.inner.exposure)
    }

    pub fn white_balance(&self) -> WhiteBalancePreset {
        *lock_unpoisoned(&self.inner.white_balance)
    }

    /// Set the exposure bias from the UI range `[-2, 2]`
    ///
    /// Returns the device to continuous auto exposure, so ISO and shutter
    /// revert to auto.
    pub async fn set_exposure_bias(&self, value: f32) -> CaptureResult<()> {
        finite("exposure bias", f64::from(value))?;
        let _queue = self.inner.queue.lock().await;
        let control = self.active_control("exposure bias")?;
        let guard = lock_device(control.as_ref())?;
        if !guard.is_exposure_mode_supported(ExposureMode::ContinuousAuto) {
            return Err(unsupported("continuous auto exposure mode"));
        }

        let native = map_exposure_bias(value, guard.device().capabilities.exposure_bias_range);
        guard.set_exposure_mode(ExposureMode::ContinuousAuto);
        guard.set_exposure_target_bias(native);
        drop(guard);

        let value = value.clamp(UI_BIAS_MIN, UI_BIAS_MAX);
        info!(value, native, "Exposure bias set");
        self.update_exposure(|exposure| {
            exposure.exposure_bias = value;
            exposure.iso = 0.0;
            exposure.shutter_speed = 0.0;
        });
        Ok(())
    }

    /// Set ISO; `0` selects auto exposure
    ///
    /// A custom ISO keeps the current exposure duration.
    pub async fn set_iso(&self, value: f32) -> CaptureResult<()> {
        finite("ISO", f64::from(value))?;
        let _queue = self.inner.queue.lock().await;
        let control = self.active_control("ISO")?;
        let guard = lock_device(control.as_ref())?;

        if value <= 0.0 {
            return self.return_to_auto(guard, "ISO");
        }

        if !guard.is_exposure_mode_supported(ExposureMode::Custom) {
            return Err(unsupported("custom exposure mode"));
        }
        let iso = guard.device().capabilities.iso_range.clamp(value);
        let duration = guard.exposure_duration();
        let acknowledged = guard.set_exposure_mode_custom(duration, iso);
        drop(guard);

        let ack = acknowledged.await.map_err(|_| dropped_acknowledgement("ISO"))?;
        info!(iso = ack.iso, "ISO applied");
        self.update_exposure(|exposure| exposure.iso = ack.iso);
        Ok(())
    }

    /// Set the shutter speed in seconds; `0` selects auto exposure
    ///
    /// A custom shutter speed runs at the device's baseline ISO. Resolves
    /// only once the hardware acknowledges the new duration; the
    /// configuration queue stays held until then.
    pub async fn set_shutter_speed(&self, seconds: f64) -> CaptureResult<()> {
        finite("shutter speed", seconds)?;
        let _queue = self.inner.queue.lock().await;
        let control = self.active_control("shutter speed")?;
        let guard = lock_device(control.as_ref())?;

        if seconds <= 0.0 {
            return self.return_to_auto(guard, "Shutter speed");
        }

        if !guard.is_exposure_mode_supported(ExposureMode::Custom) {
            return Err(unsupported("custom exposure mode"));
        }
        if guard.is_exposure_point_of_interest_supported() {
            guard.set_exposure_point_of_interest(PointOfInterest::CENTER);
        }
        let capabilities = &guard.device().capabilities;
        let duration = capabilities
            .shutter_duration_range
            .clamp(Duration::from_secs_f64(seconds));
        let baseline_iso = capabilities.iso_range.min;
        let acknowledged = guard.set_exposure_mode_custom(duration, baseline_iso);
        drop(guard);

        debug!(?duration, baseline_iso, "Waiting for custom exposure acknowledgement");
        let ack = acknowledged
            .await
            .map_err(|_| dropped_acknowledgement("shutter speed"))?;
        info!(duration = ?ack.duration, iso = ack.iso, "Shutter speed applied");
        self.update_exposure(|exposure| {
            exposure.shutter_speed = ack.duration.as_secs_f64();
            exposure.iso = ack.iso;
        });
        Ok(())
    }

    /// Put the device back in continuous auto exposure
    ///
    /// ISO and shutter are both auto afterwards, so both stored values reset.
    fn return_to_auto(&self, guard: ConfigurationLock<'_>, what: &str) -> CaptureResult<()> {
        if !guard.is_exposure_mode_supported(ExposureMode::ContinuousAuto) {
            return Err(unsupported("continuous auto exposure mode"));
        }
        guard.set_exposure_mode(ExposureMode::ContinuousAuto);
        drop(guard);
        info!(what, "Exposure returned to auto");
        self.update_exposure(|exposure| {
            exposure.iso = 0.0;
            exposure.shutter_speed = 0.0;
        });
        Ok(())
    }

    /// Apply a white balance preset
    pub async fn set_white_balance(&self, preset: WhiteBalancePreset) -> CaptureResult<()> {
        let _queue = self.inner.queue.lock().await;
        let control = self.active_control("white balance")?;
        let guard = lock_device(control.as_ref())?;

        match preset.temperature_and_tint() {
            None => {
                if !guard.is_white_balance_mode_supported(WhiteBalanceMode::ContinuousAuto) {
                    return Err(unsupported("auto white balance"));
                }
                guard.set_white_balance_mode(WhiteBalanceMode::ContinuousAuto);
            }
            Some(values) => {
                if !guard.is_white_balance_mode_supported(WhiteBalanceMode::Locked) {
                    return Err(unsupported("locked white balance"));
                }
                let gains = guard
                    .device_white_balance_gains(values)
                    .clamped(MIN_WHITE_BALANCE_GAIN, guard.max_white_balance_gain());
                guard.set_white_balance_mode_locked(gains);
            }
        }
        drop(guard);

        info!(?preset, "White balance set");
        *lock_unpoisoned(&self.inner.white_balance) = preset;
        self.inner.settings.set(
            SettingsKey::WhiteBalanceMode,
            SettingValue::Int(preset.index()),
        );
        Ok(())
    }

    /// Set the flash mode for subsequent captures
    ///
    /// `Off` is always accepted; `On` and `Auto` need a device with a flash.
    pub async fn set_flash_mode(&self, mode: FlashMode) -> CaptureResult<()> {
        let _queue = self.inner.queue.lock().await;
        match self.inner.core.active_input() {
            Some(control) => {
                if mode != FlashMode::Off && !control.is_flash_available() {
                    return Err(unsupported("flash"));
                }
                lock_device(control.as_ref())?.set_flash_mode(mode);
            }
            None if mode != FlashMode::Off => {
                debug!(?mode, "Flash request dropped, no active device");
                return Err(no_active_device("flash"));
            }
            None => {}
        }

        info!(?mode, "Flash mode set");
        self.inner.core.set_flash_mode(mode);
        self.inner
            .settings
            .set(SettingsKey::FlashMode, SettingValue::Int(mode.index()));
        Ok(())
    }

    /// Cycle the flash mode Off -> On -> Auto -> Off
    pub async fn cycle_flash_mode(&self) -> CaptureResult<()> {
        let next = self.inner.core.state().flash_mode.next();
        self.set_flash_mode(next).await
    }

    fn active_control(&self, what: &str) -> CaptureResult<Arc<dyn DeviceControl>> {
        self.inner.core.active_input().ok_or_else(|| {
            debug!(what, "Request dropped, no active device");
            no_active_device(what)
        })
    }

    fn update_exposure(&self, apply: impl FnOnce(&mut ExposureSettings)) {
        let exposure = {
            let mut exposure = lock_unpoisoned(&self.inner.exposure);
            apply(&mut exposure);
            *exposure
        };
        let settings = &self.inner.settings;
        settings.set(
            SettingsKey::ExposureValue,
            SettingValue::Float(f64::from(exposure.exposure_bias)),
        );
        settings.set(SettingsKey::IsoValue, SettingValue::Float(f64::from(exposure.iso)));
        settings.set(
            SettingsKey::ShutterSpeed,
            SettingValue::Float(exposure.shutter_speed),
        );
    }
}

fn lock_device(control: &dyn DeviceControl) -> CaptureResult<ConfigurationLock<'_>> {
    ConfigurationLock::acquire(control).map_err(|e| {
        let error = CaptureError::from(e);
        warn!(%error, "Exposure control skipped");
        error
    })
}

fn unsupported(mode: &str) -> CaptureError {
    let error = CaptureError::UnsupportedMode(mode.to_string());
    warn!(reason = %error.user_message(), "Exposure control rejected");
    error
}

fn no_active_device(what: &str) -> CaptureError {
    CaptureError::DeviceNotFound(format!("no active device for {}", what))
}

fn finite(what: &str, value: f64) -> CaptureResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(unsupported(&format!("{} of {}", what, value)))
    }
}

fn dropped_acknowledgement(what: &str) -> CaptureError {
    warn!(what, "Device dropped custom exposure acknowledgement");
    CaptureError::ConfigurationLockFailed(format!("{} was not acknowledged", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_maps_endpoints_and_midpoint() {
        let native = ValueRange::new(-4.0, 4.0);
        assert_eq!(map_exposure_bias(-2.0, native), -4.0);
        assert_eq!(map_exposure_bias(0.0, native), 0.0);
        assert_eq!(map_exposure_bias(2.0, native), 4.0);
    }

    #[test]
    fn test_bias_clamps_input() {
        let native = ValueRange::new(-8.0, 8.0);
        assert_eq!(map_exposure_bias(-5.0, native), -8.0);
        assert_eq!(map_exposure_bias(9.0, native), 8.0);
    }

    #[test]
    fn test_bias_on_asymmetric_range() {
        let native = ValueRange::new(-2.0, 6.0);
        assert_eq!(map_exposure_bias(0.0, native), 2.0);
    }

    #[test]
    fn test_white_balance_presets() {
        let cloudy = WhiteBalancePreset::Cloudy.temperature_and_tint().unwrap();
        assert_eq!(cloudy.temperature, 6500.0);
        assert_eq!(cloudy.tint, 10.0);
        assert!(WhiteBalancePreset::Auto.temperature_and_tint().is_none());
        assert_eq!(
            WhiteBalancePreset::from_index(WhiteBalancePreset::Incandescent.index()),
            WhiteBalancePreset::Incandescent
        );
        assert_eq!(WhiteBalancePreset::from_index(99), WhiteBalancePreset::Auto);
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Scoped exclusive device access
//!
//! [`ConfigurationLock`] pairs `lock_for_configuration` with
//! `unlock_for_configuration`: the unlock runs when the guard is dropped,
//! so early returns (unsupported mode, `?`) release the device too. When
//! acquisition fails no guard exists and nothing needs releasing.

use super::DeviceControl;
use super::types::BackendResult;
use std::ops::Deref;
use tracing::{debug, warn};

/// Held while a device is locked for configuration
pub struct ConfigurationLock<'a> {
    device: &'a dyn DeviceControl,
}

impl<'a> ConfigurationLock<'a> {
    /// Acquire exclusive configuration access to `device`
    pub fn acquire(device: &'a dyn DeviceControl) -> BackendResult<Self> {
        if let Err(e) = device.lock_for_configuration() {
            warn!(device = %device.device().id, error = %e, "Could not lock device for configuration");
            return Err(e);
        }
        debug!(device = %device.device().id, "Device locked for configuration");
        Ok(Self { device })
    }
}

impl<'a> Deref for ConfigurationLock<'a> {
    type Target = dyn DeviceControl + 'a;

    fn deref(&self) -> &Self::Target {
        self.device
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
        debug!(device = %self.device.device().id, "Device unlocked");
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Capture device enumeration

use super::CapturePlatform;
use super::types::{CameraPosition, CaptureDevice, LensType, MediaType};
use std::sync::Arc;
use tracing::{debug, info};

/// Enumerates physical capture devices and their static capabilities
///
/// Enumeration is a pure function of the installed hardware but may be
/// slow, so async callers go through [`Self::enumerate_in_background`].
#[derive(Clone)]
pub struct CaptureDeviceRegistry {
    platform: Arc<dyn CapturePlatform>,
}

impl CaptureDeviceRegistry {
    pub fn new(platform: Arc<dyn CapturePlatform>) -> Self {
        Self { platform }
    }

    /// Synchronous query against the host platform
    pub fn enumerate(
        &self,
        media_type: MediaType,
        position: Option<CameraPosition>,
    ) -> Vec<CaptureDevice> {
        let devices = self.platform.discover_devices(media_type, position);
        info!(
            ?media_type,
            position = ?position,
            count = devices.len(),
            "Enumerated capture devices"
        );
        devices
    }

    /// Enumerate video devices on a blocking worker
    ///
    /// Returns an empty list if the worker could not run; callers already
    /// tolerate an empty result arriving after bootstrap.
    pub async fn enumerate_in_background(
        &self,
        position: Option<CameraPosition>,
    ) -> Vec<CaptureDevice> {
        let registry = self.clone();
        tokio::task::spawn_blocking(move || registry.enumerate(MediaType::Video, position))
            .await
            .unwrap_or_default()
    }

    /// Wide-angle camera for a position, used before enumeration completes
    pub fn default_device(&self, position: CameraPosition) -> Option<CaptureDevice> {
        let device = self.platform.default_device(position);
        debug!(
            %position,
            found = device.is_some(),
            "Default device lookup"
        );
        device
    }

    /// Find the device with a given lens at a given position
    pub fn find(&self, position: CameraPosition, lens_type: LensType) -> Option<CaptureDevice> {
        self.enumerate(MediaType::Video, Some(position))
            .into_iter()
            .find(|device| device.position == position && device.lens_type == lens_type)
    }
}

impl std::fmt::Debug for CaptureDeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureDeviceRegistry").finish_non_exhaustive()
    }
}

// SPDX-License-Identifier: GPL-3.0-only

//! Still capture flow
//!
//! ```text
//! capture(request)
//!   ├─ claim single-flight slot (else CaptureInFlight)
//!   ├─ resolve resolution / flash / stabilization
//!   ├─ issue hardware capture
//!   └─ spawned task (owns the slot)
//!        ├─ await RawPhoto, release slot
//!        └─ spawn_blocking: decode → OrientationCorrector → CapturedPhoto
//! ```
//!
//! Dropping the `capture` future does not free the slot early: the
//! spawned task keeps it until the hardware completion resolves.

use super::CaptureController;
use crate::backends::camera::{
    CameraPosition, CaptureDevice, DeviceOrientation, ExposureMode, FlashMode, PhotoCompletion,
    PhotoSettings, Resolution, ResolvedPhotoSettings,
};
use crate::errors::{CaptureError, CaptureResult};
use crate::pipelines::photo::{self, OrientationContext, OrientationCorrector};
use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the caller asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    /// Explicit still size; otherwise the device maximum, then the fallback
    pub target_resolution: Option<Resolution>,
    /// Overrides the session flash mode for this capture
    pub flash_mode: Option<FlashMode>,
    pub stabilization_enabled: bool,
    pub high_resolution_enabled: bool,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            target_resolution: None,
            flash_mode: None,
            stabilization_enabled: true,
            high_resolution_enabled: true,
        }
    }
}

/// A finished, orientation-corrected photo
///
/// Handed off immediately; the controller keeps no reference.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    /// Identity of the request, for callers discarding late results
    pub id: Uuid,
    pub image: RgbaImage,
    /// What the hardware actually applied
    pub resolved_settings: ResolvedPhotoSettings,
    pub device_orientation_at_capture: DeviceOrientation,
    pub camera_position: CameraPosition,
}

/// Explicit request, else the device maximum, else the fallback
pub fn resolve_target_resolution(
    requested: Option<Resolution>,
    device: &CaptureDevice,
    fallback: Resolution,
) -> Resolution {
    requested
        .filter(|resolution| !resolution.is_empty())
        .or(device.capabilities.max_still_resolution)
        .filter(|resolution| !resolution.is_empty())
        .unwrap_or(fallback)
}

/// Holds the single-flight slot; releases it on drop
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> CaptureResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
            .map_err(|_| CaptureError::CaptureInFlight)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Await the hardware, free the slot, then decode and correct off the runtime
async fn finish_capture(
    id: Uuid,
    flight: InFlightGuard,
    completion: PhotoCompletion,
    corrector: OrientationCorrector,
    context: OrientationContext,
) -> CaptureResult<(RgbaImage, ResolvedPhotoSettings)> {
    let delivered = completion.await;
    drop(flight);
    let raw = delivered
        .map_err(|_| CaptureError::CaptureFailed("capture completion dropped".into()))?
        .inspect_err(|e| warn!(%id, error = %e, "Hardware capture failed"))?;

    if raw.data.is_empty() {
        warn!(%id, "Capture returned no data");
        return Err(CaptureError::CaptureDataUnavailable);
    }

    debug!(%id, bytes = raw.data.len(), "Capture delivered, correcting orientation");
    let corrected = tokio::task::spawn_blocking(move || -> CaptureResult<_> {
        let decoded = photo::decode(&raw)?;
        let context = OrientationContext {
            exif_orientation: raw.exif_orientation,
            ..context
        };
        Ok((corrector.correct(&decoded, &context), raw.resolved_settings))
    })
    .await??;
    Ok(corrected)
}

impl CaptureController {
    // =========================================================================
    // Capture
    // =========================================================================

    pub fn is_capturing(&self) -> bool {
        self.inner.capture_in_flight.load(Ordering::Acquire)
    }

    /// Take one still photo
    ///
    /// Only one capture may be outstanding; a concurrent call fails with
    /// `CaptureInFlight`. There is no cancellation: the call ends with a
    /// photo or an error, and a caller that stops waiting still holds the
    /// slot until the hardware finishes.
    pub async fn capture(&self, request: CaptureRequest) -> CaptureResult<CapturedPhoto> {
        let flight = InFlightGuard::acquire(&self.inner.capture_in_flight).inspect_err(|_| {
            warn!("Capture rejected, another capture is in flight");
        })?;
        let id = Uuid::new_v4();

        let Some(control) = self.inner.core.active_input() else {
            return Err(CaptureError::DeviceNotFound("no active device".into()));
        };
        let device = control.device().clone();
        let capabilities = &device.capabilities;

        let resolution = resolve_target_resolution(
            request.target_resolution,
            &device,
            self.inner.config.fallback_resolution,
        );
        let flash_mode = if capabilities.has_flash {
            request
                .flash_mode
                .unwrap_or_else(|| self.inner.core.state().flash_mode)
        } else {
            FlashMode::Off
        };
        let stabilization_enabled = request.stabilization_enabled
            && capabilities.supports_stabilization
            && control.exposure_mode() != ExposureMode::Custom;

        let settings = PhotoSettings {
            flash_mode,
            stabilization_enabled,
            high_resolution_enabled: request.high_resolution_enabled,
            resolution,
        };

        let device_orientation = self.device_orientation();
        let context = OrientationContext {
            exif_orientation: Default::default(),
            device_orientation,
            target_aspect_ratio: self.aspect_ratio().value(),
            mirrored: device.position == CameraPosition::Front,
            preview_orientation: self.inner.core.preview_orientation(),
        };

        info!(%id, device = %device.id, %resolution, ?flash_mode, stabilization_enabled, "Capturing photo");
        let completion = self.inner.core.capture_photo(&settings)?;
        let corrector = OrientationCorrector::new(self.inner.config.long_edge_budget);

        let processing = tokio::spawn(finish_capture(id, flight, completion, corrector, context));
        let (image, resolved_settings) = processing.await??;

        info!(%id, width = image.width(), height = image.height(), "Photo ready");
        Ok(CapturedPhoto {
            id,
            image,
            resolved_settings,
            device_orientation_at_capture: device_orientation,
            camera_position: device.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{DeviceCapabilities, DeviceId, LensType};

    fn device(max_still: Option<Resolution>) -> CaptureDevice {
        CaptureDevice {
            id: DeviceId::new("wide"),
            name: "Wide".into(),
            position: CameraPosition::Back,
            lens_type: LensType::Wide,
            capabilities: DeviceCapabilities {
                max_still_resolution: max_still,
                ..DeviceCapabilities::default()
            },
        }
    }

    #[test]
    fn test_resolution_order() {
        let fallback = Resolution::FALLBACK;
        let max = Some(Resolution::new(4000, 3000));
        let explicit = Some(Resolution::new(640, 480));

        assert_eq!(
            resolve_target_resolution(explicit, &device(max), fallback),
            Resolution::new(640, 480)
        );
        assert_eq!(
            resolve_target_resolution(None, &device(max), fallback),
            Resolution::new(4000, 3000)
        );
        assert_eq!(
            resolve_target_resolution(None, &device(None), fallback),
            Resolution::new(4032, 3024)
        );
        assert_eq!(
            resolve_target_resolution(Some(Resolution::new(0, 0)), &device(None), fallback),
            fallback
        );
    }

    #[test]
    fn test_in_flight_guard() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert_eq!(
            InFlightGuard::acquire(&flag).err(),
            Some(CaptureError::CaptureInFlight)
        );
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_ok());
    }
}

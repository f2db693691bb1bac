// SPDX-License-Identifier: GPL-3.0-only

//! Post-capture photo pipeline
//!
//! ```text
//! RawPhoto (encoded) → decode → OrientationCorrector → RgbaImage → encode/save
//! ```
//!
//! Decode and correction are CPU-bound and run on blocking workers; the
//! live preview is never touched.

pub mod encoding;
pub mod orientation;

pub use encoding::{EncodingFormat, EncodingQuality, PhotoEncoder};
pub use orientation::{OrientationContext, OrientationCorrector};

use crate::backends::camera::RawPhoto;
use crate::errors::{CaptureError, CaptureResult};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Aspect ratio of the corrected output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    FourThree,
    Square,
    SixteenNine,
}

impl AspectRatio {
    /// Long edge over short edge
    pub fn value(self) -> f32 {
        match self {
            AspectRatio::FourThree => 4.0 / 3.0,
            AspectRatio::Square => 1.0,
            AspectRatio::SixteenNine => 16.0 / 9.0,
        }
    }

    /// Index used by the settings store
    pub fn index(self) -> i64 {
        match self {
            AspectRatio::FourThree => 0,
            AspectRatio::Square => 1,
            AspectRatio::SixteenNine => 2,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            1 => AspectRatio::Square,
            2 => AspectRatio::SixteenNine,
            _ => AspectRatio::FourThree,
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AspectRatio::FourThree => write!(f, "4:3"),
            AspectRatio::Square => write!(f, "1:1"),
            AspectRatio::SixteenNine => write!(f, "16:9"),
        }
    }
}

/// Decode the hardware buffer into RGBA pixels
///
/// An empty or undecodable buffer is `CaptureDataUnavailable`.
pub fn decode(raw: &RawPhoto) -> CaptureResult<RgbaImage> {
    if raw.data.is_empty() {
        warn!("Capture returned an empty buffer");
        return Err(CaptureError::CaptureDataUnavailable);
    }
    let image = image::load_from_memory(&raw.data).map_err(|e| {
        warn!(error = %e, bytes = raw.data.len(), "Failed to decode capture");
        CaptureError::CaptureDataUnavailable
    })?;
    let image = image.to_rgba8();
    debug!(width = image.width(), height = image.height(), "Decoded capture");
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{ExifOrientation, ResolvedPhotoSettings, Resolution};
    use crate::backends::camera::{ExposureMode, FlashMode};
    use std::time::Duration;

    fn raw(data: Vec<u8>) -> RawPhoto {
        RawPhoto {
            data,
            exif_orientation: ExifOrientation::Up,
            resolved_settings: ResolvedPhotoSettings {
                resolution: Resolution::new(8, 6),
                flash_mode: FlashMode::Off,
                stabilization_enabled: false,
                exposure_mode: ExposureMode::ContinuousAuto,
                exposure_duration: Duration::from_millis(10),
                iso: 100.0,
            },
        }
    }

    #[test]
    fn test_empty_buffer_is_unavailable() {
        assert_eq!(decode(&raw(Vec::new())), Err(CaptureError::CaptureDataUnavailable));
    }

    #[test]
    fn test_garbage_is_unavailable() {
        assert_eq!(
            decode(&raw(vec![1, 2, 3, 4])),
            Err(CaptureError::CaptureDataUnavailable)
        );
    }

    #[test]
    fn test_decode_png() {
        let mut data = Vec::new();
        RgbaImage::new(8, 6)
            .write_to(&mut std::io::Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        let image = decode(&raw(data)).unwrap();
        assert_eq!(image.dimensions(), (8, 6));
    }

    #[test]
    fn test_aspect_ratio_index() {
        assert_eq!(AspectRatio::from_index(2), AspectRatio::SixteenNine);
        assert_eq!(AspectRatio::from_index(-1), AspectRatio::FourThree);
        assert_eq!(AspectRatio::Square.value(), 1.0);
    }
}

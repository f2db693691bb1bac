// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding for hand-off to storage
//!
//! Encodes corrected captures to:
//! - JPEG (with quality control)
//! - PNG (lossless)
//!
//! Encoding and disk writes run on blocking workers.

use crate::errors::{CaptureError, CaptureResult};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }
}

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingQuality {
    Low,
    Medium,
    #[default]
    High,
    Maximum,
}

impl EncodingQuality {
    /// JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// Encoder for corrected captures
#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    quality: EncodingQuality,
}

impl PhotoEncoder {
    pub fn new(format: EncodingFormat, quality: EncodingQuality) -> Self {
        Self { format, quality }
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Encode an image synchronously
    pub fn encode(&self, image: &RgbaImage) -> CaptureResult<Vec<u8>> {
        let data = match self.format {
            // JPEG has no alpha channel
            EncodingFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
                let mut buffer = Vec::new();
                let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut buffer,
                    self.quality.jpeg_quality(),
                );
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| CaptureError::Processing(format!("JPEG encoding failed: {}", e)))?;
                buffer
            }
            EncodingFormat::Png => {
                let mut buffer = Vec::new();
                image
                    .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
                    .map_err(|e| CaptureError::Processing(format!("PNG encoding failed: {}", e)))?;
                buffer
            }
        };
        debug!(size = data.len(), format = ?self.format, "Encoding complete");
        Ok(data)
    }

    /// Encode and write `image` into `output_dir` with a timestamped name
    pub async fn save(&self, image: RgbaImage, output_dir: &Path) -> CaptureResult<PathBuf> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("photo_{}.{}", timestamp, self.format.extension());
        let filepath = output_dir.join(filename);

        info!(path = %filepath.display(), "Saving photo");

        let encoder = *self;
        let target = filepath.clone();
        let output_dir = output_dir.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let data = encoder.encode(&image)?;
            std::fs::create_dir_all(&output_dir)
                .and_then(|_| std::fs::write(&target, &data))
                .map_err(|e| CaptureError::Processing(format!("Failed to save photo: {}", e)))
        })
        .await??;

        info!(path = %filepath.display(), "Photo saved successfully");
        Ok(filepath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
    }

    #[test]
    fn test_jpeg_drops_alpha_and_decodes() {
        let image = RgbaImage::from_pixel(16, 8, Rgba([10, 20, 30, 128]));
        let data = PhotoEncoder::default().encode(&image).unwrap();
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[tokio::test]
    async fn test_save_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = PhotoEncoder::new(EncodingFormat::Png, EncodingQuality::High);
        let path = encoder
            .save(RgbaImage::new(4, 4), &dir.path().join("camera"))
            .await
            .unwrap();
        assert!(path.exists());
        assert!(
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("photo_") && name.ends_with(".png"))
        );
    }
}

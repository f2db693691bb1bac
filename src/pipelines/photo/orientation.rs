// SPDX-License-Identifier: GPL-3.0-only

//! Orientation-correct crop/rotate/mirror of captured stills
//!
//! The corrector reconciles three orientation sources into one transform:
//!
//! ```text
//! EXIF orientation ──┐
//!                    ├─▶ quarter turns k ──┐
//! device orientation ┘                     ├─▶ letterboxed canvas
//! target aspect ratio ──▶ canvas size ─────┘
//! ```
//!
//! Rotation is in quarter turns, clockwise positive in image (y-down)
//! coordinates. Mirroring flips the finished canvas horizontally.

use crate::backends::camera::{DeviceOrientation, ExifOrientation};
use crate::constants::photo::LONG_EDGE_BUDGET;
use image::{Rgba, RgbaImage};
use tracing::debug;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Everything the corrector needs besides the pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationContext {
    pub exif_orientation: ExifOrientation,
    pub device_orientation: DeviceOrientation,
    /// Long edge over short edge; values below 1 are inverted
    pub target_aspect_ratio: f32,
    /// Caller-requested horizontal mirror (front camera)
    pub mirrored: bool,
    /// Preview connection orientation, used when the device lies flat
    pub preview_orientation: Option<DeviceOrientation>,
}

impl OrientationContext {
    /// Orientation used for the transform
    ///
    /// Face-up and face-down carry no rotation, so they defer to the
    /// preview connection and otherwise to portrait.
    pub fn effective_orientation(&self) -> DeviceOrientation {
        if !self.device_orientation.is_flat() {
            return self.device_orientation;
        }
        self.preview_orientation
            .filter(|orientation| !orientation.is_flat())
            .unwrap_or(DeviceOrientation::Portrait)
    }

    /// Net quarter turns to apply, in `0..4`
    pub fn quarter_turns(&self) -> u8 {
        (exif_quarter_turns(self.exif_orientation)
            + device_quarter_turns(self.effective_orientation()))
            % 4
    }

    /// The two mirror flags are independent and cancel when both set
    pub fn is_mirrored(&self) -> bool {
        self.mirrored ^ self.exif_orientation.is_mirrored()
    }

    fn aspect_ratio(&self) -> f32 {
        let ratio = self.target_aspect_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return 4.0 / 3.0;
        }
        ratio.max(1.0 / ratio)
    }
}

/// up = 0, down = pi, left = +pi/2, right = -pi/2
fn exif_quarter_turns(orientation: ExifOrientation) -> u8 {
    match orientation {
        ExifOrientation::Up | ExifOrientation::UpMirrored => 0,
        ExifOrientation::Left | ExifOrientation::LeftMirrored => 1,
        ExifOrientation::Down | ExifOrientation::DownMirrored => 2,
        ExifOrientation::Right | ExifOrientation::RightMirrored => 3,
    }
}

/// portrait = +pi/2, upside down = +3pi/2, landscape left = pi, landscape right = 0
fn device_quarter_turns(orientation: DeviceOrientation) -> u8 {
    match orientation {
        DeviceOrientation::LandscapeRight => 0,
        DeviceOrientation::Portrait | DeviceOrientation::FaceUp | DeviceOrientation::FaceDown => 1,
        DeviceOrientation::LandscapeLeft => 2,
        DeviceOrientation::PortraitUpsideDown => 3,
    }
}

/// Stateless post-capture transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationCorrector {
    long_edge: u32,
}

impl OrientationCorrector {
    pub fn new(long_edge: u32) -> Self {
        Self {
            long_edge: long_edge.max(1),
        }
    }

    /// Output canvas size for a context
    pub fn canvas_size(&self, ctx: &OrientationContext) -> (u32, u32) {
        let long = self.long_edge;
        let short = ((long as f32 / ctx.aspect_ratio()).round() as u32).max(1);
        if ctx.effective_orientation().is_landscape() {
            (long, short)
        } else {
            (short, long)
        }
    }

    /// Produce the upright, letterboxed, optionally mirrored image
    pub fn correct(&self, image: &RgbaImage, ctx: &OrientationContext) -> RgbaImage {
        let (cw, ch) = self.canvas_size(ctx);
        let mut canvas = RgbaImage::from_pixel(cw, ch, BLACK);

        let (sw, sh) = image.dimensions();
        if sw == 0 || sh == 0 {
            return canvas;
        }

        let turns = ctx.quarter_turns();
        let mirrored = ctx.is_mirrored();
        let (rw, rh) = if turns % 2 == 1 {
            (sh as f64, sw as f64)
        } else {
            (sw as f64, sh as f64)
        };
        let (sw_f, sh_f) = (sw as f64, sh as f64);

        let scale = (cw as f64 / rw).min(ch as f64 / rh);
        let ox = (cw as f64 - rw * scale) / 2.0;
        let oy = (ch as f64 - rh * scale) / 2.0;

        debug!(
            source = ?(sw, sh),
            canvas = ?(cw, ch),
            turns,
            mirrored,
            "Correcting capture orientation"
        );

        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let dx = if mirrored { cw - 1 - x } else { x };
            let u = (dx as f64 + 0.5 - ox) / scale;
            let v = (y as f64 + 0.5 - oy) / scale;
            if u < 0.0 || v < 0.0 || u >= rw || v >= rh {
                continue;
            }

            let (sx, sy) = match turns {
                0 => (u, v),
                1 => (v, sh_f - u),
                2 => (sw_f - u, sh_f - v),
                _ => (sw_f - v, u),
            };
            let sx = (sx.floor() as u32).min(sw - 1);
            let sy = (sy.floor() as u32).min(sh - 1);
            *pixel = *image.get_pixel(sx, sy);
        }

        canvas
    }
}

impl Default for OrientationCorrector {
    fn default() -> Self {
        Self::new(LONG_EDGE_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(device: DeviceOrientation, mirrored: bool) -> OrientationContext {
        OrientationContext {
            exif_orientation: ExifOrientation::Up,
            device_orientation: device,
            target_aspect_ratio: 4.0 / 3.0,
            mirrored,
            preview_orientation: None,
        }
    }

    /// 4x3 landscape source with a unique colour per pixel
    fn source() -> RgbaImage {
        RgbaImage::from_fn(4, 3, |x, y| Rgba([(x * 60) as u8, (y * 100) as u8, 7, 255]))
    }

    #[test]
    fn test_portrait_canvas_matches_ratio() {
        let corrector = OrientationCorrector::new(1920);
        let ctx = context(DeviceOrientation::Portrait, false);
        assert_eq!(corrector.canvas_size(&ctx), (1440, 1920));

        let out = corrector.correct(&source(), &ctx);
        let ratio = out.height() as f32 / out.width() as f32;
        assert!((ratio - 4.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_landscape_canvas() {
        let corrector = OrientationCorrector::new(1920);
        let ctx = context(DeviceOrientation::LandscapeRight, false);
        assert_eq!(corrector.canvas_size(&ctx), (1920, 1440));
    }

    #[test]
    fn test_inverted_ratio_is_normalised() {
        let corrector = OrientationCorrector::new(1600);
        let mut ctx = context(DeviceOrientation::LandscapeRight, false);
        ctx.target_aspect_ratio = 9.0 / 16.0;
        assert_eq!(corrector.canvas_size(&ctx), (1600, 900));
    }

    #[test]
    fn test_landscape_right_is_identity() {
        let corrector = OrientationCorrector::new(4);
        let ctx = context(DeviceOrientation::LandscapeRight, false);
        let src = source();
        let out = corrector.correct(&src, &ctx);
        assert_eq!(out.dimensions(), (4, 3));
        assert_eq!(out, src);
    }

    #[test]
    fn test_portrait_rotates_clockwise() {
        let corrector = OrientationCorrector::new(4);
        let ctx = context(DeviceOrientation::Portrait, false);
        let src = source();
        let out = corrector.correct(&src, &ctx);
        assert_eq!(out.dimensions(), (3, 4));
        // Clockwise: the source's bottom-left lands top-left
        assert_eq!(out.get_pixel(0, 0), src.get_pixel(0, 2));
        assert_eq!(out.get_pixel(2, 0), src.get_pixel(0, 0));
        assert_eq!(out.get_pixel(2, 3), src.get_pixel(3, 0));
    }

    #[test]
    fn test_mirror_flips_horizontally() {
        let corrector = OrientationCorrector::new(64);
        let src = RgbaImage::from_fn(40, 30, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let plain = corrector.correct(&src, &context(DeviceOrientation::Portrait, false));
        let flipped = corrector.correct(&src, &context(DeviceOrientation::Portrait, true));
        assert_eq!(flipped, image::imageops::flip_horizontal(&plain));
    }

    #[test]
    fn test_mirror_flags_cancel() {
        let corrector = OrientationCorrector::new(32);
        let src = source();
        let plain = corrector.correct(&src, &context(DeviceOrientation::Portrait, false));
        let mut both = context(DeviceOrientation::Portrait, true);
        both.exif_orientation = ExifOrientation::UpMirrored;
        assert_eq!(corrector.correct(&src, &both), plain);
    }

    #[test]
    fn test_letterbox_is_black() {
        let corrector = OrientationCorrector::new(64);
        let src = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let out = corrector.correct(&src, &context(DeviceOrientation::Portrait, false));
        assert_eq!(out.dimensions(), (48, 64));
        assert_eq!(*out.get_pixel(24, 0), BLACK);
        assert_eq!(*out.get_pixel(24, 32), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_face_up_uses_preview_orientation() {
        let mut ctx = context(DeviceOrientation::FaceUp, false);
        assert_eq!(ctx.effective_orientation(), DeviceOrientation::Portrait);
        ctx.preview_orientation = Some(DeviceOrientation::LandscapeLeft);
        assert_eq!(ctx.effective_orientation(), DeviceOrientation::LandscapeLeft);
        ctx.preview_orientation = Some(DeviceOrientation::FaceDown);
        assert_eq!(ctx.effective_orientation(), DeviceOrientation::Portrait);
    }

    #[test]
    fn test_quarter_turn_sum() {
        let mut ctx = context(DeviceOrientation::Portrait, false);
        assert_eq!(ctx.quarter_turns(), 1);
        ctx.exif_orientation = ExifOrientation::Right;
        assert_eq!(ctx.quarter_turns(), 0);
        ctx.exif_orientation = ExifOrientation::Down;
        ctx.device_orientation = DeviceOrientation::LandscapeLeft;
        assert_eq!(ctx.quarter_turns(), 0);
    }

    #[test]
    fn test_deterministic() {
        let corrector = OrientationCorrector::new(50);
        let ctx = context(DeviceOrientation::PortraitUpsideDown, true);
        let src = source();
        assert_eq!(corrector.correct(&src, &ctx), corrector.correct(&src, &ctx));
    }
}

// SPDX-License-Identifier: GPL-3.0-only
// Shared types for the capture platform abstraction

//! Shared types for capture backends

use crate::constants::photo::{FALLBACK_HEIGHT, FALLBACK_WIDTH};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;

/// Which side of the device a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraPosition {
    Front,
    #[default]
    Back,
}

impl CameraPosition {
    /// The other position
    pub fn opposite(self) -> Self {
        match self {
            CameraPosition::Front => CameraPosition::Back,
            CameraPosition::Back => CameraPosition::Front,
        }
    }
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::Back => write!(f, "back"),
        }
    }
}

/// Physical lens of a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LensType {
    UltraWide,
    Wide,
    Telephoto,
}

impl LensType {
    /// Lens preference order used when offering lenses to the UI
    pub const PREFERENCE_ORDER: [LensType; 3] =
        [LensType::UltraWide, LensType::Wide, LensType::Telephoto];

    /// Position of this lens in [`Self::PREFERENCE_ORDER`]
    pub fn preference_rank(self) -> usize {
        match self {
            LensType::UltraWide => 0,
            LensType::Wide => 1,
            LensType::Telephoto => 2,
        }
    }
}

impl std::fmt::Display for LensType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensType::UltraWide => write!(f, "ultra-wide"),
            LensType::Wide => write!(f, "wide"),
            LensType::Telephoto => write!(f, "telephoto"),
        }
    }
}

/// Media type requested from device discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
}

/// Stable identifier of a capture device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive range reported by the hardware
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> ValueRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Clamp a value into the range
    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Used when neither the request nor the device provides a still size
    pub const FALLBACK: Resolution = Resolution {
        width: FALLBACK_WIDTH,
        height: FALLBACK_HEIGHT,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Hardware focus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFocusMode {
    /// Single-shot autofocus
    AutoFocus,
    ContinuousAutoFocus,
    Locked,
}

/// Hardware exposure mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExposureMode {
    #[default]
    ContinuousAuto,
    /// Manual duration and ISO
    Custom,
    Locked,
}

/// Hardware white balance mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WhiteBalanceMode {
    #[default]
    ContinuousAuto,
    Locked,
}

/// Per-channel white balance gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalanceGains {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl WhiteBalanceGains {
    pub const UNITY: WhiteBalanceGains = WhiteBalanceGains {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };

    /// Clamp each channel into `[min, max]`
    pub fn clamped(self, min: f32, max: f32) -> Self {
        Self {
            red: self.red.clamp(min, max),
            green: self.green.clamp(min, max),
            blue: self.blue.clamp(min, max),
        }
    }
}

/// Colour temperature (Kelvin) and tint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureAndTint {
    pub temperature: f32,
    pub tint: f32,
}

/// Normalised point in sensor space, `(0,0)` top-left to `(1,1)` bottom-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointOfInterest {
    pub x: f64,
    pub y: f64,
}

impl PointOfInterest {
    pub const CENTER: PointOfInterest = PointOfInterest { x: 0.5, y: 0.5 };

    /// Create a point, clamping both coordinates into `[0, 1]`
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

/// Flash behaviour for still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
}

impl FlashMode {
    /// Cycle to the next mode: Off -> On -> Auto -> Off
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Auto,
            FlashMode::Auto => FlashMode::Off,
        }
    }

    /// Index used by the settings store
    pub fn index(self) -> i64 {
        match self {
            FlashMode::Off => 0,
            FlashMode::On => 1,
            FlashMode::Auto => 2,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            1 => FlashMode::On,
            2 => FlashMode::Auto,
            _ => FlashMode::Off,
        }
    }
}

/// Static capabilities of a capture device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCapabilities {
    pub zoom_range: ValueRange<f64>,
    pub iso_range: ValueRange<f32>,
    pub exposure_bias_range: ValueRange<f32>,
    pub shutter_duration_range: ValueRange<Duration>,
    pub has_flash: bool,
    pub supports_stabilization: bool,
    /// Largest still-image size the device produces
    pub max_still_resolution: Option<Resolution>,
    pub supports_focus_point_of_interest: bool,
    pub supports_exposure_point_of_interest: bool,
    pub focus_modes: Vec<DeviceFocusMode>,
    pub exposure_modes: Vec<ExposureMode>,
    pub white_balance_modes: Vec<WhiteBalanceMode>,
    pub max_white_balance_gain: f32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            zoom_range: ValueRange::new(1.0, 16.0),
            iso_range: ValueRange::new(32.0, 3072.0),
            exposure_bias_range: ValueRange::new(-8.0, 8.0),
            shutter_duration_range: ValueRange::new(
                Duration::from_micros(14),
                Duration::from_secs(1),
            ),
            has_flash: false,
            supports_stabilization: true,
            max_still_resolution: None,
            supports_focus_point_of_interest: true,
            supports_exposure_point_of_interest: true,
            focus_modes: vec![
                DeviceFocusMode::AutoFocus,
                DeviceFocusMode::ContinuousAutoFocus,
                DeviceFocusMode::Locked,
            ],
            exposure_modes: vec![
                ExposureMode::ContinuousAuto,
                ExposureMode::Custom,
                ExposureMode::Locked,
            ],
            white_balance_modes: vec![WhiteBalanceMode::ContinuousAuto, WhiteBalanceMode::Locked],
            max_white_balance_gain: 4.0,
        }
    }
}

/// A physical camera as reported by enumeration
///
/// Immutable once enumerated; refreshed only by re-enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDevice {
    pub id: DeviceId,
    pub name: String,
    pub position: CameraPosition,
    pub lens_type: LensType,
    pub capabilities: DeviceCapabilities,
}

impl std::fmt::Display for CaptureDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} {}, {})",
            self.name, self.position, self.lens_type, self.id
        )
    }
}

/// Physical device orientation derived from the gravity vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    pub fn is_landscape(self) -> bool {
        matches!(
            self,
            DeviceOrientation::LandscapeLeft | DeviceOrientation::LandscapeRight
        )
    }

    /// Face up/down carry no rotation information
    pub fn is_flat(self) -> bool {
        matches!(self, DeviceOrientation::FaceUp | DeviceOrientation::FaceDown)
    }
}

/// EXIF orientation tag of a captured image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExifOrientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl ExifOrientation {
    /// Parse the numeric EXIF orientation tag (1-8)
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(ExifOrientation::Up),
            2 => Some(ExifOrientation::UpMirrored),
            3 => Some(ExifOrientation::Down),
            4 => Some(ExifOrientation::DownMirrored),
            5 => Some(ExifOrientation::LeftMirrored),
            6 => Some(ExifOrientation::Right),
            7 => Some(ExifOrientation::RightMirrored),
            8 => Some(ExifOrientation::Left),
            _ => None,
        }
    }

    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            ExifOrientation::UpMirrored
                | ExifOrientation::DownMirrored
                | ExifOrientation::LeftMirrored
                | ExifOrientation::RightMirrored
        )
    }
}

/// Settings handed to the hardware for one still capture
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSettings {
    pub flash_mode: FlashMode,
    pub stabilization_enabled: bool,
    pub high_resolution_enabled: bool,
    pub resolution: Resolution,
}

/// What the hardware actually applied for a capture
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPhotoSettings {
    pub resolution: Resolution,
    pub flash_mode: FlashMode,
    pub stabilization_enabled: bool,
    pub exposure_mode: ExposureMode,
    pub exposure_duration: Duration,
    pub iso: f32,
}

/// Encoded photo data returned by the hardware
#[derive(Debug, Clone)]
pub struct RawPhoto {
    /// Encoded image file data (JPEG, PNG, ...)
    pub data: Vec<u8>,
    pub exif_orientation: ExifOrientation,
    pub resolved_settings: ResolvedPhotoSettings,
}

/// Acknowledgement that a custom exposure has been applied by the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureAck {
    pub duration: Duration,
    pub iso: f32,
}

/// Completion of an asynchronous still capture
pub type PhotoCompletion = oneshot::Receiver<BackendResult<RawPhoto>>;

/// Completion of an asynchronous custom-exposure change
pub type ExposureCompletion = oneshot::Receiver<ExposureAck>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Camera device not found
    DeviceNotFound(String),
    /// The pipeline refused an input
    InputRefused(String),
    /// Exclusive configuration access refused
    LockFailed(String),
    /// Capability not present on the device
    Unsupported(String),
    /// Operation needs a running session
    NotRunning,
    /// Still capture failed in hardware
    CaptureFailed(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::InputRefused(msg) => write!(f, "Input refused: {}", msg),
            BackendError::LockFailed(msg) => write!(f, "Lock failed: {}", msg),
            BackendError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            BackendError::NotRunning => write!(f, "Session not running"),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

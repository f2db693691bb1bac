// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture session controller

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors surfaced by the session controller
///
/// None of these are fatal: the session stays usable after any single
/// operation fails.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// No physical device matches the requested type/position
    DeviceNotFound(String),
    /// The platform refused to add a validly-found input
    DeviceNotAddable(String),
    /// Exclusive device access could not be acquired
    ConfigurationLockFailed(String),
    /// The device lacks the requested capability
    UnsupportedMode(String),
    /// Requested lens/position combination is not in the current device list
    LensNotAvailable(String),
    /// Hardware returned no usable image buffer
    CaptureDataUnavailable,
    /// A second capture was requested before the first completed
    CaptureInFlight,
    /// Hardware reported an error instead of a photo
    CaptureFailed(String),
    /// A background processing task failed
    Processing(String),
}

impl CaptureError {
    /// Human-readable reason suitable for a toast or alert
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::DeviceNotFound(_) => "Camera not available".to_string(),
            CaptureError::DeviceNotAddable(_) => "Camera is in use".to_string(),
            CaptureError::ConfigurationLockFailed(_) => "Camera is busy".to_string(),
            CaptureError::UnsupportedMode(mode) => {
                format!("Device does not support {}", mode)
            }
            CaptureError::LensNotAvailable(_) => "Lens not available".to_string(),
            CaptureError::CaptureDataUnavailable => "Cannot get photo data".to_string(),
            CaptureError::CaptureInFlight => "A photo is already being taken".to_string(),
            CaptureError::CaptureFailed(_) | CaptureError::Processing(_) => {
                "Failed to take photo".to_string()
            }
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            CaptureError::DeviceNotAddable(msg) => write!(f, "Device not addable: {}", msg),
            CaptureError::ConfigurationLockFailed(msg) => {
                write!(f, "Configuration lock failed: {}", msg)
            }
            CaptureError::UnsupportedMode(msg) => write!(f, "Unsupported mode: {}", msg),
            CaptureError::LensNotAvailable(msg) => write!(f, "Lens not available: {}", msg),
            CaptureError::CaptureDataUnavailable => write!(f, "Capture data unavailable"),
            CaptureError::CaptureInFlight => write!(f, "Capture already in progress"),
            CaptureError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            CaptureError::Processing(msg) => write!(f, "Processing failed: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(msg) => CaptureError::DeviceNotFound(msg),
            BackendError::InputRefused(msg) => CaptureError::DeviceNotAddable(msg),
            BackendError::LockFailed(msg) => CaptureError::ConfigurationLockFailed(msg),
            BackendError::Unsupported(msg) => CaptureError::UnsupportedMode(msg),
            BackendError::NotRunning => {
                CaptureError::CaptureFailed("session is not running".to_string())
            }
            BackendError::CaptureFailed(msg) => CaptureError::CaptureFailed(msg),
        }
    }
}

impl From<tokio::task::JoinError> for CaptureError {
    fn from(err: tokio::task::JoinError) -> Self {
        CaptureError::Processing(err.to_string())
    }
}

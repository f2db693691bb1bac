// SPDX-License-Identifier: GPL-3.0-only

//! Camera Core - capture-device session controller
//!
//! This library owns the physical camera devices of a phone-style camera
//! stack, serialises hardware reconfiguration against the live pipeline,
//! runs the focus and exposure state machines and performs the
//! orientation-correct post-capture transform.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Platform traits, session core, lens switching and a virtual platform
//! - [`controller`]: The [`CaptureController`] façade
//! - [`pipelines`]: Decode, orientation correction and encoding of stills
//! - [`settings`]: Injected settings store
//! - [`config`]: Tunables
//!
//! # Example
//!
//! ```no_run
//! use camera_core::backends::virtual_camera::{VirtualMotion, VirtualPlatform};
//! use camera_core::settings::MemorySettings;
//! use camera_core::{CaptureController, CaptureRequest, Config};
//! use std::sync::Arc;
//!
//! # async fn run() -> camera_core::CaptureResult<()> {
//! let controller = CaptureController::new(
//!     Arc::new(VirtualPlatform::phone()),
//!     Arc::new(VirtualMotion::new()),
//!     Arc::new(MemorySettings::new()),
//!     Config::default(),
//! )?;
//! controller.setup().await?;
//! controller.start().await?;
//! let photo = controller.capture(CaptureRequest::default()).await?;
//! println!("{}x{}", photo.image.width(), photo.image.height());
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod controller;
pub mod errors;
pub mod pipelines;
pub mod settings;

// Re-export commonly used types
pub use config::Config;
pub use controller::{
    CaptureController, CaptureRequest, CapturedPhoto, FocusMode, FocusState, SessionEvent,
    WhiteBalancePreset,
};
pub use errors::{CaptureError, CaptureResult};
pub use pipelines::photo::{AspectRatio, OrientationContext, OrientationCorrector};

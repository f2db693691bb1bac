// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines for captured media
//!
//! Heavy operations run in background tasks so the live preview and the
//! configuration queue are never blocked by pixel work.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────────┐     ┌──────────────┐
//! │  RawPhoto    │ ──▶ │  Photo Pipeline        │ ──▶ │ CapturedPhoto│
//! │ (encoded)    │     │  - decode              │     │  (RGBA)      │
//! │              │     │  - rotate/mirror/crop  │     │              │
//! └──────────────┘     └────────────────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: Decode, orientation correction and encoding

pub mod photo;

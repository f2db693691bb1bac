// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for capture hardware
//!
//! This module provides the platform seam for:
//! - Capture devices, the capture pipeline and device locking
//! - Motion sensing for device orientation
//! - A virtual platform for tests and headless runs
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Controller Layer                │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │               Backend Layer                  │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │   Motion    │    │     Camera       │    │
//! │  └─────────────┘    └──────────────────┘    │
//! │                     ┌──────────────────┐    │
//! │                     │ Virtual Camera   │    │
//! │                     └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Platform traits, session core, transactions and lenses
//! - [`motion`]: Gravity samples for orientation tracking
//! - [`virtual_camera`]: In-process simulated platform

pub mod camera;
pub mod motion;
pub mod virtual_camera;

// SPDX-License-Identifier: GPL-3.0-only

//! Motion sensor abstraction

use std::time::Duration;
use tokio::sync::mpsc;

/// Gravity vector in device coordinates, in units of g
///
/// `x` points right, `y` points up along the long edge and `z` out of the
/// screen, so a phone held upright reads roughly `(0, -1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GravityVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GravityVector {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A source of periodic gravity samples
pub trait MotionSource: Send + Sync {
    /// Begin sampling every `interval`; samples arrive on the returned channel
    /// until [`Self::stop_updates`] is called or the receiver is dropped
    fn start_updates(&self, interval: Duration) -> mpsc::Receiver<GravityVector>;

    fn stop_updates(&self);
}

// SPDX-License-Identifier: GPL-3.0-only

//! Simulated accelerometer

use crate::backends::camera::lock_unpoisoned;
use crate::backends::motion::{GravityVector, MotionSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Emits the current gravity vector at the requested interval
///
/// Must be started from within a tokio runtime.
#[derive(Default)]
pub struct VirtualMotion {
    gravity: Arc<Mutex<GravityVector>>,
    active: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl VirtualMotion {
    /// Motion source reporting an upright portrait device
    pub fn new() -> Self {
        let motion = Self::default();
        motion.set_gravity(GravityVector::new(0.0, -1.0, 0.0));
        motion
    }

    /// Change the gravity vector reported by subsequent samples
    pub fn set_gravity(&self, gravity: GravityVector) {
        *lock_unpoisoned(&self.gravity) = gravity;
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl MotionSource for VirtualMotion {
    fn start_updates(&self, interval: Duration) -> mpsc::Receiver<GravityVector> {
        self.stop_updates();

        let (tx, rx) = mpsc::channel(16);
        let gravity = Arc::clone(&self.gravity);
        let active = Arc::clone(&self.active);
        active.store(true, Ordering::SeqCst);
        debug!(?interval, "Virtual motion updates started");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let sample = *lock_unpoisoned(&gravity);
                if tx.send(sample).await.is_err() {
                    break;
                }
            }
            active.store(false, Ordering::SeqCst);
        });
        *lock_unpoisoned(&self.task) = Some(handle);
        rx
    }

    fn stop_updates(&self) {
        if let Some(handle) = lock_unpoisoned(&self.task).take() {
            handle.abort();
            debug!("Virtual motion updates stopped");
        }
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Drop for VirtualMotion {
    fn drop(&mut self) {
        self.stop_updates();
    }
}

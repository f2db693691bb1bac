// SPDX-License-Identifier: GPL-3.0-only

//! Device-orientation tracking from the motion sensor

use crate::backends::camera::{DeviceOrientation, lock_unpoisoned};
use crate::backends::motion::{GravityVector, MotionSource};
use crate::constants::orientation::{FLAT_THRESHOLD, LANDSCAPE_THRESHOLD};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Classify a gravity sample into one of the six physical orientations
pub fn classify(gravity: GravityVector) -> DeviceOrientation {
    if gravity.z.abs() > FLAT_THRESHOLD {
        if gravity.z < 0.0 {
            DeviceOrientation::FaceUp
        } else {
            DeviceOrientation::FaceDown
        }
    } else if gravity.y.abs() < LANDSCAPE_THRESHOLD {
        if gravity.x < 0.0 {
            DeviceOrientation::LandscapeLeft
        } else {
            DeviceOrientation::LandscapeRight
        }
    } else if gravity.y > 0.0 {
        DeviceOrientation::PortraitUpsideDown
    } else {
        DeviceOrientation::Portrait
    }
}

/// Publishes orientation changes derived from a [`MotionSource`]
///
/// The sensor subscription lives while updates are started and is
/// released by [`Self::stop`] or on drop.
pub struct OrientationTracker {
    motion: Arc<dyn MotionSource>,
    interval: Duration,
    sender: Arc<watch::Sender<DeviceOrientation>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OrientationTracker {
    pub fn new(motion: Arc<dyn MotionSource>, interval: Duration) -> Self {
        let (sender, _) = watch::channel(DeviceOrientation::default());
        Self {
            motion,
            interval,
            sender: Arc::new(sender),
            task: Mutex::new(None),
        }
    }

    /// Start sampling; no-op if already running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut task = lock_unpoisoned(&self.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Orientation updates already running");
            return;
        }

        info!(interval = ?self.interval, "Starting orientation updates");
        let mut samples = self.motion.start_updates(self.interval);
        let sender = Arc::clone(&self.sender);
        *task = Some(tokio::spawn(async move {
            while let Some(gravity) = samples.recv().await {
                let orientation = classify(gravity);
                sender.send_if_modified(|current| {
                    if *current == orientation {
                        return false;
                    }
                    debug!(from = ?*current, to = ?orientation, "Device orientation changed");
                    *current = orientation;
                    true
                });
            }
        }));
    }

    /// Stop sampling and release the sensor subscription
    pub fn stop(&self) {
        if let Some(handle) = lock_unpoisoned(&self.task).take() {
            handle.abort();
            self.motion.stop_updates();
            info!("Stopped orientation updates");
        }
    }

    pub fn is_running(&self) -> bool {
        lock_unpoisoned(&self.task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Last published orientation
    pub fn current(&self) -> DeviceOrientation {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceOrientation> {
        self.sender.subscribe()
    }
}

impl Drop for OrientationTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

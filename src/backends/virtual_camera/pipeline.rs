// SPDX-License-Identifier: GPL-3.0-only

//! Simulated capture pipeline
//!
//! Accepts a single video input at a time. Still captures complete on a
//! worker thread after the configured delay and deliver a JPEG test
//! pattern at the requested resolution.

use super::{Shared, VirtualDevice};
use crate::backends::camera::types::*;
use crate::backends::camera::{CapturePipeline, DeviceControl, lock_unpoisoned};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Virtual capture pipeline
pub struct VirtualPipeline {
    shared: Arc<Shared>,
    inputs: Vec<Arc<VirtualDevice>>,
    configuring: bool,
    photo_output: bool,
    running: bool,
}

impl VirtualPipeline {
    pub(super) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            inputs: Vec::new(),
            configuring: false,
            photo_output: false,
            running: false,
        }
    }

    /// Outside a configuration block every change is published immediately
    fn publish_if_live(&self) {
        if !self.configuring {
            self.publish();
        }
    }

    fn publish(&self) {
        let ids = self
            .inputs
            .iter()
            .map(|input| input.device().id.clone())
            .collect();
        self.shared.recorder.record_commit(ids);
    }
}

impl CapturePipeline for VirtualPipeline {
    fn begin_configuration(&mut self) {
        self.configuring = true;
    }

    fn commit_configuration(&mut self) {
        self.configuring = false;
        self.publish();
    }

    fn inputs(&self) -> Vec<Arc<dyn DeviceControl>> {
        self.inputs
            .iter()
            .map(|input| Arc::clone(input) as Arc<dyn DeviceControl>)
            .collect()
    }

    fn can_add_input(&self, device: &CaptureDevice) -> bool {
        self.inputs.is_empty() && !self.shared.faults.is_refused(&device.id)
    }

    fn add_input(&mut self, device: &CaptureDevice) -> BackendResult<Arc<dyn DeviceControl>> {
        if self.shared.faults.is_refused(&device.id) {
            return Err(BackendError::InputRefused(device.name.clone()));
        }
        let delay = self.shared.faults.input_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let control = self.shared.control(device);
        self.inputs.push(Arc::clone(&control));
        debug!(device = %device.id, "Virtual input attached");
        self.publish_if_live();
        Ok(control)
    }

    fn remove_input(&mut self, id: &DeviceId) {
        self.inputs.retain(|input| &input.device().id != id);
        self.publish_if_live();
    }

    fn has_photo_output(&self) -> bool {
        self.photo_output
    }

    fn add_photo_output(&mut self) -> BackendResult<()> {
        self.photo_output = true;
        Ok(())
    }

    fn start_running(&mut self) {
        info!("Virtual pipeline running");
        self.running = true;
    }

    fn stop_running(&mut self) {
        info!("Virtual pipeline stopped");
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn preview_orientation(&self) -> Option<DeviceOrientation> {
        *lock_unpoisoned(&self.shared.preview_orientation)
    }

    fn capture_photo(&mut self, settings: &PhotoSettings) -> BackendResult<PhotoCompletion> {
        if !self.photo_output {
            return Err(BackendError::Unsupported("no photo output".into()));
        }
        if !self.running {
            return Err(BackendError::NotRunning);
        }
        let Some(input) = self.inputs.first() else {
            return Err(BackendError::DeviceNotFound("no video input".into()));
        };

        let capabilities = &input.device().capabilities;
        let resolved = ResolvedPhotoSettings {
            resolution: settings.resolution,
            flash_mode: if capabilities.has_flash {
                settings.flash_mode
            } else {
                FlashMode::Off
            },
            stabilization_enabled: settings.stabilization_enabled
                && capabilities.supports_stabilization,
            exposure_mode: input.exposure_mode(),
            exposure_duration: input.exposure_duration(),
            iso: input.iso(),
        };

        self.shared.recorder.record_capture();
        let faults = Arc::clone(&self.shared.faults);
        let (tx, rx) = oneshot::channel();

        std::thread::spawn(move || {
            let delay = faults.capture_delay();
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            if let Some(message) = faults.capture_error() {
                let _ = tx.send(Err(BackendError::CaptureFailed(message)));
                return;
            }

            let data = if faults.empty_capture() {
                Vec::new()
            } else {
                match encode_test_pattern(resolved.resolution) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode virtual capture");
                        let _ = tx.send(Err(BackendError::CaptureFailed(e.to_string())));
                        return;
                    }
                }
            };

            let _ = tx.send(Ok(RawPhoto {
                data,
                exif_orientation: ExifOrientation::Up,
                resolved_settings: resolved,
            }));
        });

        Ok(rx)
    }
}

/// Horizontal red and vertical green ramps, so orientation is recoverable
fn encode_test_pattern(resolution: Resolution) -> image::ImageResult<Vec<u8>> {
    let width = resolution.width.max(1);
    let height = resolution.height.max(1);
    let frame = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            128,
        ])
    });
    let mut data = Vec::new();
    frame.write_to(&mut Cursor::new(&mut data), ImageFormat::Jpeg)?;
    Ok(data)
}

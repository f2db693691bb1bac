// SPDX-License-Identifier: GPL-3.0-only

//! In-process virtual capture platform
//!
//! Simulates a phone-style camera stack (front/back, ultra-wide, wide,
//! telephoto) behind the [`CapturePlatform`] traits. Used by the CLI and
//! by the test-suite, with fault injection for refused inputs, lock
//! failures, empty capture buffers and delayed hardware acknowledgements.
//!
//! # Architecture
//!
//! ```text
//! VirtualPlatform ──create_pipeline──▶ VirtualPipeline
//!        │                                  │ add_input
//!        ▼                                  ▼
//!  VirtualFaults ◀──────────────────── VirtualDevice (DeviceControl)
//!  PipelineRecorder ◀── commit_configuration
//! ```

mod device;
mod motion;
mod pipeline;

pub use device::{VirtualDevice, VirtualDeviceState};
pub use motion::VirtualMotion;
pub use pipeline::VirtualPipeline;

use crate::backends::camera::types::*;
use crate::backends::camera::{CapturePipeline, CapturePlatform, lock_unpoisoned};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Fault switches shared by every virtual device and pipeline
#[derive(Debug, Default)]
pub struct VirtualFaults {
    refused_inputs: Mutex<HashSet<DeviceId>>,
    lock_failures: AtomicBool,
    empty_capture: AtomicBool,
    capture_error: Mutex<Option<String>>,
    capture_delay: Mutex<Duration>,
    exposure_ack_delay: Mutex<Duration>,
    input_delay: Mutex<Duration>,
}

impl VirtualFaults {
    pub fn refuse_input(&self, id: &DeviceId) {
        lock_unpoisoned(&self.refused_inputs).insert(id.clone());
    }

    pub fn accept_input(&self, id: &DeviceId) {
        lock_unpoisoned(&self.refused_inputs).remove(id);
    }

    pub fn is_refused(&self, id: &DeviceId) -> bool {
        lock_unpoisoned(&self.refused_inputs).contains(id)
    }

    /// Make every `lock_for_configuration` fail until cleared
    pub fn set_lock_failures(&self, fail: bool) {
        self.lock_failures.store(fail, Ordering::SeqCst);
    }

    pub fn lock_failures(&self) -> bool {
        self.lock_failures.load(Ordering::SeqCst)
    }

    /// Deliver captures with an empty data buffer
    pub fn set_empty_capture(&self, empty: bool) {
        self.empty_capture.store(empty, Ordering::SeqCst);
    }

    pub fn empty_capture(&self) -> bool {
        self.empty_capture.load(Ordering::SeqCst)
    }

    /// Report a hardware error for captures until cleared
    pub fn set_capture_error(&self, error: Option<String>) {
        *lock_unpoisoned(&self.capture_error) = error;
    }

    pub fn capture_error(&self) -> Option<String> {
        lock_unpoisoned(&self.capture_error).clone()
    }

    pub fn set_capture_delay(&self, delay: Duration) {
        *lock_unpoisoned(&self.capture_delay) = delay;
    }

    pub fn capture_delay(&self) -> Duration {
        *lock_unpoisoned(&self.capture_delay)
    }

    pub fn set_exposure_ack_delay(&self, delay: Duration) {
        *lock_unpoisoned(&self.exposure_ack_delay) = delay;
    }

    pub fn exposure_ack_delay(&self) -> Duration {
        *lock_unpoisoned(&self.exposure_ack_delay)
    }

    /// Block every input attach for `delay`, like slow hardware
    pub fn set_input_delay(&self, delay: Duration) {
        *lock_unpoisoned(&self.input_delay) = delay;
    }

    pub fn input_delay(&self) -> Duration {
        *lock_unpoisoned(&self.input_delay)
    }
}

/// What the simulated video pipeline has observed at commit points
#[derive(Debug, Default)]
pub struct PipelineRecorder {
    committed_inputs: Mutex<Vec<DeviceId>>,
    max_committed_inputs: AtomicUsize,
    commits: AtomicUsize,
    captures: AtomicUsize,
}

impl PipelineRecorder {
    fn record_commit(&self, inputs: Vec<DeviceId>) {
        self.max_committed_inputs
            .fetch_max(inputs.len(), Ordering::SeqCst);
        self.commits.fetch_add(1, Ordering::SeqCst);
        *lock_unpoisoned(&self.committed_inputs) = inputs;
    }

    fn record_capture(&self) {
        self.captures.fetch_add(1, Ordering::SeqCst);
    }

    /// Inputs visible to the video pipeline after the last commit
    pub fn committed_inputs(&self) -> Vec<DeviceId> {
        lock_unpoisoned(&self.committed_inputs).clone()
    }

    /// Largest input set ever visible at a commit
    pub fn max_committed_inputs(&self) -> usize {
        self.max_committed_inputs.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

struct Shared {
    devices: Vec<CaptureDevice>,
    controls: Mutex<HashMap<DeviceId, Arc<VirtualDevice>>>,
    faults: Arc<VirtualFaults>,
    recorder: Arc<PipelineRecorder>,
    preview_orientation: Mutex<Option<DeviceOrientation>>,
}

impl Shared {
    /// The persistent control handle for a device (one per device id)
    fn control(&self, device: &CaptureDevice) -> Arc<VirtualDevice> {
        let mut controls = lock_unpoisoned(&self.controls);
        Arc::clone(controls.entry(device.id.clone()).or_insert_with(|| {
            Arc::new(VirtualDevice::new(device.clone(), Arc::clone(&self.faults)))
        }))
    }
}

/// Virtual capture platform
#[derive(Clone)]
pub struct VirtualPlatform {
    shared: Arc<Shared>,
}

impl VirtualPlatform {
    /// Platform exposing exactly `devices`
    pub fn new(devices: Vec<CaptureDevice>) -> Self {
        info!(count = devices.len(), "Creating virtual capture platform");
        Self {
            shared: Arc::new(Shared {
                devices,
                controls: Mutex::new(HashMap::new()),
                faults: Arc::new(VirtualFaults::default()),
                recorder: Arc::new(PipelineRecorder::default()),
                preview_orientation: Mutex::new(Some(DeviceOrientation::Portrait)),
            }),
        }
    }

    /// Back ultra-wide/wide/telephoto plus a front wide camera
    pub fn phone() -> Self {
        Self::new(phone_devices())
    }

    pub fn devices(&self) -> &[CaptureDevice] {
        &self.shared.devices
    }

    pub fn faults(&self) -> &VirtualFaults {
        &self.shared.faults
    }

    pub fn recorder(&self) -> &PipelineRecorder {
        &self.shared.recorder
    }

    /// Control handle of a device, for inspecting simulated hardware state
    pub fn device_control(&self, id: &DeviceId) -> Option<Arc<VirtualDevice>> {
        self.shared
            .devices
            .iter()
            .find(|device| &device.id == id)
            .map(|device| self.shared.control(device))
    }

    pub fn set_preview_orientation(&self, orientation: Option<DeviceOrientation>) {
        *lock_unpoisoned(&self.shared.preview_orientation) = orientation;
    }
}

impl CapturePlatform for VirtualPlatform {
    fn discover_devices(
        &self,
        media_type: MediaType,
        position: Option<CameraPosition>,
    ) -> Vec<CaptureDevice> {
        if media_type != MediaType::Video {
            return Vec::new();
        }
        self.shared
            .devices
            .iter()
            .filter(|device| position.is_none_or(|p| device.position == p))
            .cloned()
            .collect()
    }

    fn default_device(&self, position: CameraPosition) -> Option<CaptureDevice> {
        self.shared
            .devices
            .iter()
            .find(|device| device.position == position && device.lens_type == LensType::Wide)
            .cloned()
    }

    fn create_pipeline(&self) -> Box<dyn CapturePipeline> {
        Box::new(VirtualPipeline::new(Arc::clone(&self.shared)))
    }
}

impl std::fmt::Debug for VirtualPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualPlatform")
            .field("devices", &self.shared.devices.len())
            .finish()
    }
}

/// Device set of a typical triple-camera phone
pub fn phone_devices() -> Vec<CaptureDevice> {
    let still = Some(Resolution::new(4032, 3024));
    vec![
        CaptureDevice {
            id: DeviceId::new("back-ultra-wide"),
            name: "Back Ultra Wide Camera".to_string(),
            position: CameraPosition::Back,
            lens_type: LensType::UltraWide,
            capabilities: DeviceCapabilities {
                zoom_range: ValueRange::new(1.0, 8.0),
                has_flash: true,
                max_still_resolution: still,
                supports_focus_point_of_interest: false,
                ..DeviceCapabilities::default()
            },
        },
        CaptureDevice {
            id: DeviceId::new("back-wide"),
            name: "Back Wide Camera".to_string(),
            position: CameraPosition::Back,
            lens_type: LensType::Wide,
            capabilities: DeviceCapabilities {
                zoom_range: ValueRange::new(1.0, 16.0),
                has_flash: true,
                max_still_resolution: still,
                ..DeviceCapabilities::default()
            },
        },
        CaptureDevice {
            id: DeviceId::new("back-telephoto"),
            name: "Back Telephoto Camera".to_string(),
            position: CameraPosition::Back,
            lens_type: LensType::Telephoto,
            capabilities: DeviceCapabilities {
                zoom_range: ValueRange::new(1.0, 15.0),
                has_flash: true,
                max_still_resolution: still,
                ..DeviceCapabilities::default()
            },
        },
        CaptureDevice {
            id: DeviceId::new("front-wide"),
            name: "Front Camera".to_string(),
            position: CameraPosition::Front,
            lens_type: LensType::Wide,
            capabilities: DeviceCapabilities {
                zoom_range: ValueRange::new(1.0, 4.0),
                has_flash: false,
                max_still_resolution: Some(Resolution::new(3088, 2316)),
                ..DeviceCapabilities::default()
            },
        },
    ]
}

// SPDX-License-Identifier: GPL-3.0-only

//! Lens discovery and switching

use super::lock_unpoisoned;
use super::registry::CaptureDeviceRegistry;
use super::session::DeviceSessionCore;
use super::types::{CameraPosition, CaptureDevice, LensType};
use crate::constants::{DEFAULT_ZOOM_FACTOR, UI_MIN_ZOOM, lens_envelope, lens_names};
use crate::errors::{CaptureError, CaptureResult};
use std::sync::Mutex;
use tracing::info;

/// A lens offered to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct LensModel {
    /// Display label ("0.5x", "1x", "3x", "Front")
    pub name: String,
    pub lens_type: LensType,
    pub position: CameraPosition,
    /// Last zoom the user set while on this lens
    pub last_zoom_factor: Option<f64>,
}

impl LensModel {
    pub fn new(lens_type: LensType, position: CameraPosition) -> Self {
        Self {
            name: Self::display_name(lens_type, position).to_string(),
            lens_type,
            position,
            last_zoom_factor: None,
        }
    }

    /// Lens model for an enumerated device
    pub fn for_device(device: &CaptureDevice) -> Self {
        Self::new(device.lens_type, device.position)
    }

    fn display_name(lens_type: LensType, position: CameraPosition) -> &'static str {
        match (position, lens_type) {
            (CameraPosition::Front, _) => lens_names::FRONT,
            (CameraPosition::Back, LensType::UltraWide) => lens_names::ULTRA_WIDE,
            (CameraPosition::Back, LensType::Wide) => lens_names::WIDE,
            (CameraPosition::Back, LensType::Telephoto) => lens_names::TELEPHOTO,
        }
    }

    /// Same physical lens, ignoring remembered zoom
    pub fn same_lens(&self, other: &LensModel) -> bool {
        self.lens_type == other.lens_type && self.position == other.position
    }
}

/// UI-facing zoom range for a lens
///
/// Distinct from the device's hardware zoom range; the slider uses this,
/// the hardware clamp uses the device range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomEnvelope {
    pub min: f64,
    pub max: f64,
}

impl ZoomEnvelope {
    /// Envelope for a lens display name
    pub fn for_lens_name(name: &str, ui_min_zoom: f64) -> Self {
        let max = match name {
            lens_names::ULTRA_WIDE => lens_envelope::ULTRA_WIDE_MAX,
            lens_names::WIDE => lens_envelope::WIDE_MAX,
            lens_names::TELEPHOTO => lens_envelope::TELEPHOTO_MAX,
            _ => lens_envelope::DEFAULT_MAX,
        };
        Self {
            min: ui_min_zoom,
            max,
        }
    }
}

impl Default for ZoomEnvelope {
    fn default() -> Self {
        Self::for_lens_name(lens_names::WIDE, UI_MIN_ZOOM)
    }
}

/// Mutable lens bookkeeping, only ever locked briefly
#[derive(Debug)]
struct LensState {
    offered: Vec<LensModel>,
    current: Option<LensModel>,
    /// Only ever a back-position lens
    last_selected_lens: Option<LensModel>,
    envelope: ZoomEnvelope,
}

/// Tracks the offered lenses, the active lens and the back-camera lens memory
///
/// The hardware part of a switch runs without holding the internal lock,
/// so readers never wait on an input replacement.
pub struct LensSwitcher {
    registry: CaptureDeviceRegistry,
    ui_min_zoom: f64,
    state: Mutex<LensState>,
}

impl LensSwitcher {
    pub fn new(registry: CaptureDeviceRegistry, ui_min_zoom: f64) -> Self {
        Self {
            registry,
            ui_min_zoom,
            state: Mutex::new(LensState {
                offered: Vec::new(),
                current: None,
                last_selected_lens: None,
                envelope: ZoomEnvelope::for_lens_name(lens_names::WIDE, ui_min_zoom),
            }),
        }
    }

    /// One lens per distinct lens type, in ultra-wide, wide, telephoto order
    pub fn lens_options(devices: &[CaptureDevice]) -> Vec<LensModel> {
        let mut lenses: Vec<LensModel> = Vec::new();
        for device in devices {
            let lens = LensModel::for_device(device);
            if !lenses.iter().any(|existing| existing.same_lens(&lens)) {
                lenses.push(lens);
            }
        }
        lenses.sort_by_key(|lens| lens.lens_type.preference_rank());
        lenses
    }

    /// Discover the lenses for a position on a blocking worker
    pub async fn available_lenses(
        registry: &CaptureDeviceRegistry,
        position: CameraPosition,
    ) -> Vec<LensModel> {
        let devices = registry.enumerate_in_background(Some(position)).await;
        Self::lens_options(&devices)
    }

    /// Remember the lenses offered to the UI, keeping remembered zooms
    ///
    /// Returns the offered list as stored.
    pub fn set_offered(&self, lenses: Vec<LensModel>) -> Vec<LensModel> {
        let mut state = lock_unpoisoned(&self.state);
        let offered: Vec<LensModel> = lenses
            .into_iter()
            .map(|mut lens| {
                if let Some(previous) = state.offered.iter().find(|o| o.same_lens(&lens)) {
                    lens.last_zoom_factor = previous.last_zoom_factor;
                }
                lens
            })
            .collect();
        state.offered = offered.clone();
        offered
    }

    pub fn offered(&self) -> Vec<LensModel> {
        lock_unpoisoned(&self.state).offered.clone()
    }

    /// Switch the session to `lens`
    ///
    /// Performs one input replacement, updates the back-lens memory,
    /// recomputes the zoom envelope and resets zoom to 1.0x, or to the
    /// floor the session enforces when that is higher.
    ///
    /// Blocks on hardware. Callers serialise switches.
    pub fn switch_to(
        &self,
        core: &DeviceSessionCore,
        lens: &LensModel,
    ) -> CaptureResult<String> {
        let Some(device) = self.registry.find(lens.position, lens.lens_type) else {
            return Err(CaptureError::LensNotAvailable(lens.name.clone()));
        };

        core.set_active_input(&device)?;
        self.activated(lens.clone());
        core.set_zoom(DEFAULT_ZOOM_FACTOR.max(self.ui_min_zoom));

        info!(lens = %lens.name, device = %device.id, "Switched lens");
        Ok(format!("Switched to {}", lens.name))
    }

    /// Activate an already-resolved device (bootstrap path)
    pub fn activate_device(
        &self,
        core: &DeviceSessionCore,
        device: &CaptureDevice,
    ) -> CaptureResult<LensModel> {
        core.set_active_input(device)?;
        let lens = LensModel::for_device(device);
        self.activated(lens.clone());
        Ok(lens)
    }

    fn activated(&self, lens: LensModel) {
        let mut state = lock_unpoisoned(&self.state);
        if lens.position == CameraPosition::Back {
            state.last_selected_lens = Some(lens.clone());
        }
        state.envelope = ZoomEnvelope::for_lens_name(&lens.name, self.ui_min_zoom);
        state.current = Some(lens);
    }

    /// Lens to use when returning to `position` without an explicit pick
    pub fn lens_for_position(&self, position: CameraPosition) -> LensModel {
        match position {
            CameraPosition::Back => lock_unpoisoned(&self.state)
                .last_selected_lens
                .clone()
                .unwrap_or_else(|| LensModel::new(LensType::Wide, CameraPosition::Back)),
            CameraPosition::Front => LensModel::new(LensType::Wide, CameraPosition::Front),
        }
    }

    /// Record the zoom the user set on the active lens
    pub fn record_zoom(&self, factor: f64) {
        let mut state = lock_unpoisoned(&self.state);
        let LensState {
            offered,
            current,
            last_selected_lens,
            ..
        } = &mut *state;
        let Some(current) = current.as_mut() else {
            return;
        };
        current.last_zoom_factor = Some(factor);
        let current = &*current;
        if let Some(offered) = offered.iter_mut().find(|o| o.same_lens(current)) {
            offered.last_zoom_factor = Some(factor);
        }
        if let Some(last) = last_selected_lens.as_mut()
            && last.same_lens(current)
        {
            last.last_zoom_factor = Some(factor);
        }
    }

    pub fn current(&self) -> Option<LensModel> {
        lock_unpoisoned(&self.state).current.clone()
    }

    pub fn last_selected_lens(&self) -> Option<LensModel> {
        lock_unpoisoned(&self.state).last_selected_lens.clone()
    }

    pub fn envelope(&self) -> ZoomEnvelope {
        lock_unpoisoned(&self.state).envelope
    }
}

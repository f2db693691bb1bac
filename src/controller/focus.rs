// SPDX-License-Identifier: GPL-3.0-only

//! Focus state machine and focus control
//!
//! ```text
//!            focus_at / subject change (continuous only)
//!   ┌──────────────────────────────────────────────┐
//!   ▼                                              │
//! Focusing ──settle delay──▶ Focused ──────────────┘
//!   │
//!   └──lock failure──▶ Failed
//!
//! any ──lock_focus──▶ Locked ──unlock_focus──▶ Focusing (continuous)
//! ```

use super::CaptureController;
use super::events::SessionEvent;
use crate::backends::camera::{ConfigurationLock, DeviceFocusMode, PointOfInterest, lock_unpoisoned};
use crate::errors::{CaptureError, CaptureResult};
use crate::settings::{SettingValue, SettingsKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// User-selected focus behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusMode {
    /// Single-shot autofocus
    Auto,
    #[default]
    Continuous,
    Locked,
    /// Reserved; selecting it changes no hardware state
    Manual,
}

impl FocusMode {
    /// Hardware mode applied when focusing, `None` for manual
    pub fn device_mode(self) -> Option<DeviceFocusMode> {
        match self {
            FocusMode::Auto => Some(DeviceFocusMode::AutoFocus),
            FocusMode::Continuous => Some(DeviceFocusMode::ContinuousAutoFocus),
            FocusMode::Locked => Some(DeviceFocusMode::Locked),
            FocusMode::Manual => None,
        }
    }

    /// Index used by the settings store
    pub fn index(self) -> i64 {
        match self {
            FocusMode::Auto => 0,
            FocusMode::Continuous => 1,
            FocusMode::Locked => 2,
            FocusMode::Manual => 3,
        }
    }

    pub fn from_index(index: i64) -> Self {
        match index {
            0 => FocusMode::Auto,
            2 => FocusMode::Locked,
            3 => FocusMode::Manual,
            _ => FocusMode::Continuous,
        }
    }
}

/// Autofocus lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusState {
    Focusing,
    Focused,
    Failed,
    Locked,
}

/// Pure focus state machine
///
/// Each focus attempt gets a generation number; a pending settle only
/// applies if no newer attempt (or lock) superseded it.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusMachine {
    mode: FocusMode,
    state: FocusState,
    generation: u64,
}

impl FocusMachine {
    pub fn new(mode: FocusMode) -> Self {
        let state = if mode == FocusMode::Locked {
            FocusState::Locked
        } else {
            FocusState::Focused
        };
        Self {
            mode,
            state,
            generation: 0,
        }
    }

    pub fn mode(&self) -> FocusMode {
        self.mode
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    /// Enter `Focusing`, returning the generation to settle later
    ///
    /// Returns `None` while locked.
    pub fn begin_focus(&mut self) -> Option<u64> {
        if self.mode == FocusMode::Locked {
            return None;
        }
        self.generation += 1;
        self.state = FocusState::Focusing;
        Some(self.generation)
    }

    /// Advance `Focusing` to `Focused` if `generation` is still current
    pub fn settle(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != FocusState::Focusing {
            return false;
        }
        self.state = FocusState::Focused;
        true
    }

    pub fn fail(&mut self) {
        self.generation += 1;
        self.state = FocusState::Failed;
    }

    pub fn lock(&mut self) {
        self.generation += 1;
        self.mode = FocusMode::Locked;
        self.state = FocusState::Locked;
    }

    /// Return to continuous autofocus and refocus
    pub fn unlock(&mut self) -> u64 {
        self.mode = FocusMode::Continuous;
        self.generation += 1;
        self.state = FocusState::Focusing;
        self.generation
    }

    /// Change mode without touching the state, except leaving `Locked`
    pub fn set_mode(&mut self, mode: FocusMode) {
        if mode == FocusMode::Locked {
            self.lock();
            return;
        }
        self.mode = mode;
        if self.state == FocusState::Locked {
            self.generation += 1;
            self.state = FocusState::Focused;
        }
    }

    /// A subject-area change refocuses only in continuous mode once focused
    pub fn should_retrigger(&self) -> bool {
        self.mode == FocusMode::Continuous && self.state == FocusState::Focused
    }
}

impl Default for FocusMachine {
    fn default() -> Self {
        Self::new(FocusMode::default())
    }
}

impl CaptureController {
    // =========================================================================
    // Focus Control
    // =========================================================================

    pub fn focus_mode(&self) -> FocusMode {
        lock_unpoisoned(&self.inner.focus).mode()
    }

    pub fn focus_state(&self) -> FocusState {
        lock_unpoisoned(&self.inner.focus).state()
    }

    /// Focus at a normalised point using the current focus mode
    ///
    /// Ignored while focus is locked or in manual mode.
    pub async fn focus_at(&self, point: PointOfInterest) -> CaptureResult<()> {
        let mode = self.focus_mode();
        let device_mode = match mode.device_mode() {
            Some(device_mode) if mode != FocusMode::Locked => device_mode,
            _ => {
                debug!(?mode, "Focus request ignored");
                return Ok(());
            }
        };

        let Some(control) = self.inner.core.active_input() else {
            return Err(CaptureError::DeviceNotFound("no active device".into()));
        };

        let generation = {
            let guard = match ConfigurationLock::acquire(control.as_ref()) {
                Ok(guard) => guard,
                Err(e) => return Err(self.focus_failed(e.into())),
            };
            if guard.is_focus_point_of_interest_supported() {
                guard.set_focus_point_of_interest(point);
            }
            if guard.is_focus_mode_supported(device_mode) {
                guard.set_focus_mode(device_mode);
            } else {
                debug!(?device_mode, "Focus mode not supported by device");
            }
            lock_unpoisoned(&self.inner.focus).begin_focus()
        };

        let Some(generation) = generation else {
            return Ok(());
        };
        debug!(x = point.x, y = point.y, ?mode, generation, "Focusing");
        self.inner
            .events
            .publish(SessionEvent::FocusState(FocusState::Focusing));
        self.schedule_settle(generation, self.settle_delay(mode));
        Ok(())
    }

    /// Subject-area-changed notification from the platform
    pub async fn subject_area_changed(&self) -> CaptureResult<()> {
        if !lock_unpoisoned(&self.inner.focus).should_retrigger() {
            return Ok(());
        }
        debug!("Subject area changed, refocusing");
        self.focus_at(PointOfInterest::CENTER).await
    }

    /// Lock focus at its current position
    pub async fn lock_focus(&self) -> CaptureResult<()> {
        let Some(control) = self.inner.core.active_input() else {
            return Err(CaptureError::DeviceNotFound("no active device".into()));
        };

        match ConfigurationLock::acquire(control.as_ref()) {
            Ok(guard) => {
                if guard.is_focus_mode_supported(DeviceFocusMode::Locked) {
                    guard.set_focus_mode(DeviceFocusMode::Locked);
                }
            }
            Err(e) => return Err(self.focus_failed(e.into())),
        }

        lock_unpoisoned(&self.inner.focus).lock();
        info!("Focus locked");
        self.inner
            .events
            .publish(SessionEvent::FocusMode(FocusMode::Locked));
        self.inner
            .events
            .publish(SessionEvent::FocusState(FocusState::Locked));
        self.persist_focus();
        Ok(())
    }

    /// Unlock focus, returning to continuous autofocus
    pub async fn unlock_focus(&self) -> CaptureResult<()> {
        let Some(control) = self.inner.core.active_input() else {
            return Err(CaptureError::DeviceNotFound("no active device".into()));
        };

        match ConfigurationLock::acquire(control.as_ref()) {
            Ok(guard) => {
                if guard.is_focus_mode_supported(DeviceFocusMode::ContinuousAutoFocus) {
                    guard.set_focus_mode(DeviceFocusMode::ContinuousAutoFocus);
                }
            }
            Err(e) => return Err(self.focus_failed(e.into())),
        }

        let generation = lock_unpoisoned(&self.inner.focus).unlock();
        info!("Focus unlocked");
        self.inner
            .events
            .publish(SessionEvent::FocusMode(FocusMode::Continuous));
        self.inner
            .events
            .publish(SessionEvent::FocusState(FocusState::Focusing));
        self.persist_focus();
        self.schedule_settle(generation, self.settle_delay(FocusMode::Continuous));
        Ok(())
    }

    /// Select a focus mode
    pub async fn set_focus_mode(&self, mode: FocusMode) -> CaptureResult<()> {
        match mode {
            FocusMode::Locked => self.lock_focus().await,
            FocusMode::Manual => {
                lock_unpoisoned(&self.inner.focus).set_mode(mode);
                self.inner.events.publish(SessionEvent::FocusMode(mode));
                self.persist_focus();
                Ok(())
            }
            FocusMode::Auto | FocusMode::Continuous => {
                lock_unpoisoned(&self.inner.focus).set_mode(mode);
                self.inner.events.publish(SessionEvent::FocusMode(mode));
                self.persist_focus();
                self.focus_at(PointOfInterest::CENTER).await
            }
        }
    }

    /// Mark focus failed after a lock failure and hand the error back
    fn focus_failed(&self, error: CaptureError) -> CaptureError {
        warn!(error = %error, "Focus failed");
        lock_unpoisoned(&self.inner.focus).fail();
        self.inner
            .events
            .publish(SessionEvent::FocusState(FocusState::Failed));
        error
    }

    fn settle_delay(&self, mode: FocusMode) -> Duration {
        match mode {
            FocusMode::Continuous => self.inner.config.continuous_focus_settle(),
            _ => self.inner.config.single_shot_focus_settle(),
        }
    }

    fn schedule_settle(&self, generation: u64, delay: Duration) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if lock_unpoisoned(&inner.focus).settle(generation) {
                debug!(generation, "Focus settled");
                inner
                    .events
                    .publish(SessionEvent::FocusState(FocusState::Focused));
            }
        });
    }

    fn persist_focus(&self) {
        let mode = self.focus_mode();
        let settings = &self.inner.settings;
        settings.set(SettingsKey::FocusMode, SettingValue::Int(mode.index()));
        settings.set(
            SettingsKey::FocusLocked,
            SettingValue::Bool(mode == FocusMode::Locked),
        );
    }
}

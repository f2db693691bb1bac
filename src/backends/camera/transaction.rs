// SPDX-License-Identifier: GPL-3.0-only

//! Atomic pipeline reconfiguration
//!
//! A [`SessionTransaction`] wraps `begin_configuration` /
//! `commit_configuration` around input changes. It holds the pipeline
//! mutex for its whole lifetime, so two transactions never overlap.
//!
//! If the transaction is dropped without [`SessionTransaction::commit`]
//! (an error was propagated with `?`), the input set captured at begin is
//! restored before committing, so the video pipeline never observes a
//! partial input set.

use super::CapturePipeline;
use super::DeviceControl;
use super::types::{BackendError, CaptureDevice, DeviceId};
use std::sync::{Arc, MutexGuard};
use tracing::{debug, error, info, warn};

/// Scoped begin/mutate/commit unit of work on the capture pipeline
pub struct SessionTransaction<'a> {
    pipeline: MutexGuard<'a, Box<dyn CapturePipeline>>,
    /// Inputs attached when the transaction began
    snapshot: Vec<CaptureDevice>,
    committed: bool,
}

impl<'a> SessionTransaction<'a> {
    /// Suspend live reconfiguration and start collecting changes
    pub fn begin(mut pipeline: MutexGuard<'a, Box<dyn CapturePipeline>>) -> Self {
        let snapshot: Vec<CaptureDevice> = pipeline
            .inputs()
            .iter()
            .map(|input| input.device().clone())
            .collect();
        pipeline.begin_configuration();
        debug!(inputs = snapshot.len(), "Session transaction began");
        Self {
            pipeline,
            snapshot,
            committed: false,
        }
    }

    /// Inputs currently attached inside the transaction
    pub fn inputs(&self) -> Vec<Arc<dyn DeviceControl>> {
        self.pipeline.inputs()
    }

    pub fn remove_input(&mut self, id: &DeviceId) {
        self.pipeline.remove_input(id);
    }

    pub fn remove_all_inputs(&mut self) {
        for input in self.pipeline.inputs() {
            let id = input.device().id.clone();
            self.pipeline.remove_input(&id);
        }
    }

    /// Add a device input, refusing if the platform will not accept it
    pub fn add_input(
        &mut self,
        device: &CaptureDevice,
    ) -> Result<Arc<dyn DeviceControl>, BackendError> {
        if !self.pipeline.can_add_input(device) {
            return Err(BackendError::InputRefused(device.name.clone()));
        }
        self.pipeline.add_input(device)
    }

    /// Replace every video input with `device`
    pub fn replace_inputs(
        &mut self,
        device: &CaptureDevice,
    ) -> Result<Arc<dyn DeviceControl>, BackendError> {
        self.remove_all_inputs();
        self.add_input(device)
    }

    /// Ensure the pipeline has a photo output
    pub fn ensure_photo_output(&mut self) -> Result<(), BackendError> {
        if self.pipeline.has_photo_output() {
            return Ok(());
        }
        self.pipeline.add_photo_output()
    }

    /// Apply all changes atomically
    pub fn commit(mut self) {
        self.committed = true;
        self.pipeline.commit_configuration();
        info!(
            inputs = self.pipeline.inputs().len(),
            "Session transaction committed"
        );
    }

    fn restore_snapshot(&mut self) {
        for input in self.pipeline.inputs() {
            let id = input.device().id.clone();
            self.pipeline.remove_input(&id);
        }
        for device in &self.snapshot {
            if let Err(e) = self.pipeline.add_input(device) {
                error!(device = %device.id, error = %e, "Failed to restore input during rollback");
            }
        }
    }
}

impl Drop for SessionTransaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        warn!(
            restored = self.snapshot.len(),
            "Session transaction abandoned, rolling back"
        );
        self.restore_snapshot();
        self.pipeline.commit_configuration();
    }
}

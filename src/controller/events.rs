// SPDX-License-Identifier: GPL-3.0-only

//! Observable state changes published to the UI

use super::focus::{FocusMode, FocusState};
use crate::constants::EVENT_CHANNEL_CAPACITY;
use tokio::sync::broadcast;
use tracing::trace;

/// A change of controller state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Zoom(f64),
    FocusState(FocusState),
    FocusMode(FocusMode),
}

impl SessionEvent {
    /// Name of the published property
    pub fn key(&self) -> &'static str {
        match self {
            SessionEvent::Zoom(_) => "zoom",
            SessionEvent::FocusState(_) => "focusState",
            SessionEvent::FocusMode(_) => "focusMode",
        }
    }
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers
///
/// Slow subscribers lose the oldest events rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        trace!(key = event.key(), ?event, "Publishing session event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

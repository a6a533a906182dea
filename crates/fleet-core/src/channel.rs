//! Live-update channel contract.
//!
//! Publishing is synchronous and fire-and-forget: delivery is at most once
//! to whoever is subscribed right now, with no replay for late joiners.
//! Implementations must never block the fast tick.

use std::sync::{Arc, Mutex, PoisonError};

use fleet_types::LiveEvent;

/// A pub/sub transport for dashboard clients.
pub trait LiveChannel: Send + Sync {
    /// Hand `event` to current subscribers. Returns how many received it,
    /// where the transport can tell (0 otherwise).
    fn publish(&self, event: LiveEvent) -> usize;
}

/// Sends every event to each inner channel in turn.
#[derive(Default, Clone)]
pub struct FanoutChannel {
    channels: Vec<Arc<dyn LiveChannel>>,
}

impl FanoutChannel {
    /// An empty fanout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a downstream channel.
    #[must_use]
    pub fn with(mut self, channel: Arc<dyn LiveChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Number of downstream channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether there are no downstream channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl LiveChannel for FanoutChannel {
    fn publish(&self, event: LiveEvent) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.publish(event.clone()))
            .fold(0, usize::saturating_add)
    }
}

/// Keeps every published event in memory. Used by tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    events: Mutex<Vec<LiveEvent>>,
}

impl RecordingChannel {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub fn events(&self) -> Vec<LiveEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LiveChannel for RecordingChannel {
    fn publish(&self, event: LiveEvent) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        1
    }
}

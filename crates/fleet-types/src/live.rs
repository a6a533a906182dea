//! Messages pushed over the live-update channel.
//!
//! Each message is a `{"topic": ..., "payload": ...}` envelope. The
//! `telemetry` topic carries the whole fleet as one array; the `alert`
//! topic carries one [`AlertEvent`] per message.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::{AlertEvent, VehicleState};

/// Topic names on the live-update channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveTopic {
    /// Full fleet snapshot, once per fast tick.
    Telemetry,
    /// A single newly raised alert.
    Alert,
}

impl LiveTopic {
    /// The topic name as it appears on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::Alert => "alert",
        }
    }
}

/// One message on the live-update channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "topic", content = "payload", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LiveEvent {
    /// Every vehicle's current state.
    Telemetry(Vec<VehicleState>),
    /// A newly raised alert.
    Alert(AlertEvent),
}

impl LiveEvent {
    /// The topic this event is published on.
    pub const fn topic(&self) -> LiveTopic {
        match self {
            Self::Telemetry(_) => LiveTopic::Telemetry,
            Self::Alert(_) => LiveTopic::Alert,
        }
    }
}

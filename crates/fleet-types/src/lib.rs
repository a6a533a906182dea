//! Shared type definitions for the fleet telemetry simulator.
//!
//! This crate is the single source of truth for the data model shared by
//! the simulator core, the persistence layer, and the live dashboard feed.
//! Types flow downstream to `TypeScript` via `ts-rs` so the dashboard is
//! built against the exact field names serialized here.
//!
//! # Modules
//!
//! - [`ids`] -- Vehicle and alert identifiers
//! - [`enums`] -- Camera status, alert category, vehicle status
//! - [`structs`] -- Vehicle state, snapshots, alerts, roster records
//! - [`live`] -- Envelope for messages pushed over the live-update channel

pub mod enums;
pub mod ids;
pub mod live;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AlertCategory, CameraStatus, ParseEnumError, VehicleStatus};
pub use ids::{AlertId, VehicleId};
pub use live::{LiveEvent, LiveTopic};
pub use structs::{
    AlertEvent, AlertRecord, Severity, TelemetrySnapshot, VehicleRecord, VehicleState,
};

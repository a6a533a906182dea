//! Core entity structs for the fleet data model.
//!
//! Field names are part of the wire contract: the live channel, the cache,
//! and the read API all serialize these structs as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AlertCategory, CameraStatus, VehicleStatus};
use crate::ids::{AlertId, VehicleId};

// ---------------------------------------------------------------------------
// VehicleState
// ---------------------------------------------------------------------------

/// Current simulated state of one fleet member.
///
/// One entry exists per roster vehicle for the lifetime of the simulator.
/// Entries are mutated in place every fast tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VehicleState {
    /// Roster identifier.
    pub vehicle_id: VehicleId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Heading in degrees, always in `[0, 360)`.
    pub heading: f64,
    /// Speed in km/h, never negative.
    pub speed: f64,
    /// Fuel level in percent, `[0, 100]`.
    pub fuel_level: f64,
    /// Engine temperature in degrees Celsius.
    pub engine_temp: f64,
    /// Battery voltage in volts.
    pub battery_voltage: f64,
    /// Distance travelled in km, never decreases.
    pub odometer: f64,
    /// Whether the lidar unit is reporting.
    pub lidar_active: bool,
    /// Number of objects currently tracked by radar.
    pub radar_objects: u32,
    /// Forward camera health.
    pub camera_status: CameraStatus,
    /// Whether automatic emergency braking fired this tick.
    pub emergency_braking: bool,
}

impl VehicleState {
    /// Nominal engine temperature of a parked vehicle.
    pub const RESTING_ENGINE_TEMP: f64 = 85.0;

    /// Nominal battery voltage of a parked vehicle.
    pub const RESTING_BATTERY_VOLTAGE: f64 = 13.5;

    /// A parked vehicle at the given position with nominal sensors.
    pub fn parked(vehicle_id: VehicleId, latitude: f64, longitude: f64, odometer: f64) -> Self {
        Self {
            vehicle_id,
            latitude,
            longitude,
            heading: 0.0,
            speed: 0.0,
            fuel_level: 100.0,
            engine_temp: Self::RESTING_ENGINE_TEMP,
            battery_voltage: Self::RESTING_BATTERY_VOLTAGE,
            odometer: odometer.max(0.0),
            lidar_active: true,
            radar_objects: 0,
            camera_status: CameraStatus::Ok,
            emergency_braking: false,
        }
    }
}

// ---------------------------------------------------------------------------
// TelemetrySnapshot
// ---------------------------------------------------------------------------

/// Immutable, timestamped copy of a [`VehicleState`] written on the slow tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TelemetrySnapshot {
    /// The captured state.
    #[serde(flatten)]
    pub state: VehicleState,
    /// When the snapshot was taken.
    pub recorded_at: DateTime<Utc>,
}

impl TelemetrySnapshot {
    /// Capture `state` at `recorded_at`.
    pub fn capture(state: &VehicleState, recorded_at: DateTime<Utc>) -> Self {
        Self {
            state: state.clone(),
            recorded_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// Ordered alert severity: higher is more severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Severity(pub u8);

impl Severity {
    /// Something to watch (e.g. low fuel).
    pub const WARNING: Self = Self(1);
    /// Needs attention now (e.g. engine overheating).
    pub const CRITICAL: Self = Self(2);

    /// The numeric level.
    pub const fn level(self) -> u8 {
        self.0
    }
}

/// A threshold breach raised for one vehicle on one tick.
///
/// Created by the alert evaluator, broadcast immediately, then persisted.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AlertEvent {
    /// Vehicle the alert refers to.
    pub vehicle_id: VehicleId,
    /// Which threshold was crossed.
    pub category: AlertCategory,
    /// Human-readable description including the offending reading.
    pub message: String,
    /// Severity level.
    pub severity: Severity,
    /// When the alert was raised.
    pub created_at: DateTime<Utc>,
}

/// A persisted alert together with its acknowledgement flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AlertRecord {
    /// Store-assigned identifier.
    pub id: AlertId,
    /// The alert as raised.
    #[serde(flatten)]
    pub event: AlertEvent,
    /// Whether an operator has acknowledged it.
    pub acknowledged: bool,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A registered vehicle as stored in the fleet roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VehicleRecord {
    /// Roster identifier.
    pub vehicle_id: VehicleId,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Operational status.
    pub status: VehicleStatus,
    /// Odometer reading at registration, used to seed the simulation.
    pub odometer: f64,
}

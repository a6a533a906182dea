//! Enumeration types for the fleet data model.
//!
//! Every enum here is persisted as text, so each one carries an
//! `as_str` / [`FromStr`] pair that matches its serde representation.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error returned when a persisted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Camera status
// ---------------------------------------------------------------------------

/// Health of the forward camera, resampled every moving tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum CameraStatus {
    /// Nominal operation.
    #[default]
    Ok,
    /// Degraded image quality.
    Warning,
    /// Camera fault.
    Error,
}

impl CameraStatus {
    /// The persisted/serialized name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl FromStr for CameraStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ok" => Ok(Self::Ok),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(ParseEnumError {
                kind: "camera_status",
                value: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Alert category
// ---------------------------------------------------------------------------

/// The threshold condition an alert was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AlertCategory {
    /// Engine temperature above the configured ceiling.
    HighTemperature,
    /// Fuel level below the configured floor.
    LowFuel,
}

impl AlertCategory {
    /// The persisted/serialized name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HighTemperature => "high_temperature",
            Self::LowFuel => "low_fuel",
        }
    }

    /// Human-readable label used by the dashboard.
    pub const fn label(self) -> &'static str {
        match self {
            Self::HighTemperature => "High Temperature",
            Self::LowFuel => "Low Fuel",
        }
    }
}

impl FromStr for AlertCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high_temperature" => Ok(Self::HighTemperature),
            "low_fuel" => Ok(Self::LowFuel),
            other => Err(ParseEnumError {
                kind: "alert_category",
                value: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Vehicle status (roster)
// ---------------------------------------------------------------------------

/// Operational status recorded in the fleet roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum VehicleStatus {
    /// In service with a driver.
    #[default]
    Active,
    /// Parked and available.
    Idle,
    /// Out of service for maintenance.
    Maintenance,
    /// Operating in autonomous mode.
    Autonomous,
}

impl VehicleStatus {
    /// The persisted/serialized name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Maintenance => "maintenance",
            Self::Autonomous => "autonomous",
        }
    }
}

impl FromStr for VehicleStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "idle" => Ok(Self::Idle),
            "maintenance" => Ok(Self::Maintenance),
            "autonomous" => Ok(Self::Autonomous),
            other => Err(ParseEnumError {
                kind: "vehicle_status",
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_matches_serde_names() {
        for status in [CameraStatus::Ok, CameraStatus::Warning, CameraStatus::Error] {
            let json = serde_json::to_string(&status).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<CameraStatus>(), Ok(status));
        }
        for category in [AlertCategory::HighTemperature, AlertCategory::LowFuel] {
            let json = serde_json::to_string(&category).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
            assert_eq!(category.as_str().parse::<AlertCategory>(), Ok(category));
        }
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = "sideways".parse::<VehicleStatus>();
        assert!(err.is_err());
        assert!(
            err.err()
                .map(|e| e.to_string())
                .unwrap_or_default()
                .contains("sideways")
        );
    }

    #[test]
    fn camera_defaults_to_ok() {
        assert_eq!(CameraStatus::default(), CameraStatus::Ok);
    }
}

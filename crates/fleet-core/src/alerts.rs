//! Threshold alerts over vehicle state.
//!
//! [`AlertEvaluator`] is pure: every call over an out-of-range state yields
//! a fresh alert, with no memory of earlier ticks. Suppressing repeats is
//! the job of [`AlertCooldown`], which sits between the evaluator and the
//! sink and is disabled unless `alerts.cooldown_secs` is set.
//!
//! | Check                         | Category           | Severity |
//! |-------------------------------|--------------------|----------|
//! | `engine_temp > high_temp`     | `high_temperature` | 2        |
//! | `fuel_level < low_fuel`       | `low_fuel`         | 1        |

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use fleet_types::{AlertCategory, AlertEvent, Severity, VehicleId, VehicleState};

use crate::config::AlertConfig;

/// Stateless threshold checks.
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    high_temperature_threshold: f64,
    low_fuel_threshold: f64,
}

impl AlertEvaluator {
    /// Build an evaluator from configured thresholds.
    pub const fn new(config: &AlertConfig) -> Self {
        Self {
            high_temperature_threshold: config.high_temperature_threshold,
            low_fuel_threshold: config.low_fuel_threshold,
        }
    }

    /// Every threshold `state` currently breaches, each as its own event.
    pub fn evaluate(&self, state: &VehicleState, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut alerts = Vec::new();

        if state.engine_temp > self.high_temperature_threshold {
            alerts.push(AlertEvent {
                vehicle_id: state.vehicle_id.clone(),
                category: AlertCategory::HighTemperature,
                message: format!("Engine temp is {:.1}°C", state.engine_temp),
                severity: Severity::CRITICAL,
                created_at: now,
            });
        }

        if state.fuel_level < self.low_fuel_threshold {
            alerts.push(AlertEvent {
                vehicle_id: state.vehicle_id.clone(),
                category: AlertCategory::LowFuel,
                message: format!("Fuel level is {:.1}%", state.fuel_level),
                severity: Severity::WARNING,
                created_at: now,
            });
        }

        alerts
    }
}

/// Per (vehicle, category) suppression window.
///
/// A zero window lets everything through.
#[derive(Debug, Clone)]
pub struct AlertCooldown {
    window: TimeDelta,
    last_emitted: BTreeMap<(VehicleId, AlertCategory), DateTime<Utc>>,
}

impl AlertCooldown {
    /// A gate that suppresses repeats within `cooldown_secs` seconds.
    pub fn new(cooldown_secs: u64) -> Self {
        let secs = i64::try_from(cooldown_secs).unwrap_or(i64::MAX);
        Self {
            window: TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX),
            last_emitted: BTreeMap::new(),
        }
    }

    /// Whether the gate suppresses anything at all.
    pub fn is_enabled(&self) -> bool {
        self.window > TimeDelta::zero()
    }

    /// Decide whether `alert` should be emitted, recording it if so.
    pub fn admit(&mut self, alert: &AlertEvent) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let key = (alert.vehicle_id.clone(), alert.category);
        if let Some(last) = self.last_emitted.get(&key)
            && alert.created_at.signed_duration_since(*last) < self.window
        {
            return false;
        }
        self.last_emitted.insert(key, alert.created_at);
        true
    }

    /// Keep only the alerts the gate admits, preserving order.
    pub fn filter(&mut self, alerts: Vec<AlertEvent>) -> Vec<AlertEvent> {
        alerts.into_iter().filter(|a| self.admit(a)).collect()
    }
}

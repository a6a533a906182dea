//! Kinematics and sensor model.
//!
//! [`KinematicsModel::step`] is a pure transform: given the previous
//! [`VehicleState`] and a random source it returns the next state. All
//! randomness comes from the caller's generator, so a seeded
//! [`StdRng`](rand::rngs::StdRng) replays the exact same trajectory.
//!
//! Per tick a vehicle either
//!
//! - stays put (speed, radar and braking zeroed; position, heading and
//!   every other reading unchanged), or
//! - moves: a uniform speed draw, a small positional jitter, a heading
//!   recomputed from the great-circle bearing, and freshly resampled
//!   engine, battery, and sensor readings.
//!
//! A move that lands outside the geofence respawns the vehicle near the
//! configured center instead of clamping it to the fence edge.

use std::time::Duration;

use fleet_types::{CameraStatus, VehicleState};
use rand::Rng;

use crate::config::{GeofenceConfig, KinematicsConfig};
use crate::geo::{self, GeoPoint};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// How a vehicle's position changed during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// The vehicle did not move this tick.
    Stationary,
    /// The vehicle moved and stayed inside the fence.
    Moved,
    /// The move left the fence and the vehicle was respawned near the center.
    Respawned,
}

/// Result of advancing one vehicle by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The next state.
    pub state: VehicleState,
    /// What happened to the position.
    pub motion: Motion,
}

/// Motion and sensor model bound to a tick interval.
#[derive(Debug, Clone)]
pub struct KinematicsModel {
    config: KinematicsConfig,
    geofence: GeofenceConfig,
    tick_hours: f64,
}

impl KinematicsModel {
    /// Build a model for ticks of length `tick_interval`.
    ///
    /// The interval converts speed (km/h) into per-tick distance.
    pub fn new(
        config: KinematicsConfig,
        geofence: GeofenceConfig,
        tick_interval: Duration,
    ) -> Self {
        Self {
            config,
            geofence,
            tick_hours: tick_interval.as_secs_f64() / SECONDS_PER_HOUR,
        }
    }

    /// The geofence this model respawns against.
    pub const fn geofence(&self) -> &GeofenceConfig {
        &self.geofence
    }

    /// Advance `prev` by one tick.
    pub fn step<R: Rng + ?Sized>(&self, prev: &VehicleState, rng: &mut R) -> Step {
        let mut next = prev.clone();

        if rng.random::<f64>() >= self.config.move_probability {
            next.speed = 0.0;
            next.radar_objects = 0;
            next.emergency_braking = false;
            return Step {
                state: next,
                motion: Motion::Stationary,
            };
        }

        let speed = rng.random::<f64>() * self.config.speed_max_kmh;
        next.speed = speed.max(0.0);

        let recorded = GeoPoint::new(prev.latitude, prev.longitude);
        let has_prior = recorded.is_finite();
        let origin = if has_prior {
            recorded
        } else {
            self.geofence.center
        };

        let (position, motion) = self.next_position(origin, rng);
        next.latitude = position.lat;
        next.longitude = position.lng;

        next.heading = if has_prior && next.speed > 0.0 && position != origin {
            geo::initial_bearing(origin, position)
        } else {
            geo::normalize_heading(prev.heading)
        };

        next.fuel_level = (prev.fuel_level - next.speed * self.config.fuel_burn_per_kmh)
            .clamp(0.0, 100.0);
        next.engine_temp = next.speed.mul_add(
            self.config.engine_temp_per_kmh,
            self.config.engine_temp_baseline,
        ) + rng.random::<f64>() * self.config.engine_temp_noise;
        next.battery_voltage = (rng.random::<f64>() - 0.5)
            .mul_add(self.config.battery_noise, self.config.battery_baseline);
        next.odometer = next.speed.mul_add(self.tick_hours, prev.odometer.max(0.0));

        next.lidar_active = true;
        next.radar_objects = rng.random_range(0..=self.config.radar_max_objects);
        next.camera_status = sample_camera_status(
            rng.random::<f64>(),
            self.config.camera_warning_probability,
            self.config.camera_error_probability,
        );
        next.emergency_braking = rng.random::<f64>() < self.config.emergency_braking_probability;

        Step {
            state: next,
            motion,
        }
    }

    /// Jitter `origin`; respawn near the center if the result leaves the fence.
    fn next_position<R: Rng + ?Sized>(&self, origin: GeoPoint, rng: &mut R) -> (GeoPoint, Motion) {
        let step = self.config.step_degrees;
        let candidate = GeoPoint::new(
            (rng.random::<f64>() - 0.5).mul_add(step, origin.lat),
            (rng.random::<f64>() - 0.5).mul_add(step, origin.lng),
        );

        if self.geofence.fence.contains(candidate) {
            return (candidate, Motion::Moved);
        }

        let span = self.geofence.respawn_span;
        let center = self.geofence.center;
        let respawn = GeoPoint::new(
            (rng.random::<f64>() - 0.5).mul_add(span, center.lat),
            (rng.random::<f64>() - 0.5).mul_add(span, center.lng),
        );
        (respawn, Motion::Respawned)
    }
}

/// Map one uniform roll in `[0, 1)` onto a camera status.
///
/// Cut-points are cumulative from the top of the range: the highest
/// `error_p` of the range is `error`, the next `warning_p` is `warning`,
/// everything below is `ok`.
pub fn sample_camera_status(roll: f64, warning_p: f64, error_p: f64) -> CameraStatus {
    let error_cut = 1.0 - error_p;
    let warning_cut = error_cut - warning_p;
    if roll > error_cut {
        CameraStatus::Error
    } else if roll > warning_cut {
        CameraStatus::Warning
    } else {
        CameraStatus::Ok
    }
}

//! One simulation: a State Store plus everything needed to advance it.
//!
//! [`Simulation`] is the synchronous heart of the scheduler. It never
//! awaits and never touches I/O, so both tick kinds can be driven directly
//! from tests with a seeded generator.
//!
//! A fast tick runs these phases over every vehicle, in store order:
//!
//! 1. **Advance** -- apply the kinematics model to the previous state.
//! 2. **Evaluate** -- run the alert thresholds against the *new* state.
//! 3. **Gate** -- drop repeats inside the cooldown window (if enabled).
//! 4. **Queue** -- remember admitted alerts for the next slow tick.
//!
//! The caller then hands the fleet snapshot and the tick's alerts to the
//! sink for immediate broadcast.
//!
//! A slow tick captures a timestamped snapshot of every vehicle and drains
//! the alert queue into a [`SlowTickBatch`].

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use fleet_types::{AlertEvent, VehicleRecord, VehicleState};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::alerts::{AlertCooldown, AlertEvaluator};
use crate::config::FleetConfig;
use crate::geo::BoundingBox;
use crate::kinematics::{KinematicsModel, Motion};
use crate::sink::SlowTickBatch;
use crate::store::StateStore;

/// Alerts held between slow ticks before the oldest are dropped.
pub const MAX_PENDING_ALERTS: usize = 4096;

/// Result of one fast tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FastTickSummary {
    /// Fast tick number, starting at 1.
    pub tick: u64,
    /// Every vehicle's new state, in store order.
    pub fleet: Vec<VehicleState>,
    /// Alerts raised this tick that passed the cooldown gate.
    pub alerts: Vec<AlertEvent>,
    /// Vehicles that moved and stayed inside the fence.
    pub moved: usize,
    /// Vehicles that were respawned near the center.
    pub respawned: usize,
    /// Vehicles that sat still.
    pub stationary: usize,
}

/// A seeded fleet and the models that advance it.
#[derive(Debug)]
pub struct Simulation {
    store: StateStore,
    kinematics: KinematicsModel,
    evaluator: AlertEvaluator,
    cooldown: AlertCooldown,
    seeding_region: BoundingBox,
    rng: StdRng,
    pending_alerts: VecDeque<AlertEvent>,
    fast_ticks: u64,
    slow_ticks: u64,
}

impl Simulation {
    /// Build an unseeded simulation from configuration.
    ///
    /// Uses `simulation.seed` when set, OS entropy otherwise.
    pub fn new(config: &FleetConfig) -> Self {
        let rng = config
            .simulation
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self::with_rng(config, rng)
    }

    /// Build an unseeded simulation driven by `rng`.
    pub fn with_rng(config: &FleetConfig, rng: StdRng) -> Self {
        Self {
            store: StateStore::new(),
            kinematics: KinematicsModel::new(
                config.kinematics.clone(),
                config.geofence.clone(),
                config.simulation.fast_period(),
            ),
            evaluator: AlertEvaluator::new(&config.alerts),
            cooldown: AlertCooldown::new(config.alerts.cooldown_secs),
            seeding_region: config.geofence.operating,
            rng,
            pending_alerts: VecDeque::new(),
            fast_ticks: 0,
            slow_ticks: 0,
        }
    }

    /// Place one vehicle per roster entry at a random point in the
    /// operating box. Replaces any previous fleet.
    pub fn seed(&mut self, roster: &[VehicleRecord]) -> usize {
        let region = self.seeding_region;
        self.store.seed(roster, &region, &mut self.rng)
    }

    /// The State Store.
    pub const fn store(&self) -> &StateStore {
        &self.store
    }

    /// Fast ticks run so far.
    pub const fn fast_ticks(&self) -> u64 {
        self.fast_ticks
    }

    /// Slow ticks run so far.
    pub const fn slow_ticks(&self) -> u64 {
        self.slow_ticks
    }

    /// Alerts waiting for the next slow tick.
    pub fn pending_alerts(&self) -> usize {
        self.pending_alerts.len()
    }

    /// Advance every vehicle by one tick and evaluate alerts.
    pub fn run_fast_tick(&mut self, now: DateTime<Utc>) -> FastTickSummary {
        self.fast_ticks = self.fast_ticks.saturating_add(1);

        let mut raised = Vec::new();
        let (mut moved, mut respawned, mut stationary) = (0_usize, 0_usize, 0_usize);

        let kinematics = &self.kinematics;
        let evaluator = &self.evaluator;
        let rng = &mut self.rng;
        self.store.advance_each(|prev| {
            let step = kinematics.step(prev, rng);
            match step.motion {
                Motion::Moved => moved = moved.saturating_add(1),
                Motion::Respawned => respawned = respawned.saturating_add(1),
                Motion::Stationary => stationary = stationary.saturating_add(1),
            }
            raised.extend(evaluator.evaluate(&step.state, now));
            step.state
        });

        let alerts = self.cooldown.filter(raised);
        self.queue_alerts(&alerts);

        if respawned > 0 {
            debug!(tick = self.fast_ticks, respawned, "Vehicles left the geofence and respawned");
        }

        FastTickSummary {
            tick: self.fast_ticks,
            fleet: self.store.snapshot(),
            alerts,
            moved,
            respawned,
            stationary,
        }
    }

    /// Snapshot the fleet and drain queued alerts for persistence.
    pub fn take_slow_batch(&mut self, now: DateTime<Utc>) -> SlowTickBatch {
        self.slow_ticks = self.slow_ticks.saturating_add(1);
        SlowTickBatch {
            snapshots: self.store.capture(now),
            alerts: self.pending_alerts.drain(..).collect(),
        }
    }

    fn queue_alerts(&mut self, alerts: &[AlertEvent]) {
        self.pending_alerts.extend(alerts.iter().cloned());
        let overflow = self.pending_alerts.len().saturating_sub(MAX_PENDING_ALERTS);
        if overflow > 0 {
            self.pending_alerts.drain(..overflow);
            warn!(dropped = overflow, "Pending alert queue full, dropped oldest alerts");
        }
    }
}

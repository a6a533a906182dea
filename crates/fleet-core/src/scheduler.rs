//! Tick Scheduler: two independent repeating timers over one simulation.
//!
//! ```text
//!   fast timer (2s)                         slow timer (10s)
//!        |                                        |
//!   lock Simulation                          lock Simulation
//!   run_fast_tick  -> fleet, alerts          take_slow_batch -> snapshots, alerts
//!   unlock                                   unlock
//!        |                                        |
//!   sink.publish_fast (sync)                 spawn sink.persist_slow (async)
//! ```
//!
//! The Simulation lock is only ever held for synchronous work, so a slow
//! persistence write never delays the fast tick. Each timer awaits its own
//! work before its next tick, and missed ticks are delayed rather than
//! bursted.
//!
//! [`Scheduler::start`] is idempotent. [`Scheduler::stop`] aborts both
//! timers; a persistence pass already in flight runs to completion on its
//! own task without being awaited.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use fleet_types::VehicleRecord;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::sink::BroadcastSink;
use crate::tick::Simulation;

/// Shared handle to a running simulation.
pub type SharedSimulation = Arc<Mutex<Simulation>>;

fn lock(simulation: &Mutex<Simulation>) -> MutexGuard<'_, Simulation> {
    simulation.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Timers {
    fast: JoinHandle<()>,
    slow: JoinHandle<()>,
}

/// Owns the simulation timers.
pub struct Scheduler {
    simulation: SharedSimulation,
    sink: Arc<BroadcastSink>,
    fast_period: Duration,
    slow_period: Duration,
    timers: Option<Timers>,
}

impl Scheduler {
    /// A stopped scheduler with explicit periods.
    pub fn new(
        simulation: Simulation,
        sink: Arc<BroadcastSink>,
        fast_period: Duration,
        slow_period: Duration,
    ) -> Self {
        Self {
            simulation: Arc::new(Mutex::new(simulation)),
            sink,
            fast_period,
            slow_period,
            timers: None,
        }
    }

    /// A stopped scheduler using the configured periods.
    pub fn from_config(
        simulation: Simulation,
        sink: Arc<BroadcastSink>,
        config: &SimulationConfig,
    ) -> Self {
        Self::new(simulation, sink, config.fast_period(), config.slow_period())
    }

    /// Shared handle to the simulation, for inspection.
    pub fn simulation(&self) -> SharedSimulation {
        Arc::clone(&self.simulation)
    }

    /// Seed the fleet from a roster. Returns the number of vehicles.
    pub fn seed(&self, roster: &[VehicleRecord]) -> usize {
        let seeded = lock(&self.simulation).seed(roster);
        info!(vehicles = seeded, "Simulator seeded");
        seeded
    }

    /// Whether both timers are armed.
    pub const fn is_running(&self) -> bool {
        self.timers.is_some()
    }

    /// Arm both timers. Returns `false` if they were already armed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.timers.is_some() {
            debug!("Scheduler already running, start ignored");
            return false;
        }

        let fast = tokio::spawn(run_fast_loop(
            Arc::clone(&self.simulation),
            Arc::clone(&self.sink),
            self.fast_period,
        ));
        let slow = tokio::spawn(run_slow_loop(
            Arc::clone(&self.simulation),
            Arc::clone(&self.sink),
            self.slow_period,
        ));
        self.timers = Some(Timers { fast, slow });

        info!(
            fast_period_ms = self.fast_period.as_millis(),
            slow_period_ms = self.slow_period.as_millis(),
            "Vehicle simulator started"
        );
        true
    }

    /// Cancel both timers. Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(timers) = self.timers.take() else {
            return false;
        };
        timers.fast.abort();
        timers.slow.abort();
        info!("Vehicle simulator stopped");
        true
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(timers) = self.timers.take() {
            timers.fast.abort();
            timers.slow.abort();
        }
    }
}

fn timer(period: Duration) -> tokio::time::Interval {
    let now = Instant::now();
    let first = now.checked_add(period).unwrap_or(now);
    let mut interval = tokio::time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn run_fast_loop(simulation: SharedSimulation, sink: Arc<BroadcastSink>, period: Duration) {
    let mut interval = timer(period);
    loop {
        interval.tick().await;
        let summary = lock(&simulation).run_fast_tick(Utc::now());
        debug!(
            tick = summary.tick,
            moved = summary.moved,
            respawned = summary.respawned,
            stationary = summary.stationary,
            alerts = summary.alerts.len(),
            "Fast tick"
        );
        sink.publish_fast(summary.fleet, &summary.alerts);
    }
}

async fn run_slow_loop(simulation: SharedSimulation, sink: Arc<BroadcastSink>, period: Duration) {
    let mut interval = timer(period);
    loop {
        interval.tick().await;
        let batch = lock(&simulation).take_slow_batch(Utc::now());

        // Persist on its own task so that aborting this loop leaves an
        // in-flight pass to finish.
        let sink = Arc::clone(&sink);
        let pass = tokio::spawn(async move { sink.persist_slow(batch).await });
        match pass.await {
            Ok(report) => debug!(
                telemetry_written = report.telemetry_written,
                telemetry_failed = report.telemetry_failed,
                alerts_written = report.alerts_written,
                "Slow tick"
            ),
            Err(e) => warn!(error = %e, "Slow tick persistence task failed"),
        }
    }
}

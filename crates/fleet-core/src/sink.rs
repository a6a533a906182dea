//! Broadcast and persistence sink.
//!
//! The fast tick goes through [`BroadcastSink::publish_fast`]: one
//! `telemetry` message carrying the whole fleet, then one `alert` message
//! per new alert. The slow tick goes through [`BroadcastSink::persist_slow`]:
//! one write per snapshot and per alert, then a single refresh of the
//! `vehicles:live` cache entry.
//!
//! Nothing here propagates an error. A failed write is logged with the
//! vehicle id and the batch moves on; a failed cache refresh is logged and
//! ignored.

use std::sync::Arc;
use std::time::Duration;

use fleet_types::{AlertEvent, LiveEvent, TelemetrySnapshot, VehicleState};
use tracing::{debug, warn};

use crate::cache::{FleetCache, LIVE_FLEET_KEY};
use crate::channel::LiveChannel;
use crate::repository::FleetRepository;

/// Everything the slow tick writes out in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlowTickBatch {
    /// One snapshot per vehicle, in store order.
    pub snapshots: Vec<TelemetrySnapshot>,
    /// Alerts raised on fast ticks since the previous slow tick.
    pub alerts: Vec<AlertEvent>,
}

/// Outcome counts for one slow tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Snapshots written.
    pub telemetry_written: usize,
    /// Snapshots whose write failed.
    pub telemetry_failed: usize,
    /// Alerts written.
    pub alerts_written: usize,
    /// Alerts whose write failed.
    pub alerts_failed: usize,
    /// Whether the live fleet cache entry was refreshed.
    pub cache_refreshed: bool,
}

/// Fan-out point between the simulation and its collaborators.
pub struct BroadcastSink {
    repository: Arc<dyn FleetRepository>,
    channel: Arc<dyn LiveChannel>,
    cache: Arc<dyn FleetCache>,
    fleet_ttl: Duration,
}

impl BroadcastSink {
    /// Wire a sink to its collaborators. `fleet_ttl` bounds the life of
    /// the `vehicles:live` cache entry.
    pub fn new(
        repository: Arc<dyn FleetRepository>,
        channel: Arc<dyn LiveChannel>,
        cache: Arc<dyn FleetCache>,
        fleet_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            channel,
            cache,
            fleet_ttl,
        }
    }

    /// The persistence store this sink writes to.
    pub fn repository(&self) -> &Arc<dyn FleetRepository> {
        &self.repository
    }

    /// Publish one fast tick. Returns the number of messages sent.
    pub fn publish_fast(&self, fleet: Vec<VehicleState>, alerts: &[AlertEvent]) -> usize {
        let vehicles = fleet.len();
        let receivers = self.channel.publish(LiveEvent::Telemetry(fleet));
        for alert in alerts {
            self.channel.publish(LiveEvent::Alert(alert.clone()));
        }
        debug!(vehicles, alerts = alerts.len(), receivers, "Published fast tick");
        alerts.len().saturating_add(1)
    }

    /// Persist one slow tick batch.
    ///
    /// Writes are sequential. The cache is refreshed exactly once per call,
    /// after the writes, whatever they returned.
    pub async fn persist_slow(&self, batch: SlowTickBatch) -> PersistReport {
        let mut report = PersistReport::default();

        for snapshot in &batch.snapshots {
            match self.repository.insert_telemetry(snapshot).await {
                Ok(()) => report.telemetry_written = report.telemetry_written.saturating_add(1),
                Err(e) => {
                    report.telemetry_failed = report.telemetry_failed.saturating_add(1);
                    warn!(
                        vehicle_id = %snapshot.state.vehicle_id,
                        error = %e,
                        "Failed to save telemetry"
                    );
                }
            }
        }

        for alert in &batch.alerts {
            match self.repository.insert_alert(alert).await {
                Ok(_) => report.alerts_written = report.alerts_written.saturating_add(1),
                Err(e) => {
                    report.alerts_failed = report.alerts_failed.saturating_add(1);
                    warn!(
                        vehicle_id = %alert.vehicle_id,
                        category = alert.category.as_str(),
                        error = %e,
                        "Failed to save alert"
                    );
                }
            }
        }

        let fleet: Vec<&VehicleState> = batch.snapshots.iter().map(|s| &s.state).collect();
        report.cache_refreshed = self.refresh_fleet_cache(&fleet).await;

        debug!(
            telemetry_written = report.telemetry_written,
            telemetry_failed = report.telemetry_failed,
            alerts_written = report.alerts_written,
            alerts_failed = report.alerts_failed,
            cache_refreshed = report.cache_refreshed,
            "Persisted slow tick"
        );
        report
    }

    async fn refresh_fleet_cache(&self, fleet: &[&VehicleState]) -> bool {
        let payload = match serde_json::to_string(fleet) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize fleet for cache");
                return false;
            }
        };
        match self.cache.set(LIVE_FLEET_KEY, &payload, self.fleet_ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = LIVE_FLEET_KEY, error = %e, "Failed to refresh fleet cache");
                false
            }
        }
    }
}

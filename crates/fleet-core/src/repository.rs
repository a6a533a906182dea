//! Persistence store contract.
//!
//! The simulator writes through three methods (`list_vehicles`,
//! `insert_telemetry`, `insert_alert`); the read API uses the rest. Two
//! implementations ship with the workspace: [`InMemoryRepository`] for
//! tests and demo mode, and the `PostgreSQL` repository in `fleet-db`.
//! Which one runs is a configuration choice, never a code branch.
//!
//! [`InMemoryRepository`]: crate::memory::InMemoryRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_types::{AlertEvent, AlertId, AlertRecord, TelemetrySnapshot, VehicleId, VehicleRecord};

/// Errors raised by a persistence store.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// The store could not be reached or refused the request.
    #[error("persistence store unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description.
        reason: String,
    },

    /// A query reached the store and failed.
    #[error("persistence query failed: {source}")]
    Backend {
        /// The underlying driver error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RepositoryError {
    /// Wrap any driver error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(err),
        }
    }
}

/// Durable fleet storage: roster, telemetry history, alerts.
#[async_trait]
pub trait FleetRepository: Send + Sync {
    /// The registered fleet, ordered by vehicle id.
    async fn list_vehicles(&self) -> Result<Vec<VehicleRecord>, RepositoryError>;

    /// Append one telemetry snapshot.
    async fn insert_telemetry(&self, snapshot: &TelemetrySnapshot) -> Result<(), RepositoryError>;

    /// Persist one alert, unacknowledged. Returns its new id.
    async fn insert_alert(&self, alert: &AlertEvent) -> Result<AlertId, RepositoryError>;

    /// One roster entry.
    async fn get_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleRecord>, RepositoryError>;

    /// Snapshots for `id` recorded at or after `since`, oldest first.
    async fn telemetry_history(
        &self,
        id: &VehicleId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TelemetrySnapshot>, RepositoryError>;

    /// The most recent snapshot of every vehicle that has one, ordered by vehicle id.
    async fn latest_telemetry(&self) -> Result<Vec<TelemetrySnapshot>, RepositoryError>;

    /// Unacknowledged alerts, newest first.
    async fn active_alerts(&self) -> Result<Vec<AlertRecord>, RepositoryError>;

    /// Every alert for one vehicle, newest first.
    async fn vehicle_alerts(&self, id: &VehicleId) -> Result<Vec<AlertRecord>, RepositoryError>;

    /// Mark an alert acknowledged. `None` if no such alert exists.
    async fn acknowledge_alert(&self, id: AlertId) -> Result<Option<AlertRecord>, RepositoryError>;

    /// Number of registered vehicles.
    async fn count_vehicles(&self) -> Result<u64, RepositoryError>;
}

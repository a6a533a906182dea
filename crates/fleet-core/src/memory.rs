//! In-memory persistence and cache backends.
//!
//! Selected with `storage.backend: memory` and `cache.backend: memory`.
//! They back demo mode and every test in the workspace. Both expose call
//! counters and failure injection so tests can assert exactly what the
//! pipeline did.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_types::{
    AlertEvent, AlertId, AlertRecord, TelemetrySnapshot, VehicleId, VehicleRecord, VehicleStatus,
};
use tokio::time::Instant;

use crate::cache::{CacheError, FleetCache};
use crate::repository::{FleetRepository, RepositoryError};

/// Snapshots kept by [`InMemoryRepository`] before the oldest are evicted.
pub const MAX_STORED_TELEMETRY: usize = 50_000;

/// Alerts kept by [`InMemoryRepository`] before the oldest are evicted.
pub const MAX_STORED_ALERTS: usize = 10_000;

/// The five-vehicle demo roster, matching the database seed migration.
pub fn demo_roster() -> Vec<VehicleRecord> {
    [
        ("VH-001", "Tesla", "Model 3", VehicleStatus::Active, 15_230.5),
        ("VH-002", "Waymo", "Jaguar I-Pace", VehicleStatus::Autonomous, 28_450.2),
        ("VH-003", "Ford", "E-Transit", VehicleStatus::Active, 42_100.8),
        ("VH-004", "Rivian", "EDV 500", VehicleStatus::Idle, 8_920.0),
        ("VH-005", "Chevrolet", "Bolt EUV", VehicleStatus::Maintenance, 35_670.4),
    ]
    .into_iter()
    .map(|(id, make, model, status, odometer)| VehicleRecord {
        vehicle_id: VehicleId::new(id),
        make: make.to_owned(),
        model: model.to_owned(),
        status,
        odometer,
    })
    .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RepoState {
    vehicles: BTreeMap<VehicleId, VehicleRecord>,
    telemetry: VecDeque<TelemetrySnapshot>,
    alerts: VecDeque<AlertRecord>,
    telemetry_limit: usize,
    alert_limit: usize,
    insert_delay: Duration,
    unavailable: bool,
    failing_telemetry: BTreeSet<VehicleId>,
    failing_alerts: bool,
    list_calls: u64,
    telemetry_calls: u64,
    alert_calls: u64,
}

impl Default for RepoState {
    fn default() -> Self {
        Self {
            vehicles: BTreeMap::new(),
            telemetry: VecDeque::new(),
            alerts: VecDeque::new(),
            telemetry_limit: MAX_STORED_TELEMETRY,
            alert_limit: MAX_STORED_ALERTS,
            insert_delay: Duration::ZERO,
            unavailable: false,
            failing_telemetry: BTreeSet::new(),
            failing_alerts: false,
            list_calls: 0,
            telemetry_calls: 0,
            alert_calls: 0,
        }
    }
}

/// Append to a bounded log, evicting from the front once `limit` is hit.
fn push_bounded<T>(log: &mut VecDeque<T>, item: T, limit: usize) {
    while log.len() >= limit.max(1) {
        log.pop_front();
    }
    log.push_back(item);
}

impl RepoState {
    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::Unavailable {
                reason: "in-memory store marked unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

/// [`FleetRepository`] over bounded in-process logs.
///
/// Telemetry and alerts are kept oldest first and capped at
/// [`MAX_STORED_TELEMETRY`] and [`MAX_STORED_ALERTS`]; the oldest entries
/// are evicted first.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: Mutex<RepoState>,
}

impl InMemoryRepository {
    /// An empty store with no registered vehicles.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with [`demo_roster`].
    pub fn with_demo_fleet() -> Self {
        Self::with_roster(demo_roster())
    }

    /// A store pre-loaded with `roster`.
    pub fn with_roster(roster: impl IntoIterator<Item = VehicleRecord>) -> Self {
        let repo = Self::new();
        {
            let mut state = lock(&repo.state);
            for record in roster {
                state.vehicles.insert(record.vehicle_id.clone(), record);
            }
        }
        repo
    }

    /// Override how many snapshots and alerts are kept. Limits below one
    /// are raised to one.
    #[must_use]
    pub fn with_retention(self, telemetry: usize, alerts: usize) -> Self {
        {
            let mut state = lock(&self.state);
            state.telemetry_limit = telemetry.max(1);
            state.alert_limit = alerts.max(1);
        }
        self
    }

    /// Make every insert take `delay` before it lands, as a slow store
    /// would. Zero by default.
    pub fn set_insert_delay(&self, delay: Duration) {
        lock(&self.state).insert_delay = delay;
    }

    /// Make every call fail (or succeed again) as if the store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// Make `insert_telemetry` fail for one vehicle.
    pub fn fail_telemetry_for(&self, id: &VehicleId) {
        lock(&self.state).failing_telemetry.insert(id.clone());
    }

    /// Make every `insert_alert` fail.
    pub fn fail_alert_inserts(&self, failing: bool) {
        lock(&self.state).failing_alerts = failing;
    }

    /// How many times `list_vehicles` was called.
    pub fn list_calls(&self) -> u64 {
        lock(&self.state).list_calls
    }

    /// How many times `insert_telemetry` was called, failures included.
    pub fn telemetry_calls(&self) -> u64 {
        lock(&self.state).telemetry_calls
    }

    /// How many times `insert_alert` was called, failures included.
    pub fn alert_calls(&self) -> u64 {
        lock(&self.state).alert_calls
    }

    /// Every stored snapshot, in insertion order.
    pub fn telemetry(&self) -> Vec<TelemetrySnapshot> {
        lock(&self.state).telemetry.iter().cloned().collect()
    }

    /// Every stored alert, in insertion order.
    pub fn alerts(&self) -> Vec<AlertRecord> {
        lock(&self.state).alerts.iter().cloned().collect()
    }

    /// Sleep for the configured insert delay, without holding the lock.
    async fn insert_latency(&self) {
        let delay = lock(&self.state).insert_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn newest_first(mut alerts: Vec<AlertRecord>) -> Vec<AlertRecord> {
    alerts.sort_by(|a, b| {
        b.event
            .created_at
            .cmp(&a.event.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    alerts
}

#[async_trait]
impl FleetRepository for InMemoryRepository {
    async fn list_vehicles(&self) -> Result<Vec<VehicleRecord>, RepositoryError> {
        let mut state = lock(&self.state);
        state.list_calls = state.list_calls.saturating_add(1);
        state.check_available()?;
        Ok(state.vehicles.values().cloned().collect())
    }

    async fn insert_telemetry(&self, snapshot: &TelemetrySnapshot) -> Result<(), RepositoryError> {
        self.insert_latency().await;
        let mut state = lock(&self.state);
        state.telemetry_calls = state.telemetry_calls.saturating_add(1);
        state.check_available()?;
        if state.failing_telemetry.contains(&snapshot.state.vehicle_id) {
            return Err(RepositoryError::Unavailable {
                reason: format!("injected failure for {}", snapshot.state.vehicle_id),
            });
        }
        let limit = state.telemetry_limit;
        push_bounded(&mut state.telemetry, snapshot.clone(), limit);
        Ok(())
    }

    async fn insert_alert(&self, alert: &AlertEvent) -> Result<AlertId, RepositoryError> {
        self.insert_latency().await;
        let mut state = lock(&self.state);
        state.alert_calls = state.alert_calls.saturating_add(1);
        state.check_available()?;
        if state.failing_alerts {
            return Err(RepositoryError::Unavailable {
                reason: "injected alert failure".to_owned(),
            });
        }
        let id = AlertId::new();
        let limit = state.alert_limit;
        push_bounded(
            &mut state.alerts,
            AlertRecord {
                id,
                event: alert.clone(),
                acknowledged: false,
            },
            limit,
        );
        Ok(id)
    }

    async fn get_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleRecord>, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        Ok(state.vehicles.get(id).cloned())
    }

    async fn telemetry_history(
        &self,
        id: &VehicleId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TelemetrySnapshot>, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        let mut rows: Vec<_> = state
            .telemetry
            .iter()
            .filter(|s| &s.state.vehicle_id == id && s.recorded_at >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.recorded_at);
        Ok(rows)
    }

    async fn latest_telemetry(&self) -> Result<Vec<TelemetrySnapshot>, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        let mut latest: BTreeMap<&VehicleId, &TelemetrySnapshot> = BTreeMap::new();
        for snapshot in &state.telemetry {
            let entry = latest.entry(&snapshot.state.vehicle_id).or_insert(snapshot);
            if snapshot.recorded_at >= entry.recorded_at {
                *entry = snapshot;
            }
        }
        Ok(latest.into_values().cloned().collect())
    }

    async fn active_alerts(&self) -> Result<Vec<AlertRecord>, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        let active = state
            .alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .cloned()
            .collect();
        Ok(newest_first(active))
    }

    async fn vehicle_alerts(&self, id: &VehicleId) -> Result<Vec<AlertRecord>, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        let rows = state
            .alerts
            .iter()
            .filter(|a| &a.event.vehicle_id == id)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn acknowledge_alert(&self, id: AlertId) -> Result<Option<AlertRecord>, RepositoryError> {
        let mut state = lock(&self.state);
        state.check_available()?;
        Ok(state.alerts.iter_mut().find(|a| a.id == id).map(|alert| {
            alert.acknowledged = true;
            alert.clone()
        }))
    }

    async fn count_vehicles(&self) -> Result<u64, RepositoryError> {
        let state = lock(&self.state);
        state.check_available()?;
        Ok(u64::try_from(state.vehicles.len()).unwrap_or(u64::MAX))
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CacheState {
    entries: BTreeMap<String, (String, Option<Instant>)>,
    unavailable: bool,
    get_calls: u64,
    set_calls: u64,
}

/// Map-backed [`FleetCache`] that honours TTLs.
///
/// Expiry uses [`tokio::time::Instant`], so paused-clock tests can step
/// past a TTL.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    state: Mutex<CacheState>,
}

impl InMemoryCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.state).unavailable = unavailable;
    }

    /// How many times `get` was called.
    pub fn get_calls(&self) -> u64 {
        lock(&self.state).get_calls
    }

    /// How many times `set` was called, failures included.
    pub fn set_calls(&self) -> u64 {
        lock(&self.state).set_calls
    }

    /// Raw value under `key`, ignoring expiry and counters.
    pub fn peek(&self, key: &str) -> Option<String> {
        lock(&self.state)
            .entries
            .get(key)
            .map(|(value, _)| value.clone())
    }
}

#[async_trait]
impl FleetCache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut state = lock(&self.state);
        state.get_calls = state.get_calls.saturating_add(1);
        if state.unavailable {
            return Err(CacheError::Unavailable {
                reason: "in-memory cache marked unavailable".to_owned(),
            });
        }
        let now = Instant::now();
        match state.entries.get(key) {
            Some((value, expires_at)) if expires_at.is_none_or(|at| at > now) => {
                Ok(Some(value.clone()))
            }
            Some(_) => {
                state.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut state = lock(&self.state);
        state.set_calls = state.set_calls.saturating_add(1);
        if state.unavailable {
            return Err(CacheError::Unavailable {
                reason: "in-memory cache marked unavailable".to_owned(),
            });
        }
        // A TTL too large to represent never expires.
        let expires_at = Instant::now().checked_add(ttl);
        state
            .entries
            .insert(key.to_owned(), (value.to_owned(), expires_at));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use fleet_types::{AlertCategory, Severity, VehicleState};

    use super::*;

    fn snapshot(id: &str, at: DateTime<Utc>) -> TelemetrySnapshot {
        TelemetrySnapshot::capture(
            &VehicleState::parked(VehicleId::new(id), 37.77, -122.42, 0.0),
            at,
        )
    }

    fn alert(id: &str, at: DateTime<Utc>) -> AlertEvent {
        AlertEvent {
            vehicle_id: VehicleId::new(id),
            category: AlertCategory::LowFuel,
            message: "Fuel level is 9.0%".to_owned(),
            severity: Severity::WARNING,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn demo_fleet_lists_five_vehicles_in_id_order() {
        let repo = InMemoryRepository::with_demo_fleet();
        let roster = repo.list_vehicles().await.unwrap();
        let ids: Vec<_> = roster.iter().map(|r| r.vehicle_id.as_str()).collect();
        assert_eq!(ids, ["VH-001", "VH-002", "VH-003", "VH-004", "VH-005"]);
        assert_eq!(repo.count_vehicles().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let repo = InMemoryRepository::with_demo_fleet();
        repo.set_unavailable(true);
        assert!(repo.list_vehicles().await.is_err());
        assert!(repo.count_vehicles().await.is_err());
        assert_eq!(repo.list_calls(), 1);
        repo.set_unavailable(false);
        assert!(repo.list_vehicles().await.is_ok());
    }

    #[tokio::test]
    async fn injected_failure_only_hits_one_vehicle() {
        let repo = InMemoryRepository::with_demo_fleet();
        repo.fail_telemetry_for(&VehicleId::new("VH-002"));
        let now = Utc::now();
        assert!(repo.insert_telemetry(&snapshot("VH-001", now)).await.is_ok());
        assert!(repo.insert_telemetry(&snapshot("VH-002", now)).await.is_err());
        assert_eq!(repo.telemetry_calls(), 2);
        assert_eq!(repo.telemetry().len(), 1);
    }

    #[tokio::test]
    async fn history_is_windowed_and_oldest_first() {
        let repo = InMemoryRepository::with_demo_fleet();
        let now = Utc::now();
        for hours in [30, 2, 1] {
            let at = now - TimeDelta::hours(hours);
            repo.insert_telemetry(&snapshot("VH-001", at)).await.unwrap();
        }
        repo.insert_telemetry(&snapshot("VH-002", now)).await.unwrap();

        let rows = repo
            .telemetry_history(&VehicleId::new("VH-001"), now - TimeDelta::hours(24))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].recorded_at < rows[1].recorded_at);
    }

    #[tokio::test]
    async fn latest_telemetry_keeps_newest_per_vehicle() {
        let repo = InMemoryRepository::with_demo_fleet();
        let now = Utc::now();
        repo.insert_telemetry(&snapshot("VH-002", now - TimeDelta::seconds(10)))
            .await
            .unwrap();
        repo.insert_telemetry(&snapshot("VH-002", now)).await.unwrap();
        repo.insert_telemetry(&snapshot("VH-001", now)).await.unwrap();

        let latest = repo.latest_telemetry().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].state.vehicle_id.as_str(), "VH-001");
        assert_eq!(latest[1].recorded_at, now);
    }

    #[tokio::test]
    async fn acknowledging_removes_from_active_list() {
        let repo = InMemoryRepository::with_demo_fleet();
        let now = Utc::now();
        let older = repo
            .insert_alert(&alert("VH-001", now - TimeDelta::seconds(5)))
            .await
            .unwrap();
        let newer = repo.insert_alert(&alert("VH-001", now)).await.unwrap();

        let active = repo.active_alerts().await.unwrap();
        assert_eq!(active.iter().map(|a| a.id).collect::<Vec<_>>(), [newer, older]);

        let acked = repo.acknowledge_alert(older).await.unwrap().unwrap();
        assert!(acked.acknowledged);
        assert_eq!(repo.active_alerts().await.unwrap().len(), 1);
        assert_eq!(
            repo.vehicle_alerts(&VehicleId::new("VH-001"))
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(repo.acknowledge_alert(AlertId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_logs_evict_oldest_past_retention() {
        let repo = InMemoryRepository::with_demo_fleet().with_retention(3, 2);
        let start = Utc::now();
        for secs in 0..5 {
            let at = start + TimeDelta::seconds(secs);
            repo.insert_telemetry(&snapshot("VH-001", at)).await.unwrap();
            repo.insert_alert(&alert("VH-001", at)).await.unwrap();
        }

        let kept: Vec<_> = repo.telemetry().iter().map(|s| s.recorded_at).collect();
        assert_eq!(
            kept,
            [2, 3, 4].map(|secs| start + TimeDelta::seconds(secs))
        );
        assert_eq!(repo.telemetry_calls(), 5);

        let alerts = repo.alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].event.created_at, start + TimeDelta::seconds(3));
        assert_eq!(repo.active_alerts().await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_delay_holds_the_write_back() {
        let repo = Arc::new(InMemoryRepository::with_demo_fleet());
        repo.set_insert_delay(Duration::from_secs(30));

        let write = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.insert_telemetry(&snapshot("VH-001", Utc::now())).await })
        };
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(repo.telemetry().is_empty());
        assert!(repo.list_vehicles().await.is_ok());

        tokio::time::sleep(Duration::from_secs(2)).await;
        write.await.unwrap().unwrap();
        assert_eq!(repo.telemetry().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_entries_expire() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.get_calls(), 2);
        assert_eq!(cache.set_calls(), 1);
    }

    #[tokio::test]
    async fn unavailable_cache_errors_but_counts() {
        let cache = InMemoryCache::new();
        cache.set_unavailable(true);
        assert!(cache.set("k", "v", Duration::from_secs(1)).await.is_err());
        assert!(cache.get("k").await.is_err());
        assert_eq!(cache.set_calls(), 1);
        assert!(cache.peek("k").is_none());
    }
}
